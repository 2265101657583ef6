//! Batch runner
//!
//! Schedules orchestrator invocations over a bounded worker pool. Profiles
//! are independent units: a failure in one never stops the rest, and the
//! batch always ends with a total/success/failure summary.

use std::sync::Arc;
use std::time::Duration;

use tempoflow_core::{ProfileOrchestrator, ProfileTask};
use tokio::sync::Semaphore;
use tracing::{error, info};

/// End-of-batch counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    /// Profiles attempted
    pub total: usize,
    /// Profiles whose every attempted step succeeded
    pub success: usize,
    /// Profiles with at least one failure
    pub failed: usize,
}

impl BatchSummary {
    fn tally(&mut self, success: bool) {
        self.total += 1;
        if success {
            self.success += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Pick the tasks this invocation should process.
///
/// A requested serial number wins over everything; otherwise pending-only is
/// the default and `include_all` widens to every row.
pub fn select_tasks(
    tasks: Vec<ProfileTask>,
    profile: Option<u32>,
    include_all: bool,
) -> Vec<ProfileTask> {
    match profile {
        Some(serial) => tasks
            .into_iter()
            .filter(|t| t.serial_number == serial)
            .collect(),
        None if include_all => tasks,
        None => tasks.into_iter().filter(ProfileTask::is_pending).collect(),
    }
}

/// Runs orchestrator invocations over a permit-bounded pool.
pub struct BatchRunner {
    orchestrator: Arc<ProfileOrchestrator>,
    max_parallel: usize,
    profile_delay: Duration,
}

impl BatchRunner {
    /// Runner over the given orchestrator.
    pub fn new(
        orchestrator: Arc<ProfileOrchestrator>,
        max_parallel: usize,
        profile_delay: Duration,
    ) -> Self {
        Self {
            orchestrator,
            max_parallel: max_parallel.max(1),
            profile_delay,
        }
    }

    /// Process every task; returns the final counts.
    pub async fn run(&self, tasks: Vec<ProfileTask>, force: bool) -> BatchSummary {
        if self.max_parallel == 1 {
            self.run_sequential(tasks, force).await
        } else {
            self.run_parallel(tasks, force).await
        }
    }

    async fn run_sequential(&self, tasks: Vec<ProfileTask>, force: bool) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let count = tasks.len();
        for (index, task) in tasks.into_iter().enumerate() {
            let outcome = self.orchestrator.process_with(&task, force).await;
            summary.tally(outcome.success);
            if outcome.batch_fatal {
                error!("provisioning unavailable, aborting the rest of the batch");
                break;
            }
            if index + 1 < count {
                tokio::time::sleep(self.profile_delay).await;
            }
        }
        summary
    }

    async fn run_parallel(&self, tasks: Vec<ProfileTask>, force: bool) -> BatchSummary {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut handles = Vec::with_capacity(tasks.len());

        for task in tasks {
            let semaphore = semaphore.clone();
            let orchestrator = self.orchestrator.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore closed");
                let serial = task.serial_number;
                let outcome = orchestrator.process_with(&task, force).await;
                (serial, outcome.success)
            }));
        }

        let mut summary = BatchSummary::default();
        for handle in handles {
            match handle.await {
                Ok((serial, success)) => {
                    info!(serial, success, "profile finished");
                    summary.tally(success);
                }
                Err(e) => {
                    error!(error = %e, "worker task aborted");
                    summary.tally(false);
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempoflow_core::{OverallStatus, RowHandle, StepName, StepStatus};

    fn task(serial: u32, overall: OverallStatus) -> ProfileTask {
        let mut task = ProfileTask::new(serial, RowHandle(serial + 1));
        task.overall_status = overall;
        task
    }

    #[test]
    fn test_select_by_profile_wins_over_all() {
        let tasks = vec![
            task(1, OverallStatus::Ready),
            task(2, OverallStatus::Pending),
        ];
        let selected = select_tasks(tasks, Some(1), true);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].serial_number, 1);
    }

    #[test]
    fn test_select_defaults_to_pending_only() {
        let tasks = vec![
            task(1, OverallStatus::Ready),
            task(2, OverallStatus::Pending),
            task(3, OverallStatus::Error(None)),
        ];
        let selected = select_tasks(tasks, None, false);
        let serials: Vec<u32> = selected.iter().map(|t| t.serial_number).collect();
        assert_eq!(serials, vec![2, 3]);
    }

    #[test]
    fn test_select_all_includes_ready_rows() {
        let tasks = vec![
            task(1, OverallStatus::Ready),
            task(2, OverallStatus::Pending),
        ];
        assert_eq!(select_tasks(tasks, None, true).len(), 2);
    }

    #[test]
    fn test_missing_profile_selects_nothing() {
        let tasks = vec![task(1, OverallStatus::Pending)];
        assert!(select_tasks(tasks, Some(99), false).is_empty());
    }

    #[test]
    fn test_summary_tally() {
        let mut summary = BatchSummary::default();
        summary.tally(true);
        summary.tally(false);
        summary.tally(true);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.success, 2);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_ready_task_with_failed_step_still_counts_as_pending_row() {
        // A row can be ERROR overall with one OK step; it stays selectable.
        let mut t = task(5, OverallStatus::Error(Some("GM: popup".into())));
        t.step_status.insert(StepName::AddFunds, StepStatus::Ok);
        let selected = select_tasks(vec![t], None, false);
        assert_eq!(selected.len(), 1);
        assert!(!selected[0].needed_steps().contains(StepName::AddFunds));
    }
}
