//! Profile tasks and per-step status tracking
//!
//! A [`ProfileTask`] is one unit of work read from the external status store:
//! a browser-profile serial number plus the recorded completion state of each
//! workflow step. Tasks are transient; they are rebuilt from the store for
//! every run and discarded afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A workflow step tracked in the status store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StepName {
    /// Claim test funds from the faucet
    AddFunds,
    /// Set the fee token (signed transaction)
    FeeToken,
    /// Send the GM transaction
    Gm,
}

impl StepName {
    /// All tracked steps, in dependency order.
    pub const ALL: [StepName; 3] = [StepName::AddFunds, StepName::FeeToken, StepName::Gm];

    /// The store-facing name of this step.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::AddFunds => "AddFunds",
            StepName::FeeToken => "FeeToken",
            StepName::Gm => "GM",
        }
    }
}

impl std::fmt::Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted completion state of one step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StepStatus {
    /// Step completed successfully on some prior run
    Ok,
    /// Step failed, with an optional recorded reason
    Failed(Option<String>),
    /// Step has not completed yet
    #[default]
    Pending,
}

impl StepStatus {
    /// Parse a store cell into a status. Unrecognized text is `Pending`.
    #[must_use]
    pub fn from_cell(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.eq_ignore_ascii_case("ok") {
            return StepStatus::Ok;
        }
        if let Some(prefix) = trimmed.get(..6) {
            if prefix.eq_ignore_ascii_case("failed") {
                let reason = trimmed[6..].trim_start_matches(':').trim();
                let reason = (!reason.is_empty()).then(|| reason.to_string());
                return StepStatus::Failed(reason);
            }
        }
        StepStatus::Pending
    }

    /// Render this status as a store cell.
    #[must_use]
    pub fn to_cell(&self) -> String {
        match self {
            StepStatus::Ok => "OK".to_string(),
            StepStatus::Failed(Some(reason)) => format!("FAILED: {reason}"),
            StepStatus::Failed(None) => "FAILED".to_string(),
            StepStatus::Pending => String::new(),
        }
    }

    /// Whether the step still needs to run.
    #[must_use]
    pub fn needs_run(&self) -> bool {
        !matches!(self, StepStatus::Ok)
    }
}

/// Persisted overall state of one profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverallStatus {
    /// Every step completed
    Ready,
    /// At least one step failed, with a truncated reason
    Error(Option<String>),
    /// Run not finished yet
    #[default]
    Pending,
}

/// Store cells longer than this are truncated before writing.
pub const MAX_STATUS_MESSAGE_LEN: usize = 80;

impl OverallStatus {
    /// Parse a store cell into an overall status.
    #[must_use]
    pub fn from_cell(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.eq_ignore_ascii_case("ready") {
            return OverallStatus::Ready;
        }
        if trimmed.to_ascii_uppercase().starts_with("ERROR") {
            let reason = trimmed[5..].trim_start_matches(':').trim();
            let reason = (!reason.is_empty()).then(|| reason.to_string());
            return OverallStatus::Error(reason);
        }
        OverallStatus::Pending
    }

    /// Render this status as a store cell, truncating long reasons.
    #[must_use]
    pub fn to_cell(&self) -> String {
        match self {
            OverallStatus::Ready => "READY".to_string(),
            OverallStatus::Error(Some(reason)) => {
                format!("ERROR: {}", truncate_message(reason))
            }
            OverallStatus::Error(None) => "ERROR".to_string(),
            OverallStatus::Pending => String::new(),
        }
    }
}

/// Bound a diagnostic message to the store's cell budget, on a char boundary.
#[must_use]
pub fn truncate_message(message: &str) -> String {
    if message.chars().count() <= MAX_STATUS_MESSAGE_LEN {
        return message.to_string();
    }
    message.chars().take(MAX_STATUS_MESSAGE_LEN).collect()
}

/// Opaque handle to one profile's record in the external store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowHandle(pub u32);

/// One unit of work: a profile and its recorded step statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileTask {
    /// Profile serial number in the provisioning service
    pub serial_number: u32,
    /// Handle to this profile's record in the status store
    pub row: RowHandle,
    /// Recorded status of each tracked step
    pub step_status: BTreeMap<StepName, StepStatus>,
    /// Recorded overall status
    pub overall_status: OverallStatus,
}

impl ProfileTask {
    /// Build a task with every step pending.
    #[must_use]
    pub fn new(serial_number: u32, row: RowHandle) -> Self {
        let step_status = StepName::ALL
            .iter()
            .map(|s| (*s, StepStatus::Pending))
            .collect();
        Self {
            serial_number,
            row,
            step_status,
            overall_status: OverallStatus::Pending,
        }
    }

    /// Recorded status of one step; absent entries count as pending.
    #[must_use]
    pub fn status_of(&self, step: StepName) -> StepStatus {
        self.step_status.get(&step).cloned().unwrap_or_default()
    }

    /// Derive the set of steps that still need to run.
    ///
    /// Computed once at the start of processing; never recomputed mid-run.
    #[must_use]
    pub fn needed_steps(&self) -> NeededSteps {
        let steps = StepName::ALL
            .iter()
            .copied()
            .filter(|s| self.status_of(*s).needs_run())
            .collect();
        NeededSteps { steps }
    }

    /// Whether this profile still needs any processing at all.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.overall_status != OverallStatus::Ready
    }
}

/// The steps a single run must attempt, frozen at process start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeededSteps {
    steps: Vec<StepName>,
}

impl NeededSteps {
    /// A set containing every step (forced full re-run).
    #[must_use]
    pub fn all() -> Self {
        Self {
            steps: StepName::ALL.to_vec(),
        }
    }

    /// Whether the given step must run.
    #[must_use]
    pub fn contains(&self, step: StepName) -> bool {
        self.steps.contains(&step)
    }

    /// Whether nothing needs to run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether any faucet-page step (claim funds, fee token) must run.
    #[must_use]
    pub fn needs_faucet_flow(&self) -> bool {
        self.contains(StepName::AddFunds) || self.contains(StepName::FeeToken)
    }

    /// The needed steps, in dependency order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = StepName> + '_ {
        self.steps.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_status_cell_round_trip() {
        assert_eq!(StepStatus::from_cell("OK"), StepStatus::Ok);
        assert_eq!(StepStatus::from_cell(" ok "), StepStatus::Ok);
        assert_eq!(StepStatus::from_cell(""), StepStatus::Pending);
        assert_eq!(StepStatus::from_cell("whatever"), StepStatus::Pending);
        assert_eq!(StepStatus::from_cell("FAILED"), StepStatus::Failed(None));
        assert_eq!(
            StepStatus::from_cell("FAILED: popup timeout"),
            StepStatus::Failed(Some("popup timeout".into()))
        );

        assert_eq!(StepStatus::Ok.to_cell(), "OK");
        assert_eq!(
            StepStatus::Failed(Some("x".into())).to_cell(),
            "FAILED: x"
        );
        assert_eq!(StepStatus::Pending.to_cell(), "");
    }

    #[test]
    fn test_overall_status_truncates_reason() {
        let long = "e".repeat(200);
        let cell = OverallStatus::Error(Some(long)).to_cell();
        assert!(cell.len() <= "ERROR: ".len() + MAX_STATUS_MESSAGE_LEN);
        assert!(cell.starts_with("ERROR: e"));
    }

    #[test]
    fn test_needed_steps_derivation() {
        let mut task = ProfileTask::new(7, RowHandle(2));
        task.step_status.insert(StepName::AddFunds, StepStatus::Ok);

        let needed = task.needed_steps();
        assert!(!needed.contains(StepName::AddFunds));
        assert!(needed.contains(StepName::FeeToken));
        assert!(needed.contains(StepName::Gm));
        assert!(needed.needs_faucet_flow());
    }

    #[test]
    fn test_all_steps_ok_means_nothing_needed() {
        let mut task = ProfileTask::new(7, RowHandle(2));
        for step in StepName::ALL {
            task.step_status.insert(step, StepStatus::Ok);
        }

        let needed = task.needed_steps();
        assert!(needed.is_empty());
        assert!(!needed.needs_faucet_flow());
    }

    #[test]
    fn test_failed_step_is_needed_again() {
        let mut task = ProfileTask::new(7, RowHandle(2));
        task.step_status
            .insert(StepName::Gm, StepStatus::Failed(Some("timeout".into())));
        task.step_status.insert(StepName::AddFunds, StepStatus::Ok);
        task.step_status.insert(StepName::FeeToken, StepStatus::Ok);

        let needed = task.needed_steps();
        assert!(needed.contains(StepName::Gm));
        assert!(!needed.needs_faucet_flow());
    }

    #[test]
    fn test_needed_steps_order_is_dependency_order() {
        let task = ProfileTask::new(1, RowHandle(2));
        let order: Vec<_> = task.needed_steps().iter().collect();
        assert_eq!(order, vec![StepName::AddFunds, StepName::FeeToken, StepName::Gm]);
    }
}
