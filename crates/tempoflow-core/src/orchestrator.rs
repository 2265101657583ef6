//! Profile orchestrator
//!
//! Processes one profile end to end: decide which steps still need to run,
//! acquire the browser session, unlock the wallet once, run the needed flows
//! in dependency order, persist each step's status immediately, and release
//! the session on every exit path. Nothing escapes this boundary; any error
//! or panic inside becomes a failure outcome so the batch runner can move on
//! to the next profile.

use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info, warn};

use crate::config::AutomationConfig;
use crate::engine::{FlowEngine, UiFlowEngine};
use crate::outcome::{ProcessOutcome, StepOutcome};
use crate::provision::SessionProvisioner;
use crate::store::StatusStore;
use crate::surface::AutomationSurface;
use crate::task::{NeededSteps, OverallStatus, ProfileTask, StepName, StepStatus};

/// Runs one profile at a time through the needed workflow steps.
pub struct ProfileOrchestrator {
    provisioner: Arc<dyn SessionProvisioner>,
    store: Arc<dyn StatusStore>,
    engine: Arc<dyn FlowEngine>,
    config: Arc<AutomationConfig>,
}

impl ProfileOrchestrator {
    /// Orchestrator with the UI-driving flow engine.
    #[must_use]
    pub fn new(
        provisioner: Arc<dyn SessionProvisioner>,
        store: Arc<dyn StatusStore>,
        config: Arc<AutomationConfig>,
    ) -> Self {
        let engine = Arc::new(UiFlowEngine::new(config.clone()));
        Self::with_engine(provisioner, store, config, engine)
    }

    /// Orchestrator with a custom flow engine.
    #[must_use]
    pub fn with_engine(
        provisioner: Arc<dyn SessionProvisioner>,
        store: Arc<dyn StatusStore>,
        config: Arc<AutomationConfig>,
        engine: Arc<dyn FlowEngine>,
    ) -> Self {
        Self {
            provisioner,
            store,
            engine,
            config,
        }
    }

    /// Process a task, re-running only the steps whose status requires it.
    pub async fn process(&self, task: &ProfileTask) -> ProcessOutcome {
        self.process_with(task, false).await
    }

    /// Process a task; `force_all` re-runs every step regardless of status.
    pub async fn process_with(&self, task: &ProfileTask, force_all: bool) -> ProcessOutcome {
        let run_id = uuid::Uuid::new_v4();
        let serial = task.serial_number;
        let needed = if force_all {
            NeededSteps::all()
        } else {
            task.needed_steps()
        };

        if needed.is_empty() {
            info!(serial, "every step already OK, nothing to do");
            self.write_overall(task, &ProcessOutcome::noop()).await;
            return ProcessOutcome::noop();
        }

        info!(serial, %run_id, steps = ?needed.iter().collect::<Vec<_>>(), "processing profile");
        if let Err(e) = self.store.mark_in_progress(&task.row).await {
            warn!(serial, error = %e, "could not mark row in progress");
        }

        let session = match self.provisioner.open_session(serial).await {
            Ok(session) => session,
            Err(e) => {
                error!(serial, error = %e, "session acquisition failed");
                let mut outcome = ProcessOutcome::failure(format!("session open failed: {e}"));
                if e.is_batch_fatal() {
                    outcome = outcome.fatal();
                }
                self.write_overall(task, &outcome).await;
                return outcome;
            }
        };
        let surface = session.surface();

        // Run the flows with a panic shield so the release sequence below is
        // reached on every exit path, then release exactly once.
        let run = std::panic::AssertUnwindSafe(self.run_flows(task, &needed, surface.clone()))
            .catch_unwind()
            .await;

        self.engine.cleanup_wallet(surface).await;
        if let Err(e) = session.shutdown().await {
            warn!(serial, error = %e, "session handle release failed");
        }
        if let Err(e) = self.provisioner.close_session(serial).await {
            warn!(serial, error = %e, "remote browser stop failed");
        }

        let outcome = match run {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(serial, message, "panic while processing profile");
                ProcessOutcome::failure(format!("internal error: {message}"))
            }
        };

        self.write_overall(task, &outcome).await;
        info!(serial, success = outcome.success, "profile processed");
        outcome
    }

    /// Execute the needed flows in dependency order, persisting each step's
    /// status immediately after it runs.
    async fn run_flows(
        &self,
        task: &ProfileTask,
        needed: &NeededSteps,
        surface: Arc<dyn AutomationSurface>,
    ) -> ProcessOutcome {
        let mut outcome = ProcessOutcome::noop();
        let credential = self.config.credential_for(task.serial_number);

        // Unlock exactly once per profile run, before any flow.
        if let Err(e) = self.engine.unlock_wallet(surface.clone(), &credential).await {
            error!(serial = task.serial_number, error = %e, "wallet unlock failed");
            let failure = StepOutcome::from_error(&e);
            for step in needed.iter() {
                self.persist_step(task, step, &failure).await;
                outcome.record(step, failure.clone());
            }
            return outcome;
        }

        if needed.needs_faucet_flow() {
            match self.engine.run_faucet(surface.clone(), needed).await {
                Ok(report) => {
                    if let Some(failure) = report.handshake_failure() {
                        let failure = failure.clone();
                        for step in [StepName::AddFunds, StepName::FeeToken] {
                            if needed.contains(step) {
                                self.persist_step(task, step, &failure).await;
                                outcome.record(step, failure.clone());
                            }
                        }
                    } else {
                        if let Some(add_funds) = report.add_funds {
                            self.persist_step(task, StepName::AddFunds, &add_funds).await;
                            outcome.record(StepName::AddFunds, add_funds);
                        }
                        if let Some(fee_token) = report.fee_token {
                            self.persist_step(task, StepName::FeeToken, &fee_token).await;
                            outcome.record(StepName::FeeToken, fee_token);
                        }
                    }
                }
                Err(e) => {
                    error!(serial = task.serial_number, error = %e, "faucet flow failed");
                    let failure = StepOutcome::from_error(&e);
                    for step in [StepName::AddFunds, StepName::FeeToken] {
                        if needed.contains(step) {
                            self.persist_step(task, step, &failure).await;
                            outcome.record(step, failure.clone());
                        }
                    }
                    if e.is_profile_fatal() {
                        return outcome;
                    }
                }
            }
        }

        if needed.contains(StepName::Gm) {
            let gm = match self.engine.run_gm(surface).await {
                Ok(gm) => gm,
                Err(e) => {
                    error!(serial = task.serial_number, error = %e, "gm flow failed");
                    StepOutcome::from_error(&e)
                }
            };
            self.persist_step(task, StepName::Gm, &gm).await;
            outcome.record(StepName::Gm, gm);
        }

        outcome
    }

    /// Persist one step's status right away; a store hiccup is logged, not
    /// fatal to the run.
    async fn persist_step(&self, task: &ProfileTask, step: StepName, outcome: &StepOutcome) {
        let status = if outcome.succeeded {
            StepStatus::Ok
        } else {
            StepStatus::Failed(outcome.reason())
        };
        if let Err(e) = self.store.write_step_status(&task.row, step, status).await {
            warn!(
                serial = task.serial_number,
                step = %step,
                error = %e,
                "step status write failed"
            );
        }
    }

    async fn write_overall(&self, task: &ProfileTask, outcome: &ProcessOutcome) {
        let status = if outcome.success {
            OverallStatus::Ready
        } else {
            OverallStatus::Error(outcome.message.clone())
        };
        if let Err(e) = self.store.write_overall_status(&task.row, status).await {
            warn!(serial = task.serial_number, error = %e, "overall status write failed");
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
