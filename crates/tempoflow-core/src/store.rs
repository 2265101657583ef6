//! Status store capability
//!
//! Per-profile, per-step completion markers live in an external record store
//! (one row per profile). The engine writes through this trait only; the
//! concrete spreadsheet client lives in the sheets collaborator crate.
//!
//! Writes are per-row, so concurrent orchestrator invocations never contend
//! on the same record.

use async_trait::async_trait;

use crate::error::Result;
use crate::task::{OverallStatus, ProfileTask, RowHandle, StepName, StepStatus};

/// Reads tasks and persists step/overall statuses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Read every profile record into a task list.
    async fn read_tasks(&self) -> Result<Vec<ProfileTask>>;

    /// Persist one step's status. Called immediately after the step runs,
    /// never batched, so partial progress survives a crash.
    async fn write_step_status(
        &self,
        row: &RowHandle,
        step: StepName,
        status: StepStatus,
    ) -> Result<()>;

    /// Persist the profile's overall status.
    async fn write_overall_status(&self, row: &RowHandle, status: OverallStatus) -> Result<()>;

    /// Mark the profile as currently being processed.
    async fn mark_in_progress(&self, row: &RowHandle) -> Result<()>;
}
