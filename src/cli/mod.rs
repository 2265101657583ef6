//! CLI surface
//!
//! Glue only: argument parsing, configuration validation, task selection,
//! and handing the selected tasks to the batch runner.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tempoflow_browser::FarmProvisioner;
use tempoflow_core::{ProfileOrchestrator, SessionProvisioner, StatusStore};
use tempoflow_sheets::SheetsStore;
use tracing::{info, warn};

use crate::batch::{select_tasks, BatchRunner};
use crate::settings;

/// Tempoflow batch runner CLI
#[derive(Parser, Debug)]
#[command(name = "tempoflow")]
#[command(about = "Automates wallet-gated testnet workflows across browser profiles")]
#[command(version)]
pub struct Cli {
    /// Process only the profile with this serial number
    #[arg(short, long)]
    pub profile: Option<u32>,

    /// Include profiles already marked READY, not only pending ones
    #[arg(long)]
    pub all: bool,

    /// Number of profiles to process in parallel
    #[arg(short = 'n', long)]
    pub parallel: Option<usize>,

    /// List the selected profiles without executing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Re-run every step even when it is already marked OK
    #[arg(long)]
    pub force: bool,
}

/// Run the CLI command.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = settings::load_config()?;
    config
        .sheets
        .validate()
        .context("configuration error, aborting batch")?;

    let store: Arc<dyn StatusStore> = Arc::new(
        SheetsStore::new(config.sheets.clone()).context("status store init failed")?,
    );
    let provisioner: Arc<dyn SessionProvisioner> = Arc::new(
        FarmProvisioner::new(config.farm.clone()).context("farm client init failed")?,
    );

    // Connectivity loss to the farm aborts the whole batch up front.
    provisioner
        .check_connection()
        .await
        .context("browser farm unreachable, aborting batch")?;

    let tasks = store.read_tasks().await.context("status store read failed")?;
    let selected = select_tasks(tasks, cli.profile, cli.all);

    if let Some(serial) = cli.profile {
        if selected.is_empty() {
            bail!("profile {serial} not found in the status store");
        }
    }
    if selected.is_empty() {
        info!("no profiles to process");
        return Ok(());
    }
    info!(count = selected.len(), "profiles selected");

    if cli.dry_run {
        for task in &selected {
            info!(
                serial = task.serial_number,
                row = task.row.0,
                needed = ?task.needed_steps().iter().collect::<Vec<_>>(),
                "would process"
            );
        }
        return Ok(());
    }

    let orchestrator = Arc::new(ProfileOrchestrator::new(
        provisioner,
        store,
        Arc::new(config.automation.clone()),
    ));
    let parallel = cli.parallel.unwrap_or(config.runner.max_parallel);
    let runner = BatchRunner::new(
        orchestrator,
        parallel,
        Duration::from_secs(config.runner.profile_delay_secs),
    );

    let summary = runner.run(selected, cli.force).await;
    info!(
        total = summary.total,
        success = summary.success,
        failed = summary.failed,
        "batch complete"
    );
    if summary.failed > 0 {
        warn!("some profiles failed; failed rows keep their FAILED step statuses for re-runs");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from([
            "tempoflow",
            "--profile",
            "17",
            "--parallel",
            "3",
            "--dry-run",
        ]);
        assert_eq!(cli.profile, Some(17));
        assert_eq!(cli.parallel, Some(3));
        assert!(cli.dry_run);
        assert!(!cli.all);
        assert!(!cli.force);
    }

    #[test]
    fn test_cli_defaults_to_pending_only() {
        let cli = Cli::parse_from(["tempoflow"]);
        assert!(cli.profile.is_none());
        assert!(!cli.all);
        assert!(cli.parallel.is_none());
    }
}
