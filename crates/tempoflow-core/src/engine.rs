//! Flow engine seam
//!
//! The orchestrator talks to step execution through this trait so its own
//! logic (needed-step selection, status persistence, guaranteed release) is
//! independent of how pages are driven. The UI-backed implementation wires
//! the wallet controller and the two flows; tests substitute a mock.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AutomationConfig;
use crate::error::Result;
use crate::flows::{FaucetFlow, FaucetReport, FlowContext, GmFlow};
use crate::outcome::StepOutcome;
use crate::surface::AutomationSurface;
use crate::task::NeededSteps;
use crate::wallet::WalletPopupController;

/// Executes workflow steps against a session's automation surface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FlowEngine: Send + Sync {
    /// Unlock the wallet and clear onboarding overlays. Once per profile run.
    async fn unlock_wallet(&self, surface: Arc<dyn AutomationSurface>, credential: &str)
        -> Result<()>;

    /// Run the faucet flow for the needed subset of its steps.
    async fn run_faucet(
        &self,
        surface: Arc<dyn AutomationSurface>,
        needed: &NeededSteps,
    ) -> Result<FaucetReport>;

    /// Run the GM flow.
    async fn run_gm(&self, surface: Arc<dyn AutomationSurface>) -> Result<StepOutcome>;

    /// Dismiss and reject whatever wallet prompts are still open. Cleanup;
    /// never fails.
    async fn cleanup_wallet(&self, surface: Arc<dyn AutomationSurface>);
}

/// The real, UI-driving engine.
pub struct UiFlowEngine {
    config: Arc<AutomationConfig>,
}

impl UiFlowEngine {
    /// Engine with the given tunables.
    #[must_use]
    pub fn new(config: Arc<AutomationConfig>) -> Self {
        Self { config }
    }

    fn wallet_for(&self, surface: &Arc<dyn AutomationSurface>) -> Arc<WalletPopupController> {
        Arc::new(WalletPopupController::new(
            surface.clone(),
            self.config.clone(),
        ))
    }

    fn context_for(&self, surface: &Arc<dyn AutomationSurface>) -> FlowContext {
        FlowContext::new(
            surface.main_page(),
            self.wallet_for(surface),
            self.config.clone(),
        )
    }
}

#[async_trait]
impl FlowEngine for UiFlowEngine {
    async fn unlock_wallet(
        &self,
        surface: Arc<dyn AutomationSurface>,
        credential: &str,
    ) -> Result<()> {
        let wallet = self.wallet_for(&surface);
        wallet
            .unlock(credential, self.config.element_wait())
            .await?;
        wallet.dismiss_overlays(self.config.dismiss_budget()).await;
        Ok(())
    }

    async fn run_faucet(
        &self,
        surface: Arc<dyn AutomationSurface>,
        needed: &NeededSteps,
    ) -> Result<FaucetReport> {
        FaucetFlow::new(self.context_for(&surface)).run(needed).await
    }

    async fn run_gm(&self, surface: Arc<dyn AutomationSurface>) -> Result<StepOutcome> {
        GmFlow::new(self.context_for(&surface)).run().await
    }

    async fn cleanup_wallet(&self, surface: Arc<dyn AutomationSurface>) {
        self.wallet_for(&surface).reject_all_pending().await;
    }
}
