//! GM page flow
//!
//! One tracked step with several sub-steps: find the target network's card,
//! skip everything if the daily cooldown is still running, connect the wallet
//! unless the card already shows a GM button, then send the GM transaction.
//! The GM button is driven with the full interaction battery because the page
//! is known to swallow single click techniques.

use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::{Error, ErrorKind, Result};
use crate::interaction::{attempt_interaction, ClickTechnique, InteractionPolicy};
use crate::outcome::StepOutcome;

use super::{retry_step, selectors, verify_indicators, FlowContext, VerifyResult};

/// Executor for the GM page.
pub struct GmFlow {
    ctx: FlowContext,
    policy: InteractionPolicy,
}

impl GmFlow {
    /// Flow over the given context, with the stubborn-click battery.
    #[must_use]
    pub fn new(ctx: FlowContext) -> Self {
        Self {
            ctx,
            policy: InteractionPolicy::stubborn(),
        }
    }

    /// Override the interaction policy for the GM button.
    #[must_use]
    pub fn with_policy(mut self, policy: InteractionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run the GM step under the flow retry policy.
    pub async fn run(&self) -> Result<StepOutcome> {
        info!(url = %self.ctx.config.gm_url, "starting gm flow");
        self.ctx.page.navigate(&self.ctx.config.gm_url).await?;
        sleep(self.ctx.config.page_settle()).await;

        Ok(retry_step(
            self,
            &self.ctx.config,
            self.ctx.page.as_ref(),
            "send gm",
            |flow| flow.gm_once(),
        )
        .await)
    }

    /// One full GM attempt.
    async fn gm_once(&self) -> Result<StepOutcome> {
        let page = self.ctx.page.as_ref();
        let config = &self.ctx.config;

        let card = self
            .ctx
            .locator
            .locate(page, &selectors::gm_card(config), config.element_wait())
            .await?;
        page.scroll_into_view(&card.candidate).await?;

        // Cooldown gate: a visible countdown means today's GM already
        // happened; report success with the remaining time and do not click.
        if let Some(detection) = selectors::gm_cooldown_indicator(config)
            .evaluate(page)
            .await?
        {
            let note = detection.note.unwrap_or_else(|| "CD".to_string());
            info!(note = %note, "gm on cooldown, skipping");
            return Ok(StepOutcome::ok_with_note(note));
        }

        if selectors::gm_connected_indicator(config)
            .evaluate(page)
            .await?
            .is_none()
        {
            self.connect_wallet().await?;
        } else {
            debug!("card already shows gm button, skipping connect");
        }

        let gm_button = self
            .ctx
            .locator
            .locate(page, &selectors::gm_button(config), config.element_wait())
            .await?;
        attempt_interaction(page, &gm_button.candidate, &self.policy).await?;

        self.ctx
            .wallet
            .confirm_transaction(config.transaction_wait())
            .await?;

        match verify_indicators(
            page,
            &selectors::gm_success_indicator(config),
            &selectors::gm_error_indicator(),
            config.verify_window(),
            config.poll_interval(),
        )
        .await?
        {
            VerifyResult::Positive(note) => Ok(StepOutcome {
                succeeded: true,
                note,
                error: None,
            }),
            VerifyResult::Negative(reason) => {
                Ok(StepOutcome::failed(ErrorKind::AmbiguousUi, reason))
            }
            VerifyResult::Ambiguous => {
                // A cooldown appearing after the click is the page's own way
                // of saying the transaction landed.
                if let Some(detection) = selectors::gm_cooldown_indicator(config)
                    .evaluate(page)
                    .await?
                {
                    return Ok(StepOutcome {
                        succeeded: true,
                        note: detection.note,
                        error: None,
                    });
                }
                Err(Error::AmbiguousUiState(
                    "no gm indicator after acting".to_string(),
                ))
            }
        }
    }

    /// Card-level connect: open the wallet modal, pick the wallet, approve
    /// the connection in the popup.
    async fn connect_wallet(&self) -> Result<StepOutcome> {
        let page = self.ctx.page.as_ref();
        let config = &self.ctx.config;

        let connect = self
            .ctx
            .locator
            .locate(
                page,
                &selectors::gm_connect_button(config),
                config.element_wait(),
            )
            .await?;
        page.click(&connect.candidate, ClickTechnique::Single)
            .await?;

        let option = self
            .ctx
            .locator
            .locate(
                page,
                &selectors::gm_wallet_option(),
                config.element_wait(),
            )
            .await?;
        page.click(&option.candidate, ClickTechnique::Single).await?;

        self.ctx.wallet.connect(config.popup_wait()).await?;
        sleep(config.page_settle()).await;
        Ok(StepOutcome::ok())
    }
}
