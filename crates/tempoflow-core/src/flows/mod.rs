//! Step executors
//!
//! A flow is a named, ordered sequence of steps against one workflow page.
//! Every step follows the same shape: check whether it is already done,
//! locate the triggering control, act (with wallet confirmation where
//! required), verify an indicator, and retry the whole step (optionally
//! reloading the page first) up to the configured attempt ceiling.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::config::AutomationConfig;
use crate::detect::DetectionPredicate;
use crate::error::Result;
use crate::locator::ElementLocator;
use crate::outcome::StepOutcome;
use crate::surface::PageHandle;
use crate::wallet::WalletPopupController;

pub mod faucet;
pub mod gm;
pub mod selectors;

pub use faucet::{FaucetFlow, FaucetReport};
pub use gm::GmFlow;

/// Everything a flow needs to drive its page.
///
/// All capabilities are passed in explicitly; flows never reach for ambient
/// browser state.
pub struct FlowContext {
    /// The workflow page
    pub page: Arc<dyn PageHandle>,
    /// Wallet popup driver for the same session
    pub wallet: Arc<WalletPopupController>,
    /// Chain resolver
    pub locator: ElementLocator,
    /// Engine tunables
    pub config: Arc<AutomationConfig>,
}

impl FlowContext {
    /// Build a context over one page.
    #[must_use]
    pub fn new(
        page: Arc<dyn PageHandle>,
        wallet: Arc<WalletPopupController>,
        config: Arc<AutomationConfig>,
    ) -> Self {
        let locator = ElementLocator::new(config.poll_interval());
        Self {
            page,
            wallet,
            locator,
            config,
        }
    }
}

/// What indicator polling concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum VerifyResult {
    /// Positive indicator observed
    Positive(Option<String>),
    /// Known negative indicator observed
    Negative(String),
    /// Neither indicator within the window
    Ambiguous,
}

/// Poll for a positive or negative indicator within a bounded window.
pub(crate) async fn verify_indicators(
    page: &dyn PageHandle,
    positive: &DetectionPredicate,
    negative: &DetectionPredicate,
    window: Duration,
    interval: Duration,
) -> Result<VerifyResult> {
    let deadline = Instant::now() + window;
    loop {
        if let Some(detection) = positive.evaluate(page).await? {
            return Ok(VerifyResult::Positive(detection.note));
        }
        if let Some(detection) = negative.evaluate(page).await? {
            let reason = detection.note.unwrap_or_else(|| "error indicator".to_string());
            return Ok(VerifyResult::Negative(reason));
        }
        if Instant::now() >= deadline {
            return Ok(VerifyResult::Ambiguous);
        }
        sleep(interval).await;
    }
}

/// Run one step attempt function under the flow retry policy.
///
/// Retries ambiguous and transient-negative attempts; returns immediately on
/// success and on non-retryable errors. Reloads the page between attempts
/// when configured.
pub(crate) async fn retry_step<'a, S, F, Fut>(
    subject: &'a S,
    config: &AutomationConfig,
    page: &dyn PageHandle,
    name: &str,
    op: F,
) -> StepOutcome
where
    F: Fn(&'a S) -> Fut,
    Fut: Future<Output = Result<StepOutcome>> + 'a,
{
    let attempts = config.step_attempts.max(1);
    let mut last = StepOutcome::failed(crate::error::ErrorKind::AmbiguousUi, "no attempt ran");

    for attempt in 1..=attempts {
        match op(subject).await {
            Ok(outcome) if outcome.succeeded => {
                info!(step = name, attempt, "step succeeded");
                return outcome;
            }
            Ok(outcome) => {
                warn!(step = name, attempt, note = ?outcome.note, "step attempt failed");
                last = outcome;
            }
            Err(e) if !e.is_retryable() => {
                warn!(step = name, attempt, error = %e, "step failed, not retryable");
                return StepOutcome::from_error(&e);
            }
            Err(e) => {
                warn!(step = name, attempt, error = %e, "step attempt errored");
                last = StepOutcome::from_error(&e);
            }
        }

        if attempt < attempts && config.reload_between_attempts {
            if let Err(e) = page.reload().await {
                warn!(step = name, error = %e, "reload before retry failed");
            }
            sleep(config.page_settle()).await;
        }
    }

    warn!(step = name, attempts, "step exhausted its attempts");
    last
}
