//! Wallet-extension popup controller
//!
//! The wallet extension opens its confirmation UI in a separate window, with
//! unpredictable latency after the click that triggered it. Discovery is
//! therefore a poll over the *current* set of open windows, not a single
//! wait. Every operation restores focus to the main workflow page on every
//! exit path, so a failed popup interaction never strands the session on the
//! wrong window.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::AutomationConfig;
use crate::detect::DetectionPredicate;
use crate::error::{Error, Result};
use crate::interaction::ClickTechnique;
use crate::locator::ElementLocator;
use crate::query::{QueryCandidate, QueryChain};
use crate::surface::{AutomationSurface, PageHandle};

/// Observable phase of the controller, for logs and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupPhase {
    /// No popup work in flight
    Idle,
    /// Enumerating windows looking for the popup
    Searching,
    /// Popup discovered and focused
    Found,
    /// Driving the popup
    Acting,
    /// Discovery window elapsed without a popup
    TimedOut,
}

/// Selector chains for the wallet extension UI.
///
/// Locale variants are listed explicitly; test attributes come first because
/// they survive both localization and markup reshuffles.
pub mod selectors {
    use super::{QueryCandidate, QueryChain};

    /// Credential entry field on the unlock screen.
    #[must_use]
    pub fn credential_field() -> QueryChain {
        QueryChain::new(
            "credential field",
            vec![
                QueryCandidate::by_test_attribute("unlock-password"),
                QueryCandidate::by_structural_path("input[type=\"password\"]"),
            ],
        )
    }

    /// Submit button on the unlock screen.
    #[must_use]
    pub fn unlock_submit() -> QueryChain {
        QueryChain::new(
            "unlock submit",
            vec![
                QueryCandidate::by_test_attribute("unlock-submit"),
                QueryCandidate::by_text("Unlock"),
                QueryCandidate::by_text("Разблокировать"),
            ],
        )
    }

    /// Indicator that the wallet is authenticated.
    #[must_use]
    pub fn authenticated_indicator() -> QueryChain {
        QueryChain::new(
            "authenticated indicator",
            vec![
                QueryCandidate::by_test_attribute("account-menu-icon"),
                QueryCandidate::by_test_attribute("account-options-menu-button"),
            ],
        )
    }

    /// Connect / next buttons across wallet versions and locales.
    #[must_use]
    pub fn connect_button() -> QueryChain {
        QueryChain::new(
            "connect button",
            vec![
                QueryCandidate::by_test_attribute("page-container-footer-next"),
                QueryCandidate::by_test_attribute("confirm-btn"),
                QueryCandidate::by_structural_path("button.btn-primary"),
                QueryCandidate::by_text("Далее"),
                QueryCandidate::by_text("Next"),
                QueryCandidate::by_text("Подключить"),
                QueryCandidate::by_text("Connect"),
            ],
        )
    }

    /// Approve button on the add-network screen.
    #[must_use]
    pub fn approve_button() -> QueryChain {
        QueryChain::new(
            "approve button",
            vec![
                QueryCandidate::by_test_attribute("confirmation-submit-button"),
                QueryCandidate::by_structural_path("button.btn-primary"),
                QueryCandidate::by_text("Одобрить"),
                QueryCandidate::by_text("Approve"),
            ],
        )
    }

    /// Switch-network button that some flows show after approval.
    #[must_use]
    pub fn switch_network_button() -> QueryChain {
        QueryChain::new(
            "switch network button",
            vec![
                QueryCandidate::by_test_attribute("confirmation-submit-button"),
                QueryCandidate::by_text("Переключить"),
                QueryCandidate::by_text("Switch"),
            ],
        )
    }

    /// Transaction confirm buttons across wallet versions and locales.
    #[must_use]
    pub fn confirm_button() -> QueryChain {
        QueryChain::new(
            "confirm button",
            vec![
                QueryCandidate::by_test_attribute("confirm-footer-button"),
                QueryCandidate::by_test_attribute("page-container-footer-next"),
                QueryCandidate::by_test_attribute("confirmation-submit-button"),
                QueryCandidate::by_structural_path("button.btn-primary"),
                QueryCandidate::by_text("Подтвердить"),
                QueryCandidate::by_text("Confirm"),
            ],
        )
    }

    /// Cancel / reject footer button, used during cleanup.
    #[must_use]
    pub fn cancel_button() -> QueryChain {
        QueryChain::new(
            "cancel button",
            vec![
                QueryCandidate::by_test_attribute("page-container-footer-cancel"),
                QueryCandidate::by_text("Отклонить"),
                QueryCandidate::by_text("Reject"),
                QueryCandidate::by_text("Cancel"),
            ],
        )
    }

    /// Dismiss targets for onboarding tips, tooltips, and similar overlays.
    #[must_use]
    pub fn overlay_dismiss() -> QueryChain {
        QueryChain::new(
            "overlay dismiss",
            vec![
                QueryCandidate::by_test_attribute("popover-close"),
                QueryCandidate::by_structural_path("[aria-label=\"Close\"]"),
                QueryCandidate::by_text("Got it"),
                QueryCandidate::by_text("Not now"),
                QueryCandidate::by_text("Понятно"),
            ],
        )
    }

    /// Text shown when the wallet rejects the credential.
    #[must_use]
    pub fn incorrect_credential_text() -> Vec<String> {
        vec![
            "incorrect password".to_string(),
            "неверный пароль".to_string(),
        ]
    }
}

/// Drives the wallet extension's popup windows.
pub struct WalletPopupController {
    surface: Arc<dyn AutomationSurface>,
    locator: ElementLocator,
    config: Arc<AutomationConfig>,
    phase: Mutex<PopupPhase>,
}

impl WalletPopupController {
    /// Controller bound to one session's surface.
    #[must_use]
    pub fn new(surface: Arc<dyn AutomationSurface>, config: Arc<AutomationConfig>) -> Self {
        let locator = ElementLocator::new(config.poll_interval());
        Self {
            surface,
            locator,
            config,
            phase: Mutex::new(PopupPhase::Idle),
        }
    }

    /// Current controller phase.
    #[must_use]
    pub fn phase(&self) -> PopupPhase {
        *self.phase.lock().expect("phase lock")
    }

    fn set_phase(&self, phase: PopupPhase) {
        *self.phase.lock().expect("phase lock") = phase;
    }

    /// Unlock the wallet with the profile's credential.
    ///
    /// An absent credential field means the wallet is already unlocked and is
    /// not an error. An explicit incorrect-credential indicator fails
    /// immediately and must never be retried; a bare timeout after submitting
    /// is tolerated.
    pub async fn unlock(&self, credential: &str, timeout: Duration) -> Result<()> {
        let result = self.unlock_inner(credential, timeout).await;
        self.restore_focus().await;
        result
    }

    async fn unlock_inner(&self, credential: &str, timeout: Duration) -> Result<()> {
        // The unlock screen may live in a popup or in a full extension tab;
        // prefer a popup when one is already open.
        let page = match self.find_popup(self.config.probe_wait()).await {
            Ok(popup) => popup,
            Err(_) => self.surface.main_page(),
        };

        let field = match self
            .locator
            .locate(page.as_ref(), &selectors::credential_field(), timeout)
            .await
        {
            Ok(located) => located,
            Err(Error::ElementNotFound(_)) => {
                info!("no credential field, wallet already unlocked");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        self.set_phase(PopupPhase::Acting);
        page.fill(&field.candidate, credential).await?;
        let submit = self
            .locator
            .locate(page.as_ref(), &selectors::unlock_submit(), timeout)
            .await?;
        page.click(&submit.candidate, ClickTechnique::Single).await?;

        let incorrect = DetectionPredicate::TextContainsAny {
            scope: None,
            needles: selectors::incorrect_credential_text(),
        };
        let deadline = Instant::now() + timeout;
        loop {
            if incorrect.evaluate(page.as_ref()).await?.is_some() {
                return Err(Error::IncorrectCredential);
            }
            if self
                .locator
                .probe(page.as_ref(), &selectors::authenticated_indicator())
                .await?
                .is_some()
            {
                info!("wallet unlocked");
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!("no unlock indicator within timeout, assuming unlocked");
                return Ok(());
            }
            sleep(self.config.poll_interval()).await;
        }
    }

    /// Approve a connection request from the workflow page.
    pub async fn connect(&self, timeout: Duration) -> Result<()> {
        let result = self.connect_inner(timeout).await;
        self.restore_focus().await;
        result
    }

    async fn connect_inner(&self, timeout: Duration) -> Result<()> {
        let popup = self.find_popup(timeout).await?;
        self.set_phase(PopupPhase::Acting);

        let button = self
            .locator
            .locate(
                popup.as_ref(),
                &selectors::connect_button(),
                self.config.element_wait(),
            )
            .await?;
        popup
            .click(&button.candidate, ClickTechnique::Single)
            .await?;
        debug!(candidate = ?button.candidate.strategy, "clicked connect");

        // Some flows show a second confirmation screen. Attempt it
        // unconditionally; the popup having closed by now is fine.
        sleep(self.config.second_click_delay()).await;
        if let Ok(Some(second)) = self
            .locator
            .probe(popup.as_ref(), &selectors::connect_button())
            .await
        {
            if let Err(e) = popup.click(&second.candidate, ClickTechnique::Single).await {
                debug!(error = %e, "second confirmation click skipped");
            } else {
                debug!("clicked second confirmation");
            }
        }
        Ok(())
    }

    /// Approve adding a network, then switch to it if prompted.
    pub async fn approve_network_addition(&self, timeout: Duration) -> Result<()> {
        let result = self.approve_network_inner(timeout).await;
        self.restore_focus().await;
        result
    }

    async fn approve_network_inner(&self, timeout: Duration) -> Result<()> {
        let popup = self.find_popup(timeout).await?;
        self.set_phase(PopupPhase::Acting);

        match self
            .locator
            .locate(
                popup.as_ref(),
                &selectors::approve_button(),
                self.config.element_wait(),
            )
            .await
        {
            Ok(button) => {
                popup
                    .click(&button.candidate, ClickTechnique::Single)
                    .await?;
                debug!("clicked approve network");
            }
            Err(Error::ElementNotFound(_)) => {
                // Popup may have opened straight on the switch screen.
                warn!("approve button absent, checking for switch prompt");
            }
            Err(e) => return Err(e),
        }

        sleep(self.config.second_click_delay()).await;
        if let Ok(Some(switch)) = self
            .locator
            .probe(popup.as_ref(), &selectors::switch_network_button())
            .await
        {
            if popup
                .click(&switch.candidate, ClickTechnique::Single)
                .await
                .is_ok()
            {
                debug!("clicked switch network");
            }
        }
        Ok(())
    }

    /// Confirm a pending transaction.
    pub async fn confirm_transaction(&self, timeout: Duration) -> Result<()> {
        let result = self.confirm_inner(timeout).await;
        self.restore_focus().await;
        result
    }

    async fn confirm_inner(&self, timeout: Duration) -> Result<()> {
        let popup = self.find_popup(timeout).await?;
        self.set_phase(PopupPhase::Acting);

        let button = self
            .locator
            .locate(
                popup.as_ref(),
                &selectors::confirm_button(),
                self.config.element_wait(),
            )
            .await?;
        popup
            .click(&button.candidate, ClickTechnique::Single)
            .await?;
        info!("transaction confirmed");
        Ok(())
    }

    /// Clear onboarding tips and similar overlays from wallet windows.
    ///
    /// Bounded by `budget`; never fails. Overlays that survive repeated
    /// clicks are hidden at the presentation layer instead.
    pub async fn dismiss_overlays(&self, budget: Duration) {
        let deadline = Instant::now() + budget;
        let mut click_failures: HashMap<String, u32> = HashMap::new();

        loop {
            let mut dismissed_any = false;
            for page in self.wallet_pages().await {
                for candidate in &selectors::overlay_dismiss().candidates {
                    match page.query(candidate).await {
                        Ok(Some(state)) if state.visible => {}
                        _ => continue,
                    }
                    dismissed_any = true;
                    match page.click(candidate, ClickTechnique::Single).await {
                        Ok(()) => {
                            debug!(value = %candidate.value, "overlay dismissed");
                        }
                        Err(e) => {
                            let failures = click_failures
                                .entry(candidate.value.clone())
                                .and_modify(|n| *n += 1)
                                .or_insert(1);
                            warn!(value = %candidate.value, error = %e, "overlay click failed");
                            if *failures >= 2 {
                                if page.hide_matching(candidate).await.is_ok() {
                                    debug!(value = %candidate.value, "overlay hidden");
                                }
                            }
                        }
                    }
                }
            }
            if !dismissed_any || Instant::now() >= deadline {
                break;
            }
            sleep(self.config.poll_interval()).await;
        }
        self.restore_focus().await;
    }

    /// Reject whatever wallet prompts are still pending. Cleanup only.
    pub async fn reject_all_pending(&self) {
        for page in self.wallet_pages().await {
            if let Ok(Some(cancel)) = self.locator.probe(page.as_ref(), &selectors::cancel_button()).await
            {
                match page.click(&cancel.candidate, ClickTechnique::Single).await {
                    Ok(()) => info!("rejected pending wallet request"),
                    Err(e) => debug!(error = %e, "pending request already gone"),
                }
            }
        }
        self.restore_focus().await;
    }

    /// Poll the open-window set for a wallet-extension page.
    async fn find_popup(&self, timeout: Duration) -> Result<Arc<dyn PageHandle>> {
        self.set_phase(PopupPhase::Searching);
        let deadline = Instant::now() + timeout;
        loop {
            for page in self.wallet_pages().await {
                if page.bring_to_front().await.is_ok() {
                    self.set_phase(PopupPhase::Found);
                    sleep(self.config.popup_settle()).await;
                    return Ok(page);
                }
            }
            if Instant::now() >= deadline {
                self.set_phase(PopupPhase::TimedOut);
                return Err(Error::PopupNotFound(timeout));
            }
            sleep(self.config.poll_interval()).await;
        }
    }

    /// Currently open pages inside the wallet extension's URL namespace.
    async fn wallet_pages(&self) -> Vec<Arc<dyn PageHandle>> {
        let pages = match self.surface.open_pages().await {
            Ok(pages) => pages,
            Err(e) => {
                warn!(error = %e, "could not enumerate windows");
                return Vec::new();
            }
        };
        let mut wallet = Vec::new();
        for page in pages {
            let url = page.current_url().await.unwrap_or_default();
            if url.starts_with(&self.config.wallet_url_namespace) {
                wallet.push(page);
            }
        }
        wallet
    }

    /// Return focus to the main workflow page; best effort.
    async fn restore_focus(&self) {
        if let Err(e) = self.surface.main_page().bring_to_front().await {
            warn!(error = %e, "could not restore focus to main page");
        }
        self.set_phase(PopupPhase::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ElementState;
    use crate::surface::{MockAutomationSurface, MockPageHandle};

    fn test_config() -> Arc<AutomationConfig> {
        Arc::new(AutomationConfig {
            poll_interval_ms: 5,
            popup_settle_ms: 0,
            second_click_delay_ms: 0,
            probe_wait_secs: 0,
            element_wait_secs: 1,
            ..Default::default()
        })
    }

    fn visible() -> ElementState {
        ElementState {
            visible: true,
            enabled: true,
            text: String::new(),
        }
    }

    fn surface_with(
        main: MockPageHandle,
        popups: Vec<MockPageHandle>,
    ) -> Arc<MockAutomationSurface> {
        let main: Arc<dyn PageHandle> = Arc::new(main);
        let popups: Vec<Arc<dyn PageHandle>> = popups
            .into_iter()
            .map(|p| Arc::new(p) as Arc<dyn PageHandle>)
            .collect();
        let mut surface = MockAutomationSurface::new();
        let main_clone = main.clone();
        surface.expect_main_page().returning(move || main_clone.clone());
        surface
            .expect_open_pages()
            .returning(move || Ok(popups.clone()));
        Arc::new(surface)
    }

    #[tokio::test]
    async fn test_focus_restored_when_popup_never_appears() {
        let mut main = MockPageHandle::new();
        main.expect_bring_to_front().times(1).returning(|| Ok(()));

        let controller =
            WalletPopupController::new(surface_with(main, Vec::new()), test_config());
        let result = controller.connect(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(Error::PopupNotFound(_))));
        assert_eq!(controller.phase(), PopupPhase::Idle);
    }

    #[tokio::test]
    async fn test_focus_restored_after_successful_connect() {
        let mut main = MockPageHandle::new();
        main.expect_bring_to_front().times(1).returning(|| Ok(()));

        let mut popup = MockPageHandle::new();
        popup
            .expect_current_url()
            .returning(|| Ok("chrome-extension://abc/notification.html".into()));
        popup.expect_bring_to_front().returning(|| Ok(()));
        // First locate matches, the post-click probe finds nothing.
        let mut queries = 0u32;
        popup.expect_query().returning(move |_| {
            queries += 1;
            if queries == 1 {
                Ok(Some(visible()))
            } else {
                Ok(None)
            }
        });
        popup.expect_click().times(1).returning(|_, _| Ok(()));

        let controller =
            WalletPopupController::new(surface_with(main, vec![popup]), test_config());
        controller.connect(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_unlock_incorrect_credential_fails_without_resubmit() {
        let mut main = MockPageHandle::new();
        // Credential field and submit button resolve; afterwards the page
        // shows the incorrect-credential text.
        main.expect_query().returning(|c: &QueryCandidate| {
            if c.value == "unlock-password" || c.value == "unlock-submit" {
                Ok(Some(visible()))
            } else {
                Ok(None)
            }
        });
        main.expect_fill().times(1).returning(|_, _| Ok(()));
        main.expect_click().times(1).returning(|_, _| Ok(()));
        main.expect_inner_text()
            .returning(|_| Ok("Incorrect password, please try again".into()));
        main.expect_bring_to_front().returning(|| Ok(()));

        let controller =
            WalletPopupController::new(surface_with(main, Vec::new()), test_config());
        let result = controller
            .unlock("secret17", Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(Error::IncorrectCredential)));
    }

    #[tokio::test]
    async fn test_unlock_without_credential_field_is_already_unlocked() {
        let mut main = MockPageHandle::new();
        main.expect_query().returning(|_| Ok(None));
        main.expect_fill().never();
        main.expect_click().never();
        main.expect_bring_to_front().returning(|| Ok(()));

        let controller =
            WalletPopupController::new(surface_with(main, Vec::new()), test_config());
        controller
            .unlock("secret17", Duration::from_millis(20))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dismiss_overlays_is_time_bounded() {
        let mut main = MockPageHandle::new();
        main.expect_bring_to_front().returning(|| Ok(()));

        let mut popup = MockPageHandle::new();
        popup
            .expect_current_url()
            .returning(|| Ok("chrome-extension://abc/home.html".into()));
        // Overlay stays visible forever and clicks always fail; the loop must
        // still end within the budget and fall back to hiding.
        popup.expect_query().returning(|_| Ok(Some(visible())));
        popup
            .expect_click()
            .returning(|_, _| Err(Error::Browser("click intercepted".into())));
        popup.expect_hide_matching().returning(|_| Ok(()));

        let controller =
            WalletPopupController::new(surface_with(main, vec![popup]), test_config());
        let started = std::time::Instant::now();
        controller.dismiss_overlays(Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_reject_all_pending_clicks_cancel() {
        let mut main = MockPageHandle::new();
        main.expect_bring_to_front().returning(|| Ok(()));

        let mut popup = MockPageHandle::new();
        popup
            .expect_current_url()
            .returning(|| Ok("chrome-extension://abc/notification.html".into()));
        popup.expect_query().returning(|c: &QueryCandidate| {
            if c.value == "page-container-footer-cancel" {
                Ok(Some(visible()))
            } else {
                Ok(None)
            }
        });
        popup.expect_click().times(1).returning(|_, _| Ok(()));

        let controller =
            WalletPopupController::new(surface_with(main, vec![popup]), test_config());
        controller.reject_all_pending().await;
    }
}
