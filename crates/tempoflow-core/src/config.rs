//! Automation configuration
//!
//! Every sleep, poll interval, and attempt ceiling used by the engine lives
//! here. The literal values were tuned against real page latency and are
//! expected to be overridden per deployment, so flow logic must always read
//! them from this struct, never hardcode them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Engine-wide tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// Faucet page URL
    #[serde(default = "default_faucet_url")]
    pub faucet_url: String,

    /// GM page URL
    #[serde(default = "default_gm_url")]
    pub gm_url: String,

    /// Chain id of the target network, as shown in the GM page's card markup
    #[serde(default = "default_network_id")]
    pub network_id: String,

    /// Display name of the target network
    #[serde(default = "default_network_name")]
    pub network_name: String,

    /// URL namespace that identifies wallet-extension windows
    #[serde(default = "default_wallet_url_namespace")]
    pub wallet_url_namespace: String,

    /// Prefix of the per-profile wallet credential; the serial number is appended
    #[serde(default)]
    pub wallet_credential_prefix: String,

    /// Seconds to wait for a page element before giving up
    #[serde(default = "default_element_wait_secs")]
    pub element_wait_secs: u64,

    /// Seconds to wait for a wallet popup window to appear
    #[serde(default = "default_popup_wait_secs")]
    pub popup_wait_secs: u64,

    /// Seconds to wait for a transaction confirmation popup
    #[serde(default = "default_transaction_wait_secs")]
    pub transaction_wait_secs: u64,

    /// Short probe window used for "is it already done" checks
    #[serde(default = "default_probe_wait_secs")]
    pub probe_wait_secs: u64,

    /// Milliseconds between locator / popup-discovery polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Milliseconds to let a page settle after navigation
    #[serde(default = "default_page_settle_ms")]
    pub page_settle_ms: u64,

    /// Milliseconds to let a popup settle after discovery
    #[serde(default = "default_popup_settle_ms")]
    pub popup_settle_ms: u64,

    /// Milliseconds before the optional second confirmation click
    #[serde(default = "default_second_click_delay_ms")]
    pub second_click_delay_ms: u64,

    /// Attempts per step before reporting failure
    #[serde(default = "default_step_attempts")]
    pub step_attempts: u32,

    /// Reload the page before each retry attempt
    #[serde(default = "default_true")]
    pub reload_between_attempts: bool,

    /// Seconds budgeted for the overlay-dismissal loop
    #[serde(default = "default_dismiss_budget_secs")]
    pub dismiss_budget_secs: u64,

    /// Seconds to poll for a success/error indicator after acting
    #[serde(default = "default_verify_window_secs")]
    pub verify_window_secs: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            faucet_url: default_faucet_url(),
            gm_url: default_gm_url(),
            network_id: default_network_id(),
            network_name: default_network_name(),
            wallet_url_namespace: default_wallet_url_namespace(),
            wallet_credential_prefix: String::new(),
            element_wait_secs: default_element_wait_secs(),
            popup_wait_secs: default_popup_wait_secs(),
            transaction_wait_secs: default_transaction_wait_secs(),
            probe_wait_secs: default_probe_wait_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            page_settle_ms: default_page_settle_ms(),
            popup_settle_ms: default_popup_settle_ms(),
            second_click_delay_ms: default_second_click_delay_ms(),
            step_attempts: default_step_attempts(),
            reload_between_attempts: true,
            dismiss_budget_secs: default_dismiss_budget_secs(),
            verify_window_secs: default_verify_window_secs(),
        }
    }
}

impl AutomationConfig {
    /// Wallet credential for a given profile serial number.
    #[must_use]
    pub fn credential_for(&self, serial_number: u32) -> String {
        format!("{}{}", self.wallet_credential_prefix, serial_number)
    }

    /// Element-wait timeout.
    #[must_use]
    pub fn element_wait(&self) -> Duration {
        Duration::from_secs(self.element_wait_secs)
    }

    /// Popup-discovery timeout.
    #[must_use]
    pub fn popup_wait(&self) -> Duration {
        Duration::from_secs(self.popup_wait_secs)
    }

    /// Transaction-popup timeout.
    #[must_use]
    pub fn transaction_wait(&self) -> Duration {
        Duration::from_secs(self.transaction_wait_secs)
    }

    /// Already-done probe timeout.
    #[must_use]
    pub fn probe_wait(&self) -> Duration {
        Duration::from_secs(self.probe_wait_secs)
    }

    /// Poll interval for locator and popup discovery.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Post-navigation settle delay.
    #[must_use]
    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }

    /// Post-discovery popup settle delay.
    #[must_use]
    pub fn popup_settle(&self) -> Duration {
        Duration::from_millis(self.popup_settle_ms)
    }

    /// Delay before the optional second confirmation click.
    #[must_use]
    pub fn second_click_delay(&self) -> Duration {
        Duration::from_millis(self.second_click_delay_ms)
    }

    /// Overlay-dismissal budget.
    #[must_use]
    pub fn dismiss_budget(&self) -> Duration {
        Duration::from_secs(self.dismiss_budget_secs)
    }

    /// Indicator-verification window.
    #[must_use]
    pub fn verify_window(&self) -> Duration {
        Duration::from_secs(self.verify_window_secs)
    }
}

fn default_faucet_url() -> String {
    "https://docs.tempo.xyz/quickstart/faucet".to_string()
}

fn default_gm_url() -> String {
    "https://onchaingm.com/".to_string()
}

fn default_network_id() -> String {
    "42429".to_string()
}

fn default_network_name() -> String {
    "Tempo Testnet".to_string()
}

fn default_wallet_url_namespace() -> String {
    "chrome-extension://".to_string()
}

fn default_element_wait_secs() -> u64 {
    15
}

fn default_popup_wait_secs() -> u64 {
    30
}

fn default_transaction_wait_secs() -> u64 {
    60
}

fn default_probe_wait_secs() -> u64 {
    3
}

fn default_poll_interval_ms() -> u64 {
    400
}

fn default_page_settle_ms() -> u64 {
    3000
}

fn default_popup_settle_ms() -> u64 {
    1000
}

fn default_second_click_delay_ms() -> u64 {
    1000
}

fn default_step_attempts() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_dismiss_budget_secs() -> u64 {
    10
}

fn default_verify_window_secs() -> u64 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AutomationConfig::default();
        assert_eq!(config.step_attempts, 3);
        assert_eq!(config.poll_interval(), Duration::from_millis(400));
        assert_eq!(config.element_wait(), Duration::from_secs(15));
        assert!(config.reload_between_attempts);
        assert!(config.wallet_url_namespace.starts_with("chrome-extension"));
    }

    #[test]
    fn test_credential_derivation() {
        let config = AutomationConfig {
            wallet_credential_prefix: "Open!".to_string(),
            ..Default::default()
        };
        assert_eq!(config.credential_for(17), "Open!17");
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: AutomationConfig = serde_json::from_value(serde_json::json!({
            "step_attempts": 5,
            "poll_interval_ms": 250
        }))
        .unwrap();
        assert_eq!(config.step_attempts, 5);
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.popup_wait_secs, 30);
    }
}
