//! Workflow-page selector chains and indicator predicates
//!
//! Everything page-specific lives here as data: candidate chains for the
//! controls each step clicks, and detection predicates for "already done",
//! success, and failure states. The executors never embed selector strings.

use crate::config::AutomationConfig;
use crate::detect::DetectionPredicate;
use crate::query::{QueryCandidate, QueryChain};

// ---------------------------------------------------------------------------
// Faucet page
// ---------------------------------------------------------------------------

/// Button that starts the wallet-connect handshake.
#[must_use]
pub fn faucet_connect_button() -> QueryChain {
    QueryChain::new(
        "wallet connect button",
        vec![
            QueryCandidate::by_text("MetaMask"),
            QueryCandidate::by_structural_path("button:has(img[alt=\"MetaMask\"])"),
            QueryCandidate::by_role("button"),
        ],
    )
}

/// Button that offers adding the network to the wallet.
#[must_use]
pub fn add_network_button(config: &AutomationConfig) -> QueryChain {
    QueryChain::new(
        "add network button",
        vec![
            QueryCandidate::by_text(format!("Add {} to", short_name(config))),
            QueryCandidate::by_text(format!("Add {}", short_name(config))),
        ],
    )
}

/// Button that claims test funds.
#[must_use]
pub fn claim_funds_button() -> QueryChain {
    QueryChain::new(
        "claim funds button",
        vec![
            QueryCandidate::by_test_attribute("faucet-add-funds"),
            QueryCandidate::by_text("Add funds"),
        ],
    )
}

/// Button that sets the fee token.
#[must_use]
pub fn fee_token_button() -> QueryChain {
    QueryChain::new(
        "fee token button",
        vec![
            QueryCandidate::by_test_attribute("faucet-set-fee-token"),
            QueryCandidate::by_text("Set fee token"),
        ],
    )
}

/// Signs that the faucet page already has a connected wallet.
#[must_use]
pub fn faucet_connected_indicator() -> DetectionPredicate {
    DetectionPredicate::TextContainsAny {
        scope: None,
        needles: vec!["disconnect".into(), "connected".into()],
    }
}

/// Success banner after claiming funds.
#[must_use]
pub fn claim_success_indicator() -> DetectionPredicate {
    DetectionPredicate::TextContainsAny {
        scope: None,
        needles: vec!["funds added".into(), "tokens sent".into(), "claimed".into()],
    }
}

/// Known failure banners on the claim step.
#[must_use]
pub fn claim_error_indicator() -> DetectionPredicate {
    DetectionPredicate::TextContainsAny {
        scope: None,
        needles: vec![
            "try again later".into(),
            "rate limit".into(),
            "something went wrong".into(),
        ],
    }
}

/// Success banner after setting the fee token.
#[must_use]
pub fn fee_token_success_indicator() -> DetectionPredicate {
    DetectionPredicate::TextContainsAny {
        scope: None,
        needles: vec!["fee token set".into(), "fee token updated".into()],
    }
}

/// Known failure banners on the fee-token step.
#[must_use]
pub fn fee_token_error_indicator() -> DetectionPredicate {
    DetectionPredicate::TextContainsAny {
        scope: None,
        needles: vec!["transaction failed".into(), "rejected".into()],
    }
}

// ---------------------------------------------------------------------------
// GM page
// ---------------------------------------------------------------------------

/// CSS scope of the target network's card.
#[must_use]
pub fn gm_card_scope(config: &AutomationConfig) -> String {
    format!("[data-network-id=\"{}\"]", config.network_id)
}

/// The target network's card itself.
#[must_use]
pub fn gm_card(config: &AutomationConfig) -> QueryChain {
    QueryChain::new(
        "network card",
        vec![
            QueryCandidate::by_structural_path(gm_card_scope(config)),
            QueryCandidate::by_structural_path(format!(
                "div.card[data-network=\"{}\"]",
                config.network_name
            )),
        ],
    )
}

/// Connect button inside the card.
#[must_use]
pub fn gm_connect_button(config: &AutomationConfig) -> QueryChain {
    let scope = gm_card_scope(config);
    QueryChain::new(
        "card connect button",
        vec![
            QueryCandidate::by_text("Connect"),
            QueryCandidate::by_structural_path("button"),
        ],
    )
    .scoped(&scope)
}

/// Wallet option inside the wallet-selection modal.
#[must_use]
pub fn gm_wallet_option() -> QueryChain {
    QueryChain::new(
        "wallet option",
        vec![
            QueryCandidate::by_test_attribute("rk-wallet-option-io.metamask"),
            QueryCandidate::by_text("MetaMask"),
        ],
    )
}

/// The GM button inside the card.
#[must_use]
pub fn gm_button(config: &AutomationConfig) -> QueryChain {
    let scope = gm_card_scope(config);
    QueryChain::new(
        "gm button",
        vec![
            QueryCandidate::by_text("GM"),
            QueryCandidate::by_structural_path("button"),
        ],
    )
    .scoped(&scope)
}

/// Card already shows a GM button, i.e. the wallet is connected.
#[must_use]
pub fn gm_connected_indicator(config: &AutomationConfig) -> DetectionPredicate {
    let scope = gm_card_scope(config);
    DetectionPredicate::ElementVisible(
        QueryChain::new("gm button visible", vec![QueryCandidate::by_text("GM")]).scoped(&scope),
    )
}

/// Countdown shown inside the card while the daily GM is on cooldown.
#[must_use]
pub fn gm_cooldown_indicator(config: &AutomationConfig) -> DetectionPredicate {
    DetectionPredicate::CooldownTimer {
        scope: Some(gm_card_scope(config)),
    }
}

/// Success state after sending the GM transaction.
#[must_use]
pub fn gm_success_indicator(config: &AutomationConfig) -> DetectionPredicate {
    DetectionPredicate::TextContainsAny {
        scope: Some(gm_card_scope(config)),
        needles: vec!["gm sent".into(), "sent today".into(), "see you tomorrow".into()],
    }
}

/// Known failure states on the GM step.
#[must_use]
pub fn gm_error_indicator() -> DetectionPredicate {
    DetectionPredicate::TextContainsAny {
        scope: None,
        needles: vec!["transaction failed".into(), "rejected".into(), "insufficient".into()],
    }
}

/// First word of the configured network name, as page copy abbreviates it.
fn short_name(config: &AutomationConfig) -> &str {
    config
        .network_name
        .split_whitespace()
        .next()
        .unwrap_or(&config.network_name)
}
