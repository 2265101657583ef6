//! Integration tests for Tempoflow
//!
//! These tests verify the integration between the crates:
//! - tempoflow-core: task model, query chains, outcomes
//! - tempoflow-sheets: cell parsing against the core's status types
//! - tempoflow-browser: farm configuration defaults

use tempoflow_browser::FarmConfig;
use tempoflow_core::{
    parse_cooldown, AutomationConfig, InteractionPolicy, OverallStatus, ProfileTask,
    QueryCandidate, QueryChain, RowHandle, StepName, StepStatus,
};
use tempoflow_sheets::{column_letter, SheetsConfig};

// ============================================================================
// Status round trips between core types and store cells
// ============================================================================

#[test]
fn test_step_status_cells_round_trip_through_core_types() {
    for status in [
        StepStatus::Ok,
        StepStatus::Failed(Some("popup timeout".into())),
        StepStatus::Pending,
    ] {
        let cell = status.to_cell();
        assert_eq!(StepStatus::from_cell(&cell), status);
    }
}

#[test]
fn test_overall_error_cell_keeps_truncated_reason() {
    let status = OverallStatus::Error(Some("x".repeat(200)));
    let cell = status.to_cell();
    assert!(cell.starts_with("ERROR: "));
    assert!(cell.len() <= "ERROR: ".len() + tempoflow_core::MAX_STATUS_MESSAGE_LEN);
}

#[test]
fn test_sheet_columns_match_step_names() {
    let config = SheetsConfig::default();
    assert_eq!(config.step_col(StepName::AddFunds), 1);
    assert_eq!(config.step_col(StepName::FeeToken), 2);
    assert_eq!(config.step_col(StepName::Gm), 3);
    assert_eq!(column_letter(config.step_col(StepName::Gm)), "D");
}

// ============================================================================
// Task selection semantics
// ============================================================================

#[test]
fn test_partial_progress_produces_partial_needed_set() {
    let mut task = ProfileTask::new(17, RowHandle(4));
    task.step_status.insert(StepName::AddFunds, StepStatus::Ok);
    task.overall_status = OverallStatus::Error(Some("GM: popup timeout".into()));

    let needed = task.needed_steps();
    assert!(!needed.contains(StepName::AddFunds));
    assert!(needed.contains(StepName::FeeToken));
    assert!(needed.contains(StepName::Gm));
    assert!(task.is_pending());
}

// ============================================================================
// Data-model serde stability
// ============================================================================

#[test]
fn test_query_chain_serializes_as_data() {
    let chain = QueryChain::new(
        "confirm button",
        vec![
            QueryCandidate::by_test_attribute("confirm-footer-button"),
            QueryCandidate::by_text("Confirm").within("#modal"),
        ],
    );
    let json = serde_json::to_string(&chain).unwrap();
    let back: QueryChain = serde_json::from_str(&json).unwrap();
    assert_eq!(back, chain);
}

#[test]
fn test_interaction_policy_round_trip() {
    let policy = InteractionPolicy::stubborn();
    let json = serde_json::to_string(&policy).unwrap();
    let back: InteractionPolicy = serde_json::from_str(&json).unwrap();
    assert_eq!(back, policy);
}

// ============================================================================
// Cooldown note format
// ============================================================================

#[test]
fn test_cooldown_note_matches_store_convention() {
    assert_eq!(parse_cooldown("07h 27m").as_deref(), Some("CD 07h27m"));
    assert_eq!(parse_cooldown("no timer"), None);
}

// ============================================================================
// Collaborator configuration defaults
// ============================================================================

#[test]
fn test_farm_and_automation_defaults_are_consistent() {
    let farm = FarmConfig::default();
    let automation = AutomationConfig::default();
    assert!(farm.api_url.starts_with("http://"));
    assert!(automation.wallet_url_namespace.starts_with("chrome-extension"));
    assert_eq!(automation.credential_for(17), "17");
}
