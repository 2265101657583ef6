//! Tempoflow Core - Automation Orchestration Engine
//!
//! This crate drives a multi-step, multi-window wallet workflow against an
//! unreliable web UI:
//! - Locator: ordered, typed selector chains resolved by polling
//! - Wallet: discovery and driving of the wallet-extension popup windows
//! - Flows: the faucet and GM step executors with retry and verification
//! - Orchestrator: per-profile processing with idempotent step skipping and
//!   guaranteed session release
//!
//! Browser provisioning and the status store are consumed as injected
//! capabilities ([`provision`], [`store`], [`surface`]); their concrete
//! implementations live in the collaborator crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod detect;
pub mod engine;
pub mod error;
pub mod flows;
pub mod interaction;
pub mod locator;
pub mod orchestrator;
pub mod outcome;
pub mod provision;
pub mod query;
pub mod retry;
pub mod store;
pub mod surface;
pub mod task;
pub mod wallet;

pub use config::AutomationConfig;
pub use detect::{parse_cooldown, Detection, DetectionPredicate};
pub use engine::{FlowEngine, UiFlowEngine};
pub use error::{Error, ErrorKind, Result};
pub use flows::{FaucetFlow, FaucetReport, FlowContext, GmFlow};
pub use interaction::{attempt_interaction, ClickTechnique, InteractionPolicy};
pub use locator::{ElementLocator, LocatedElement};
pub use orchestrator::ProfileOrchestrator;
pub use outcome::{ProcessOutcome, StepOutcome};
pub use provision::{BrowserSession, SessionProvisioner, SessionState};
pub use query::{ElementState, QueryCandidate, QueryChain, QueryStrategy};
pub use retry::{retry_with_backoff, RetryConfig};
pub use store::StatusStore;
pub use surface::{AutomationSurface, PageHandle};
pub use task::{
    NeededSteps, OverallStatus, ProfileTask, RowHandle, StepName, StepStatus,
    MAX_STATUS_MESSAGE_LEN,
};
pub use wallet::{PopupPhase, WalletPopupController};
