//! Step and run outcomes
//!
//! Every executor step reports a [`StepOutcome`]; a whole profile run reports
//! a [`ProcessOutcome`]. Step results are always this one shape, never a
//! bare bool: a success flag, an optional note (e.g. a cooldown timer
//! string), and an optional error kind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};
use crate::task::{truncate_message, StepName};

/// Result of one executor step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Whether the step completed (or was detected as already complete)
    pub succeeded: bool,
    /// Optional context, e.g. a cooldown timer string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Error classification when the step failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl StepOutcome {
    /// A plain success.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            succeeded: true,
            note: None,
            error: None,
        }
    }

    /// A success carrying a note (e.g. `"CD 07h27m"` for a cooldown skip).
    #[must_use]
    pub fn ok_with_note(note: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            note: Some(note.into()),
            error: None,
        }
    }

    /// A failure with a note describing what was observed.
    #[must_use]
    pub fn failed(kind: ErrorKind, note: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            note: Some(note.into()),
            error: Some(kind),
        }
    }

    /// A failure derived from a core error.
    #[must_use]
    pub fn from_error(error: &Error) -> Self {
        Self {
            succeeded: false,
            note: Some(error.to_string()),
            error: Some(error.kind()),
        }
    }

    /// The note, or the error kind, as a store-ready reason string.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        match (&self.note, self.error) {
            (Some(note), _) => Some(truncate_message(note)),
            (None, Some(kind)) => Some(kind.to_string()),
            (None, None) => None,
        }
    }
}

/// Aggregated result of processing one profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOutcome {
    /// Whether every attempted step succeeded
    pub success: bool,
    /// Outcome of each attempted step (skipped steps are absent)
    pub per_step: BTreeMap<StepName, StepOutcome>,
    /// Diagnostic message on failure, truncated to the store's budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The failure makes continuing the batch pointless (provisioning gone)
    #[serde(default)]
    pub batch_fatal: bool,
}

impl ProcessOutcome {
    /// A run in which nothing needed to happen.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            success: true,
            per_step: BTreeMap::new(),
            message: None,
            batch_fatal: false,
        }
    }

    /// A profile-level failure that never reached (or aborted) step execution.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            per_step: BTreeMap::new(),
            message: Some(truncate_message(&message.into())),
            batch_fatal: false,
        }
    }

    /// Mark this failure as one that should stop the whole batch.
    #[must_use]
    pub fn fatal(mut self) -> Self {
        self.batch_fatal = true;
        self
    }

    /// Record one step's outcome, folding it into the aggregate flag.
    pub fn record(&mut self, step: StepName, outcome: StepOutcome) {
        if !outcome.succeeded {
            self.success = false;
            if self.message.is_none() {
                let reason = outcome
                    .reason()
                    .unwrap_or_else(|| "step failed".to_string());
                self.message = Some(truncate_message(&format!("{step}: {reason}")));
            }
        }
        self.per_step.insert(step, outcome);
    }
}

impl Default for ProcessOutcome {
    fn default() -> Self {
        Self::noop()
    }
}
