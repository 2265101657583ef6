//! Error types for tempoflow-core

use std::time::Duration;
use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or incomplete configuration; aborts the batch before any profile runs
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Provisioning service unreachable; aborts the whole batch
    #[error("provisioning unavailable: {0}")]
    ProvisioningUnavailable(String),

    /// Provisioning failed for one profile (e.g. open/stop request rejected)
    #[error("provisioning error: {0}")]
    Provisioning(String),

    /// Profile missing from the provisioning service; aborts only that profile
    #[error("profile {0} not found")]
    ProfileNotFound(u32),

    /// No wallet popup appeared within the discovery window
    #[error("wallet popup not found within {0:?}")]
    PopupNotFound(Duration),

    /// Wallet popup was found but an operation on it timed out
    #[error("wallet popup timed out: {0}")]
    PopupTimeout(String),

    /// The wallet rejected the credential; never retried for this profile
    #[error("incorrect wallet credential")]
    IncorrectCredential,

    /// Candidate chain exhausted over the full timeout
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// Neither a success nor a known-error indicator was observed
    #[error("ambiguous page state: {0}")]
    AmbiguousUiState(String),

    /// Status store read/write failure
    #[error("status store error: {0}")]
    Store(String),

    /// Browser/CDP transport failure
    #[error("browser error: {0}")]
    Browser(String),
}

impl Error {
    /// Classify this error into the coarse kind recorded on step outcomes.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::ProvisioningUnavailable(_) | Error::Provisioning(_) | Error::ProfileNotFound(_) => {
                ErrorKind::Provisioning
            }
            Error::PopupNotFound(_) => ErrorKind::PopupNotFound,
            Error::PopupTimeout(_) => ErrorKind::PopupTimeout,
            Error::IncorrectCredential => ErrorKind::IncorrectCredential,
            Error::ElementNotFound(_) => ErrorKind::ElementNotFound,
            Error::AmbiguousUiState(_) => ErrorKind::AmbiguousUi,
            Error::Store(_) => ErrorKind::Store,
            Error::Browser(_) => ErrorKind::Browser,
        }
    }

    /// Whether retrying the same operation can possibly succeed.
    ///
    /// An incorrect credential stays incorrect; everything else is
    /// timing-dependent and worth another attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Error::IncorrectCredential | Error::Configuration(_) | Error::ProfileNotFound(_)
        )
    }

    /// Whether this error ends the whole profile run, not just one step.
    #[must_use]
    pub fn is_profile_fatal(&self) -> bool {
        matches!(
            self,
            Error::IncorrectCredential | Error::ProfileNotFound(_) | Error::Provisioning(_)
        )
    }

    /// Whether this error aborts the entire batch.
    #[must_use]
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::ProvisioningUnavailable(_))
    }
}

/// Coarse error classification carried inside a [`StepOutcome`].
///
/// [`StepOutcome`]: crate::outcome::StepOutcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid configuration
    Configuration,
    /// Provisioning-service failure
    Provisioning,
    /// Wallet popup never appeared
    PopupNotFound,
    /// Wallet popup operation timed out
    PopupTimeout,
    /// Wallet credential rejected
    IncorrectCredential,
    /// Candidate chain exhausted
    ElementNotFound,
    /// No decisive indicator observed
    AmbiguousUi,
    /// Status store failure
    Store,
    /// Browser transport failure
    Browser,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Provisioning => "provisioning",
            ErrorKind::PopupNotFound => "popup_not_found",
            ErrorKind::PopupTimeout => "popup_timeout",
            ErrorKind::IncorrectCredential => "incorrect_credential",
            ErrorKind::ElementNotFound => "element_not_found",
            ErrorKind::AmbiguousUi => "ambiguous_ui",
            ErrorKind::Store => "store",
            ErrorKind::Browser => "browser",
        };
        f.write_str(s)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
