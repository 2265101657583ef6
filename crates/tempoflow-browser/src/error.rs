//! Error types for tempoflow-browser

use thiserror::Error;

/// Browser collaborator error type
#[derive(Debug, Error)]
pub enum Error {
    /// Farm API rejected the request
    #[error("farm api error: {0}")]
    Api(String),

    /// Farm API cannot be reached at all
    #[error("farm api unreachable: {0}")]
    Unreachable(String),

    /// No profile with this serial number
    #[error("profile {0} not found")]
    ProfileNotFound(u32),

    /// DevTools protocol failure
    #[error("cdp error: {0}")]
    Cdp(String),

    /// HTTP transport failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<Error> for tempoflow_core::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Unreachable(msg) => tempoflow_core::Error::ProvisioningUnavailable(msg),
            Error::ProfileNotFound(serial) => tempoflow_core::Error::ProfileNotFound(serial),
            Error::Api(msg) => tempoflow_core::Error::Provisioning(msg),
            Error::Cdp(msg) => tempoflow_core::Error::Browser(msg),
            Error::Http(e) => tempoflow_core::Error::Provisioning(e.to_string()),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
