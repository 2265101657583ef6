//! Error types for tempoflow-sheets

use thiserror::Error;

/// Status store error type
#[derive(Debug, Error)]
pub enum Error {
    /// Sheets API rejected the request
    #[error("sheets api error: {0}")]
    Api(String),

    /// Missing or rejected credentials
    #[error("sheets auth error: {0}")]
    Auth(String),

    /// Response shape was not what the API documents
    #[error("malformed sheets response: {0}")]
    Malformed(String),

    /// HTTP transport failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<Error> for tempoflow_core::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Auth(msg) => tempoflow_core::Error::Configuration(msg),
            other => tempoflow_core::Error::Store(other.to_string()),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
