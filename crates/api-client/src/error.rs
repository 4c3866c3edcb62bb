use std::time::Duration;
use thiserror::Error;

/// Failure of a single remote call. Never crosses into other calls.
#[derive(Error, Debug)]
pub enum CallError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("The analysis service returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid payload from the analysis service: {0}")]
    Payload(String),

    #[error("Response does not match the request: {0}")]
    SchemaMismatch(String),

    #[error("The call did not complete within {0:?}")]
    Timeout(Duration),

    #[error("The call was aborted before reporting a result: {0}")]
    Aborted(String),
}
