//! Gateway error types.

use thiserror::Error;

/// Transport, status or response-shape failure of a provider call.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
