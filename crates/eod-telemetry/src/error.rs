//! Errors raised while wiring up logging or rendering metrics.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter {filter:?}: {message}")]
    Filter { filter: String, message: String },

    #[error("tracing subscriber already installed: {0}")]
    Subscriber(String),

    #[error("metrics encoding failed: {0}")]
    Encode(String),
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;
