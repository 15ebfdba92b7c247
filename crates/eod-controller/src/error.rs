//! Controller error types.

use eod_core::CoreError;
use eod_gateway::GatewayError;
use thiserror::Error;

use crate::event::LoadKind;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Invalid provider data: {0}")]
    Core(#[from] CoreError),

    /// An operation was invoked without its prerequisite selection.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Reported by [`crate::await_load`], which only sees the event text.
    #[error("{kind} load failed: {message}")]
    LoadFailed { kind: LoadKind, message: String },

    /// The result was discarded because a newer selection replaced it.
    #[error("Request superseded by a newer selection")]
    Superseded,

    #[error("Controller task is closed")]
    Closed,
}

pub type ControllerResult<T> = Result<T, ControllerError>;
