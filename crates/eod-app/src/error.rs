//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gateway error: {0}")]
    Gateway(#[from] eod_gateway::GatewayError),

    #[error(transparent)]
    Controller(#[from] eod_controller::ControllerError),

    #[error("Export error: {0}")]
    Export(#[from] eod_export::ExportError),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;
