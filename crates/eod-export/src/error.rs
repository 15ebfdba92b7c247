//! Export error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Symbol cannot be used as a file name.
    #[error("Invalid symbol for file name: {0:?}")]
    InvalidSymbol(String),

    /// Configured table name is not a plain SQL identifier.
    #[error("Invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),
}

pub type ExportResult<T> = Result<T, ExportError>;
