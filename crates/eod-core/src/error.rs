//! Error types for eod-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required column is absent (or null) in a row that must carry it.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// A field could not be parsed as an invariant-culture decimal.
    #[error("Invalid decimal in {field}: {value:?}")]
    Parse { field: String, value: String },

    /// A valuation step left the `Decimal` range.
    #[error("Decimal overflow applying {field}")]
    Overflow { field: String },

    /// A trade date could not be parsed.
    #[error("Invalid date in {field}: {value:?}")]
    InvalidDate { field: String, value: String },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
