//! Locale-independent decimal parsing.
//!
//! Provider values arrive as text (JSON numbers are kept in their textual
//! form by the gateway). Parsing always uses a period as the decimal
//! separator, whatever the host locale, and never goes through `f64`.

use crate::error::{CoreError, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse `raw` as an invariant-culture decimal.
///
/// Accepts an optional sign, a period decimal separator and scientific
/// notation (`1.5e-3`), surrounded by optional whitespace. Group separators
/// (commas, spaces inside the number) are rejected.
pub fn parse_decimal(field: &str, raw: &str) -> Result<Decimal> {
    let trimmed = raw.trim();
    let invalid = || CoreError::Parse {
        field: field.to_string(),
        value: raw.to_string(),
    };

    if trimmed.is_empty() || trimmed.contains(',') || trimmed.contains(char::is_whitespace) {
        return Err(invalid());
    }

    if trimmed.contains(['e', 'E']) {
        return Decimal::from_scientific(trimmed).map_err(|_| invalid());
    }

    Decimal::from_str(trimmed).map_err(|_| invalid())
}
