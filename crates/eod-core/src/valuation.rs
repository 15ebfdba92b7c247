//! Valuation of raw history rows.
//!
//! Bonds are quoted in percent of face value, so their end-of-day value is
//! `CLOSE * FACEVALUE / 100 + ACCINT` (dirty price per bond). Every other
//! market uses `CLOSE` as is.

use crate::decimal::parse_decimal;
use crate::error::{CoreError, Result};
use crate::history::{HistoryPoint, HistorySet};
use crate::row::Row;
use chrono::NaiveDate;
use rust_decimal::Decimal;

pub const TRADE_DATE: &str = "TRADEDATE";
pub const BOARD_ID: &str = "BOARDID";
pub const CLOSE: &str = "CLOSE";
pub const FACE_VALUE: &str = "FACEVALUE";
pub const ACCRUED_INTEREST: &str = "ACCINT";

/// Market code whose rows are valued as bonds.
pub const BONDS_MARKET: &str = "bonds";

/// Valuation rule selected by market code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketKind {
    Bonds,
    Other,
}

impl MarketKind {
    pub fn from_code(market_code: &str) -> Self {
        if market_code == BONDS_MARKET {
            Self::Bonds
        } else {
            Self::Other
        }
    }
}

fn decimal_field(row: &Row, field: &str) -> Result<Decimal> {
    parse_decimal(field, row.require(field)?)
}

/// Normalized price of one row.
///
/// Fails with `MissingField`/`Parse` if a field the rule needs is absent or
/// not a decimal, and with `Overflow` if the result leaves the `Decimal`
/// range.
pub fn price_of(row: &Row, market_code: &str) -> Result<Decimal> {
    let close = decimal_field(row, CLOSE)?;

    match MarketKind::from_code(market_code) {
        MarketKind::Bonds => {
            let face_value = decimal_field(row, FACE_VALUE)?;
            let accrued = decimal_field(row, ACCRUED_INTEREST)?;
            let overflow = |field: &str| CoreError::Overflow {
                field: field.to_string(),
            };
            close
                .checked_mul(face_value)
                .ok_or_else(|| overflow(FACE_VALUE))?
                .checked_div(Decimal::ONE_HUNDRED)
                .ok_or_else(|| overflow(FACE_VALUE))?
                .checked_add(accrued)
                .ok_or_else(|| overflow(ACCRUED_INTEREST))
        }
        MarketKind::Other => Ok(close),
    }
}

fn parse_trade_date(raw: &str) -> Result<NaiveDate> {
    // Tolerate a time suffix ("2023-01-02 00:00:00" / "2023-01-02T00:00:00")
    let date_part = raw
        .trim()
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or_default();

    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| CoreError::InvalidDate {
        field: TRADE_DATE.to_string(),
        value: raw.to_string(),
    })
}

/// Convert one history row into a point.
///
/// Returns `Ok(None)` for rows without a close price (no trades that day);
/// those rows are filtered out, not errors.
pub fn history_point(row: &Row, market_code: &str) -> Result<Option<HistoryPoint>> {
    if row.get(CLOSE).is_none() {
        return Ok(None);
    }

    let date = parse_trade_date(row.require(TRADE_DATE)?)?;
    let board_code = row.require(BOARD_ID)?.to_string();
    let value = price_of(row, market_code)?;

    Ok(Some(HistoryPoint {
        date,
        board_code,
        value,
    }))
}

/// Value every row, keeping provider order.
///
/// One malformed row fails the whole batch.
pub fn value_history(rows: &[Row], market_code: &str) -> Result<HistorySet> {
    let mut points = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(point) = history_point(row, market_code)? {
            points.push(point);
        }
    }
    Ok(HistorySet::new(points))
}
