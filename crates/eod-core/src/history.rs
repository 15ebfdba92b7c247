//! Derived results: priced history and security descriptions.

use crate::option::{options_from_rows, OptionColumns, SelectOption};
use crate::row::Row;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One priced trading day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub board_code: String,
    /// Normalized price (see `valuation::price_of`).
    pub value: Decimal,
}

impl HistoryPoint {
    pub fn new(date: NaiveDate, board_code: impl Into<String>, value: Decimal) -> Self {
        Self {
            date,
            board_code: board_code.into(),
            value,
        }
    }

    /// Date encoded as `year * 10000 + month * 100 + day`.
    #[inline]
    pub fn date_key(&self) -> i64 {
        i64::from(self.date.year()) * 10_000
            + i64::from(self.date.month()) * 100
            + i64::from(self.date.day())
    }
}

/// Ordered history of one security/board query.
///
/// Order is the provider's order (chronological ascending); never re-sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistorySet {
    points: Vec<HistoryPoint>,
}

impl HistorySet {
    pub fn new(points: Vec<HistoryPoint>) -> Self {
        Self { points }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn first(&self) -> Option<&HistoryPoint> {
        self.points.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HistoryPoint> {
        self.points.iter()
    }
}

impl<'a> IntoIterator for &'a HistorySet {
    type Item = &'a HistoryPoint;
    type IntoIter = std::slice::Iter<'a, HistoryPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl FromIterator<HistoryPoint> for HistorySet {
    fn from_iter<T: IntoIterator<Item = HistoryPoint>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Text rendering of a security's metadata plus its valid boards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityDescription {
    /// `name: value` lines joined by `\n`.
    pub text: String,
    pub boards: Vec<SelectOption>,
}

impl SecurityDescription {
    /// Build from the provider's `description` and `boards` tables.
    pub fn from_tables(description: &[Row], boards: &[Row]) -> Self {
        let text = description
            .iter()
            .map(|row| {
                format!(
                    "{}: {}",
                    row.get("name").unwrap_or_default(),
                    row.get("value").unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            text,
            boards: options_from_rows(boards, OptionColumns::BOARDS),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.boards.is_empty()
    }
}
