//! Core domain types for the MOEX end-of-day exporter.
//!
//! This crate provides the data model shared by the gateway, the selection
//! controller and the exporter:
//! - `Row`: One raw row of a provider table (column -> nullable text)
//! - `SelectOption`: A selectable entry of one hierarchy level
//! - `SelectionState`, `SecuritySelection`: The four-level cascading selection
//! - `HistoryPoint`, `HistorySet`, `SecurityDescription`: Derived results
//! - `valuation`: Conversion of raw history rows into normalized prices

pub mod decimal;
pub mod error;
pub mod history;
pub mod option;
pub mod row;
pub mod selection;
pub mod valuation;

pub use decimal::parse_decimal;
pub use error::{CoreError, Result};
pub use history::{HistoryPoint, HistorySet, SecurityDescription};
pub use option::{dedup_options, options_from_rows, OptionColumns, SelectOption};
pub use row::Row;
pub use selection::{canonical_symbol, Level, SecuritySelection, SelectionState};
pub use valuation::{history_point, price_of, value_history, MarketKind};
