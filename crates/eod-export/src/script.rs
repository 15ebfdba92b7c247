//! SQL script generation.
//!
//! A history set becomes a T-SQL batch that resolves the security id once
//! and bulk-inserts one row per trading day:
//!
//! ```text
//! DECLARE @Id INT = (SELECT Id FROM Securities WHERE Symbol='SBER' and Board='TQBR');
//!
//! INSERT INTO EndOfDay (SecurityId, Date, Value) VALUES
//! (@Id,20230102,100.5),
//! (@Id,20230103,101.0);
//! ```

use std::fmt::Write;

use eod_core::HistorySet;

use crate::error::{ExportError, ExportResult};

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Accept `[A-Za-z_][A-Za-z0-9_.]*`.
pub fn validate_identifier(name: &str) -> ExportResult<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');

    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(ExportError::InvalidIdentifier(name.to_string()))
    }
}

/// Builds insert scripts for configurable table names.
#[derive(Debug, Clone)]
pub struct SqlScriptBuilder {
    securities_table: String,
    eod_table: String,
}

impl Default for SqlScriptBuilder {
    fn default() -> Self {
        Self {
            securities_table: "Securities".to_string(),
            eod_table: "EndOfDay".to_string(),
        }
    }
}

impl SqlScriptBuilder {
    pub fn new(securities_table: &str, eod_table: &str) -> ExportResult<Self> {
        validate_identifier(securities_table)?;
        validate_identifier(eod_table)?;
        Ok(Self {
            securities_table: securities_table.to_string(),
            eod_table: eod_table.to_string(),
        })
    }

    /// Script for `history`, `None` when it is empty.
    ///
    /// The id lookup uses the board of the first point.
    pub fn build(&self, symbol: &str, history: &HistorySet) -> Option<String> {
        let first = history.first()?;

        let mut script = String::with_capacity(128 + history.len() * 24);
        // Writing to a String cannot fail.
        let _ = writeln!(
            script,
            "DECLARE @Id INT = (SELECT Id FROM {} WHERE Symbol={} and Board={});",
            self.securities_table,
            quote_literal(symbol),
            quote_literal(&first.board_code)
        );
        script.push('\n');
        let _ = writeln!(
            script,
            "INSERT INTO {} (SecurityId, Date, Value) VALUES",
            self.eod_table
        );

        let last = history.len() - 1;
        for (idx, point) in history.iter().enumerate() {
            let terminator = if idx == last { ';' } else { ',' };
            let _ = writeln!(script, "(@Id,{},{}){}", point.date_key(), point.value, terminator);
        }

        Some(script)
    }
}

/// Script with the default table names, `None` for an empty set.
pub fn to_sql_script(symbol: &str, history: &HistorySet) -> Option<String> {
    SqlScriptBuilder::default().build(symbol, history)
}
