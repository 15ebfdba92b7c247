//! Selectable options and option-list normalization.

use crate::row::Row;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// A selectable entry of one hierarchy level.
///
/// `code` is the lookup key and is unique within a normalized list;
/// `display_name` is a human label and may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub display_name: String,
    pub code: String,
    /// Raw row data retained for later use (e.g. board metadata).
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl SelectOption {
    pub fn new(display_name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            code: code.into(),
            attributes: HashMap::new(),
        }
    }

    /// De-duplication key: `(display_name, code)`.
    #[inline]
    pub fn identity(&self) -> (&str, &str) {
        (&self.display_name, &self.code)
    }
}

/// Which columns of a provider table feed an option list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionColumns {
    pub display: &'static str,
    pub code: &'static str,
}

impl OptionColumns {
    pub const ENGINES: Self = Self {
        display: "title",
        code: "name",
    };
    pub const MARKETS: Self = Self {
        display: "title",
        code: "NAME",
    };
    pub const SECURITIES: Self = Self {
        display: "SECID",
        code: "SECID",
    };
    pub const BOARDS: Self = Self {
        display: "boardid",
        code: "boardid",
    };
}

/// Convert provider rows into options.
///
/// Rows without a code are skipped. A missing display value falls back to
/// the code. Order follows the rows.
pub fn options_from_rows(rows: &[Row], columns: OptionColumns) -> Vec<SelectOption> {
    let mut options = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;

    for row in rows {
        let Some(code) = row.get(columns.code) else {
            skipped += 1;
            continue;
        };
        let display_name = row.get(columns.display).unwrap_or(code);

        options.push(SelectOption {
            display_name: display_name.to_string(),
            code: code.to_string(),
            attributes: row.attributes(),
        });
    }

    if skipped > 0 {
        warn!(
            skipped,
            code_column = columns.code,
            "Skipped rows without option code"
        );
    }

    options
}

/// Remove entries whose `(display_name, code)` pair was already seen.
///
/// Keeps the first occurrence and the original order.
pub fn dedup_options(options: Vec<SelectOption>) -> Vec<SelectOption> {
    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(options.len());
    options
        .into_iter()
        .filter(|o| seen.insert((o.display_name.clone(), o.code.clone())))
        .collect()
}
