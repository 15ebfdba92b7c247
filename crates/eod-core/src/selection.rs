//! Cascading selection state.
//!
//! Four levels, each depending on the one above it:
//! engine -> market -> security -> board.
//! Setting a level clears every level below it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hierarchy level, ordered from the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Engine,
    Market,
    Security,
    Board,
}

impl Level {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Engine => "engine",
            Self::Market => "market",
            Self::Security => "security",
            Self::Board => "board",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the security was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SecuritySelection {
    /// Picked from the security option list (holds the option code).
    Picked(String),
    /// Typed by the user; may carry a descriptive suffix after the symbol.
    FreeText(String),
}

impl SecuritySelection {
    /// Canonical symbol used for provider calls.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::Picked(code) => canonical_symbol(code),
            Self::FreeText(text) => canonical_symbol(text),
        }
    }
}

/// Substring before the first whitespace, ignoring leading whitespace.
///
/// `"SBER Сбербанк"` -> `Some("SBER")`; blank input -> `None`.
pub fn canonical_symbol(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}

/// The four current selections.
///
/// `market` is only meaningful with `engine` set; board and history only
/// with both `engine` and `market` set. Setters keep that invariant by
/// clearing everything below the level they change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub engine: Option<String>,
    pub market: Option<String>,
    pub security: Option<SecuritySelection>,
    pub board: Option<String>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_engine(&mut self, code: impl Into<String>) {
        self.engine = Some(code.into());
        self.clear_below(Level::Engine);
    }

    pub fn set_market(&mut self, code: impl Into<String>) {
        self.market = Some(code.into());
        self.clear_below(Level::Market);
    }

    pub fn set_security(&mut self, selection: SecuritySelection) {
        self.security = Some(selection);
        self.clear_below(Level::Security);
    }

    pub fn set_board(&mut self, code: impl Into<String>) {
        self.board = Some(code.into());
    }

    /// Unset every level strictly below `level`.
    pub fn clear_below(&mut self, level: Level) {
        if level < Level::Market {
            self.market = None;
        }
        if level < Level::Security {
            self.security = None;
        }
        if level < Level::Board {
            self.board = None;
        }
    }

    /// Canonical symbol of the current security selection.
    pub fn symbol(&self) -> Option<&str> {
        self.security.as_ref().and_then(SecuritySelection::symbol)
    }

    /// Free-text query, when the security was typed rather than picked.
    pub fn free_text(&self) -> Option<&str> {
        match &self.security {
            Some(SecuritySelection::FreeText(text)) => Some(text.as_str()),
            _ => None,
        }
    }
}
