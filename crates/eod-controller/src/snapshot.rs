//! Read-only view of the controller state.

use eod_core::{HistorySet, SecurityDescription, SelectOption, SelectionState};
use serde::Serialize;

/// Immutable snapshot published after every mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControllerSnapshot {
    pub engines: Vec<SelectOption>,
    pub markets: Vec<SelectOption>,
    pub securities: Vec<SelectOption>,
    pub selection: SelectionState,
    /// Description text and the board options of the selected security.
    pub description: SecurityDescription,
    pub history: HistorySet,
    /// Last user-visible failure, cleared by the next command.
    pub last_error: Option<String>,
}

impl ControllerSnapshot {
    /// Board options of the selected security.
    pub fn boards(&self) -> &[SelectOption] {
        &self.description.boards
    }

    /// Free-text security query, if the security was typed.
    pub fn free_text(&self) -> Option<&str> {
        self.selection.free_text()
    }

    /// Clear every list below `engines` plus description and history.
    pub(crate) fn clear_markets(&mut self) {
        self.markets.clear();
        self.clear_securities();
    }

    pub(crate) fn clear_securities(&mut self) {
        self.securities.clear();
        self.clear_security_details();
    }

    pub(crate) fn clear_security_details(&mut self) {
        self.description = SecurityDescription::default();
        self.history = HistorySet::empty();
    }
}
