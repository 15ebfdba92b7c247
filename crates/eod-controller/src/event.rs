//! Change notifications published by the controller.

use std::fmt;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::error::{ControllerError, ControllerResult};

/// What a fetch loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadKind {
    Engines,
    Markets,
    Securities,
    Description,
    History,
}

impl LoadKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Engines => "engines",
            Self::Markets => "markets",
            Self::Securities => "securities",
            Self::Description => "description",
            Self::History => "history",
        }
    }
}

impl fmt::Display for LoadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a fetch, emitted after the snapshot has been updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ControllerEvent {
    /// Result applied; `count` is the number of options, boards or points.
    Loaded { kind: LoadKind, count: usize },
    /// Fetch failed; the affected data was left empty.
    Failed { kind: LoadKind, message: String },
    /// Result arrived after a newer selection and was ignored.
    Discarded { kind: LoadKind },
}

impl ControllerEvent {
    pub fn kind(&self) -> LoadKind {
        match self {
            Self::Loaded { kind, .. } | Self::Failed { kind, .. } | Self::Discarded { kind } => {
                *kind
            }
        }
    }
}

/// Wait for the next applied outcome of `kind`.
///
/// Discarded results are skipped: they belong to a superseded selection.
/// Subscribe before issuing the command, or the event may be missed.
pub async fn await_load(
    events: &mut broadcast::Receiver<ControllerEvent>,
    kind: LoadKind,
) -> ControllerResult<usize> {
    loop {
        match events.recv().await {
            Ok(ControllerEvent::Loaded { kind: k, count }) if k == kind => return Ok(count),
            Ok(ControllerEvent::Failed { kind: k, message }) if k == kind => {
                return Err(ControllerError::LoadFailed { kind, message })
            }
            Ok(other) => trace!(?other, waiting_for = %kind, "Skipping event"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                trace!(skipped, "Event receiver lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return Err(ControllerError::Closed),
        }
    }
}
