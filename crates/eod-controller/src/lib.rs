//! Selection hierarchy controller for moex-eod.
//!
//! Owns the cascading engine -> market -> security -> board selection,
//! refetches everything downstream on change and discards late results of
//! superseded selections.
//!
//! # Key Components
//!
//! - [`ControllerHandle`]: Cloneable command and snapshot interface
//! - [`ControllerTask`]: The actor owning all state
//! - [`ControllerSnapshot`]: Immutable view published after every change
//! - [`ControllerEvent`]: Loaded / Failed / Discarded notifications
//! - [`await_load`]: Wait for the outcome of one load kind

pub mod config;
pub mod controller;
pub mod epoch;
pub mod error;
pub mod event;
pub mod snapshot;

pub use config::ControllerConfig;
pub use controller::{spawn_controller, ControllerHandle, ControllerTask};
pub use error::{ControllerError, ControllerResult};
pub use event::{await_load, ControllerEvent, LoadKind};
pub use snapshot::ControllerSnapshot;
