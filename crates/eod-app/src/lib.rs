//! MOEX end-of-day history browser and SQL exporter.
//!
//! Wires the ISS gateway, the selection controller and the history
//! exporter behind a command-line presentation layer.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;

pub use app::Application;
pub use cli::{Cli, Command, OutputFormat};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
