//! History export for moex-eod.
//!
//! Serializes a priced history into SQL insert statements and hands the
//! text to a [`ScriptSink`] (by default one `{symbol}.sql` file per
//! security, overwritten on every export).

pub mod config;
pub mod error;
pub mod exporter;
pub mod script;
pub mod sink;

pub use config::ExportConfig;
pub use error::{ExportError, ExportResult};
pub use exporter::HistoryExporter;
pub use script::{quote_literal, to_sql_script, validate_identifier, SqlScriptBuilder};
pub use sink::{FsScriptSink, ScriptSink};
