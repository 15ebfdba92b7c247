//! History exporter: script generation plus the file-write collaborator.

use std::path::PathBuf;

use eod_core::HistorySet;
use eod_telemetry::Metrics;
use tracing::{debug, warn};

use crate::config::ExportConfig;
use crate::error::ExportResult;
use crate::script::SqlScriptBuilder;
use crate::sink::{FsScriptSink, ScriptSink};

pub struct HistoryExporter<S: ScriptSink = FsScriptSink> {
    builder: SqlScriptBuilder,
    sink: S,
}

impl HistoryExporter<FsScriptSink> {
    /// Filesystem exporter from configuration. Table names are validated.
    pub fn from_config(config: &ExportConfig) -> ExportResult<Self> {
        let builder = SqlScriptBuilder::new(&config.securities_table, &config.eod_table)?;
        Ok(Self::new(builder, FsScriptSink::new(&config.out_dir)))
    }
}

impl<S: ScriptSink> HistoryExporter<S> {
    pub fn new(builder: SqlScriptBuilder, sink: S) -> Self {
        Self { builder, sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Write the script for `history`.
    ///
    /// Returns `Ok(None)` without touching the sink when `history` is empty.
    pub fn export(&self, symbol: &str, history: &HistorySet) -> ExportResult<Option<PathBuf>> {
        let Some(script) = self.builder.build(symbol, history) else {
            debug!(symbol, "Empty history, nothing to export");
            Metrics::export("skipped");
            return Ok(None);
        };

        match self.sink.write_script(symbol, &script) {
            Ok(path) => {
                Metrics::export("written");
                Ok(Some(path))
            }
            Err(e) => {
                warn!(symbol, error = %e, "Export failed");
                Metrics::export("failed");
                Err(e)
            }
        }
    }
}
