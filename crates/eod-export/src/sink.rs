//! Script destinations.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use tracing::info;

use crate::error::{ExportError, ExportResult};

/// Persists a generated script under `{symbol}.sql`.
pub trait ScriptSink: Send + Sync {
    /// Write `script`, replacing any previous file for `symbol`.
    fn write_script(&self, symbol: &str, script: &str) -> ExportResult<PathBuf>;
}

/// Writes scripts into a directory.
#[derive(Debug, Clone)]
pub struct FsScriptSink {
    out_dir: PathBuf,
}

impl FsScriptSink {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    fn file_name(symbol: &str) -> ExportResult<String> {
        let invalid = symbol.is_empty()
            || symbol.contains("..")
            || symbol.chars().any(|c| matches!(c, '/' | '\\' | '\0'));
        if invalid {
            return Err(ExportError::InvalidSymbol(symbol.to_string()));
        }
        Ok(format!("{symbol}.sql"))
    }
}

impl ScriptSink for FsScriptSink {
    fn write_script(&self, symbol: &str, script: &str) -> ExportResult<PathBuf> {
        let path = self.out_dir.join(Self::file_name(symbol)?);

        fs::create_dir_all(&self.out_dir)?;
        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(script.as_bytes())?;
        writer.flush()?;

        info!(path = %path.display(), bytes = script.len(), "Wrote SQL script");
        Ok(path)
    }
}
