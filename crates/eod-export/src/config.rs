//! Exporter configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory receiving `{symbol}.sql`.
    #[serde(default = "default_out_dir")]
    pub out_dir: String,
    #[serde(default = "default_securities_table")]
    pub securities_table: String,
    #[serde(default = "default_eod_table")]
    pub eod_table: String,
    /// Write the script after every successful history fetch.
    #[serde(default = "default_auto_export")]
    pub auto_export: bool,
}

fn default_out_dir() -> String {
    ".".to_string()
}

fn default_securities_table() -> String {
    "Securities".to_string()
}

fn default_eod_table() -> String {
    "EndOfDay".to_string()
}

fn default_auto_export() -> bool {
    true
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            securities_table: default_securities_table(),
            eod_table: default_eod_table(),
            auto_export: default_auto_export(),
        }
    }
}
