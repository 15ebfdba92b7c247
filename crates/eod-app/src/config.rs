//! Application configuration.

use crate::error::{AppError, AppResult};
use eod_controller::ControllerConfig;
use eod_export::{validate_identifier, ExportConfig};
use eod_gateway::IssConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "EOD_CONFIG";

/// Used when neither `--config` nor `EOD_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Top-level configuration, one TOML table per component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub iss: IssConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Resolve the configuration path: CLI flag > `EOD_CONFIG` > default.
    ///
    /// The flag indicates whether the path was given explicitly.
    pub fn resolve_path(cli_path: Option<&str>) -> (String, bool) {
        match cli_path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_ENV).ok())
        {
            Some(path) => (path, true),
            None => (DEFAULT_CONFIG_PATH.to_string(), false),
        }
    }

    /// Load configuration.
    ///
    /// An explicit path must exist; a missing default file falls back to
    /// built-in defaults.
    pub fn load(cli_path: Option<&str>) -> AppResult<Self> {
        let (path, explicit) = Self::resolve_path(cli_path);

        if explicit || Path::new(&path).exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.iss.base_url.trim().is_empty() {
            return Err(AppError::Config("iss.base_url must not be empty".to_string()));
        }
        if self.iss.timeout_ms == 0 {
            return Err(AppError::Config("iss.timeout_ms must be positive".to_string()));
        }
        for table in [&self.export.securities_table, &self.export.eod_table] {
            validate_identifier(table).map_err(|e| AppError::Config(e.to_string()))?;
        }
        Ok(())
    }
}
