//! Application orchestration.
//!
//! The CLI acts as the presentation layer: every command drives the
//! selection controller the way an interactive UI would (initialize, then
//! cascade selections, waiting for each level to load) and renders the
//! resulting snapshot.

use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;

use eod_controller::{
    await_load, spawn_controller, ControllerError, ControllerHandle, ControllerSnapshot, LoadKind,
};
use eod_core::{canonical_symbol, HistorySet, SecuritySelection, SelectOption};
use eod_export::HistoryExporter;
use eod_gateway::{DynGateway, IssClient};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cli::{Command, OutputFormat};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Main application.
pub struct Application {
    config: AppConfig,
    controller: ControllerHandle,
    controller_task: JoinHandle<()>,
    exporter: HistoryExporter,
}

#[derive(Serialize)]
struct DescriptionView<'a> {
    symbol: &'a str,
    description: &'a str,
    boards: &'a [SelectOption],
}

#[derive(Serialize)]
struct HistoryView<'a> {
    symbol: &'a str,
    history: &'a HistorySet,
    exported_to: Option<&'a PathBuf>,
}

impl Application {
    /// Create an application talking to the ISS REST API.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let gateway: DynGateway = Arc::new(IssClient::new(&config.iss)?);
        Self::with_gateway(config, gateway)
    }

    /// Create an application over any gateway.
    pub fn with_gateway(config: AppConfig, gateway: DynGateway) -> AppResult<Self> {
        let exporter = HistoryExporter::from_config(&config.export)?;
        let (controller, controller_task) = spawn_controller(gateway, &config.controller);

        Ok(Self {
            config,
            controller,
            controller_task,
            exporter,
        })
    }

    pub fn controller(&self) -> &ControllerHandle {
        &self.controller
    }

    /// Execute one command and return the rendered output.
    pub async fn execute(&self, command: &Command, format: OutputFormat) -> AppResult<String> {
        match command {
            Command::Engines => {
                let snapshot = self.load_engines().await?;
                render_options(&snapshot.engines, format)
            }
            Command::Markets { engine } => {
                let snapshot = self.load_markets(engine).await?;
                render_options(&snapshot.markets, format)
            }
            Command::Securities { engine, market } => {
                let snapshot = self.load_securities(engine, market).await?;
                render_options(&snapshot.securities, format)
            }
            Command::Describe { security } => self.describe(security, format).await,
            Command::History {
                engine,
                market,
                board,
                security,
                no_export,
            } => {
                self.history(engine, market, board.as_deref(), security, !no_export, format)
                    .await
            }
        }
    }

    /// Stop the controller.
    pub async fn shutdown(self) {
        self.controller.shutdown().await;
        if let Err(e) = self.controller_task.await {
            warn!(error = %e, "Controller task ended abnormally");
        }
    }

    // === Selection cascade ===

    async fn load_engines(&self) -> AppResult<Arc<ControllerSnapshot>> {
        let count = self.controller.initialize().await?;
        info!(count, "Engines loaded");
        Ok(self.controller.snapshot())
    }

    async fn load_markets(&self, engine: &str) -> AppResult<Arc<ControllerSnapshot>> {
        self.load_engines().await?;

        let mut events = self.controller.events();
        self.controller.select_engine(engine).await?;
        await_load(&mut events, LoadKind::Markets).await?;
        Ok(self.controller.snapshot())
    }

    async fn load_securities(
        &self,
        engine: &str,
        market: &str,
    ) -> AppResult<Arc<ControllerSnapshot>> {
        self.load_markets(engine).await?;

        let mut events = self.controller.events();
        self.controller.select_market(market).await?;
        await_load(&mut events, LoadKind::Securities).await?;
        Ok(self.controller.snapshot())
    }

    /// Select a typed security and wait for its description.
    async fn select_security(&self, text: &str) -> AppResult<String> {
        let symbol = canonical_symbol(text)
            .map(str::to_string)
            .ok_or_else(|| ControllerError::Validation("empty security query".to_string()))?;

        let mut events = self.controller.events();
        self.controller
            .select_security(SecuritySelection::FreeText(text.to_string()))
            .await?;
        await_load(&mut events, LoadKind::Description).await?;
        Ok(symbol)
    }

    async fn describe(&self, text: &str, format: OutputFormat) -> AppResult<String> {
        let symbol = self.select_security(text).await?;
        let snapshot = self.controller.snapshot();

        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&DescriptionView {
                symbol: &symbol,
                description: &snapshot.description.text,
                boards: snapshot.boards(),
            })?),
            OutputFormat::Text => {
                let mut out = snapshot.description.text.clone();
                out.push_str("\n\nBoards:\n");
                out.push_str(&render_options(snapshot.boards(), OutputFormat::Text)?);
                Ok(out)
            }
        }
    }

    async fn history(
        &self,
        engine: &str,
        market: &str,
        board: Option<&str>,
        text: &str,
        export: bool,
        format: OutputFormat,
    ) -> AppResult<String> {
        self.load_securities(engine, market).await?;

        let symbol = match self.select_security(text).await {
            Ok(symbol) => symbol,
            // Description is optional for history.
            Err(AppError::Controller(ControllerError::LoadFailed { message, .. })) => {
                warn!(error = %message, "Security description unavailable");
                canonical_symbol(text).unwrap_or_default().to_string()
            }
            Err(e) => return Err(e),
        };

        if let Some(board) = board {
            self.controller.select_board(board).await?;
        }

        let count = self.controller.fetch_history().await?;
        let snapshot = self.controller.snapshot();
        info!(symbol = %symbol, points = count, "History fetched");

        let exported_to = if export && self.config.export.auto_export {
            self.exporter.export(&symbol, &snapshot.history)?
        } else {
            None
        };

        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&HistoryView {
                symbol: &symbol,
                history: &snapshot.history,
                exported_to: exported_to.as_ref(),
            })?),
            OutputFormat::Text => {
                let mut out = String::new();
                for point in &snapshot.history {
                    let _ = writeln!(out, "{}\t{}\t{}", point.date, point.board_code, point.value);
                }
                match &exported_to {
                    Some(path) => {
                        let _ = write!(out, "Exported {count} rows to {}", path.display());
                    }
                    None => {
                        let _ = write!(out, "{count} rows");
                    }
                }
                Ok(out)
            }
        }
    }
}

fn render_options(options: &[SelectOption], format: OutputFormat) -> AppResult<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(options)?),
        OutputFormat::Text => Ok(options
            .iter()
            .map(|o| format!("{}\t{}", o.code, o.display_name))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_options_text() {
        let options = vec![
            SelectOption::new("Фондовый рынок", "stock"),
            SelectOption::new("Валютный рынок", "currency"),
        ];
        assert_eq!(
            render_options(&options, OutputFormat::Text).unwrap(),
            "stock\tФондовый рынок\ncurrency\tВалютный рынок"
        );
    }

    #[test]
    fn test_render_options_json() {
        let options = vec![SelectOption::new("Shares", "shares")];
        let json = render_options(&options, OutputFormat::Json).unwrap();
        assert!(json.contains("\"code\": \"shares\""));
    }
}
