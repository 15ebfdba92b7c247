//! Selection hierarchy controller actor.
//!
//! Provides a single-consumer actor that exclusively owns:
//! - The four-level selection (engine -> market -> security -> board)
//! - The engine, market and security option lists
//! - The security description (with its board options) and the history
//!
//! # Actor vs Handle
//!
//! `ControllerTask` processes commands sequentially. Gateway calls never run
//! on the actor: they are spawned, and their results are queued back as
//! messages carrying a [`FetchToken`]. A result is applied only while its
//! token is current, so a late answer for a superseded selection cannot
//! overwrite newer state.
//!
//! `ControllerHandle` is cheap to clone. Readers get immutable snapshots
//! through a `watch` channel and fetch outcomes through a `broadcast`
//! channel of [`ControllerEvent`]s.
//!
//! # Command completion
//!
//! - `select_*` return once the clearing step is published; the fetch they
//!   start reports through events and `last_error`.
//! - `initialize`, `refresh_all` and `fetch_history` return the outcome of
//!   their fetch.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use eod_core::{
    dedup_options, options_from_rows, value_history, HistorySet, OptionColumns, Row,
    SecurityDescription, SecuritySelection, SelectOption,
};
use eod_gateway::{DynGateway, GatewayOperation, GatewayResult, HistoryQuery, SecurityDefinition};
use eod_telemetry::Metrics;

use crate::config::ControllerConfig;
use crate::epoch::{Epochs, FetchToken, Scope};
use crate::error::{ControllerError, ControllerResult};
use crate::event::{ControllerEvent, LoadKind};
use crate::snapshot::ControllerSnapshot;

type Reply<T> = oneshot::Sender<ControllerResult<T>>;
type Ack = oneshot::Sender<()>;
type OptionSlot = fn(&mut ControllerSnapshot) -> &mut Vec<SelectOption>;

// ============================================================================
// ControllerMsg
// ============================================================================

/// Messages for the controller actor.
pub(crate) enum ControllerMsg {
    /// Reset everything and load engines (`refresh` only changes logging).
    Initialize { refresh: bool, reply: Reply<usize> },
    SelectEngine { code: String, ack: Ack },
    SelectMarket { code: String, ack: Ack },
    SelectSecurity { selection: SecuritySelection, ack: Ack },
    SelectBoard { code: String, ack: Ack },
    FetchHistory { reply: Reply<usize> },

    // Fetch results, applied only while `token` is current.
    EnginesFetched {
        token: FetchToken,
        result: GatewayResult<Vec<Row>>,
        reply: Reply<usize>,
    },
    MarketsFetched {
        token: FetchToken,
        result: GatewayResult<Vec<Row>>,
    },
    SecuritiesFetched {
        token: FetchToken,
        result: GatewayResult<Vec<Row>>,
    },
    DefinitionFetched {
        token: FetchToken,
        symbol: String,
        result: GatewayResult<SecurityDefinition>,
    },
    HistoryFetched {
        token: FetchToken,
        query: HistoryQuery,
        result: GatewayResult<Vec<Row>>,
        reply: Reply<usize>,
    },

    Shutdown,
}

// ============================================================================
// ControllerTask
// ============================================================================

/// Controller actor task.
pub struct ControllerTask {
    rx: mpsc::Receiver<ControllerMsg>,
    /// Weak so that dropping every handle closes the queue.
    tx: mpsc::WeakSender<ControllerMsg>,
    gateway: DynGateway,
    state: ControllerSnapshot,
    epochs: Epochs,
    snapshot_tx: watch::Sender<Arc<ControllerSnapshot>>,
    events_tx: broadcast::Sender<ControllerEvent>,
}

impl ControllerTask {
    /// Run the controller until `Shutdown` or until every handle is dropped.
    pub async fn run(mut self) {
        debug!("ControllerTask started");

        while let Some(msg) = self.rx.recv().await {
            match msg {
                ControllerMsg::Shutdown => {
                    debug!("ControllerTask shutting down");
                    break;
                }
                msg => self.handle_message(msg),
            }
        }

        debug!("ControllerTask terminated");
    }

    fn handle_message(&mut self, msg: ControllerMsg) {
        match msg {
            ControllerMsg::Initialize { refresh, reply } => self.on_initialize(refresh, reply),
            ControllerMsg::SelectEngine { code, ack } => {
                self.on_select_engine(code);
                let _ = ack.send(());
            }
            ControllerMsg::SelectMarket { code, ack } => {
                self.on_select_market(code);
                let _ = ack.send(());
            }
            ControllerMsg::SelectSecurity { selection, ack } => {
                self.on_select_security(selection);
                let _ = ack.send(());
            }
            ControllerMsg::SelectBoard { code, ack } => {
                self.on_select_board(code);
                let _ = ack.send(());
            }
            ControllerMsg::FetchHistory { reply } => self.on_fetch_history(reply),
            ControllerMsg::EnginesFetched {
                token,
                result,
                reply,
            } => {
                let outcome = self.apply_options(
                    LoadKind::Engines,
                    token,
                    result,
                    OptionColumns::ENGINES,
                    |s| &mut s.engines,
                );
                let _ = reply.send(outcome);
            }
            ControllerMsg::MarketsFetched { token, result } => {
                let _ = self.apply_options(
                    LoadKind::Markets,
                    token,
                    result,
                    OptionColumns::MARKETS,
                    |s| &mut s.markets,
                );
            }
            ControllerMsg::SecuritiesFetched { token, result } => {
                let _ = self.apply_options(
                    LoadKind::Securities,
                    token,
                    result,
                    OptionColumns::SECURITIES,
                    |s| &mut s.securities,
                );
            }
            ControllerMsg::DefinitionFetched {
                token,
                symbol,
                result,
            } => self.apply_definition(token, &symbol, result),
            ControllerMsg::HistoryFetched {
                token,
                query,
                result,
                reply,
            } => {
                let outcome = self.apply_history(token, &query, result);
                let _ = reply.send(outcome);
            }
            ControllerMsg::Shutdown => debug!("Shutdown is handled by run()"),
        }
    }

    // === Commands ===

    fn on_initialize(&mut self, refresh: bool, reply: Reply<usize>) {
        info!(refresh, "Resetting selection and loading engines");

        self.state = ControllerSnapshot::default();
        let token = self.epochs.advance(Scope::Root);
        self.publish();

        self.dispatch(
            GatewayOperation::Engines,
            |gateway| async move { gateway.list_engines().await },
            move |result| ControllerMsg::EnginesFetched {
                token,
                result,
                reply,
            },
        );
    }

    fn on_select_engine(&mut self, code: String) {
        info!(engine = %code, "Engine selected");

        self.state.selection.set_engine(code.clone());
        self.state.clear_markets();
        self.state.last_error = None;
        let token = self.epochs.advance(Scope::Engine);
        self.publish();

        self.dispatch(
            GatewayOperation::Markets,
            move |gateway| async move { gateway.list_markets(&code).await },
            move |result| ControllerMsg::MarketsFetched { token, result },
        );
    }

    fn on_select_market(&mut self, code: String) {
        let Some(engine) = self.state.selection.engine.clone() else {
            let error = ControllerError::Validation(format!(
                "market '{code}' selected without an engine"
            ));
            self.reject(&error);
            return;
        };

        info!(engine = %engine, market = %code, "Market selected");

        self.state.selection.set_market(code.clone());
        self.state.clear_securities();
        self.state.last_error = None;
        let token = self.epochs.advance(Scope::Market);
        self.publish();

        self.dispatch(
            GatewayOperation::Securities,
            move |gateway| async move { gateway.list_securities(&engine, &code).await },
            move |result| ControllerMsg::SecuritiesFetched { token, result },
        );
    }

    fn on_select_security(&mut self, selection: SecuritySelection) {
        info!(security = ?selection, "Security selected");

        self.state.selection.set_security(selection);
        self.state.clear_security_details();
        self.state.last_error = None;
        let token = self.epochs.advance(Scope::Security);
        self.publish();

        let Some(symbol) = self.state.selection.symbol().map(str::to_string) else {
            debug!("Blank security query, description left empty");
            return;
        };

        let request = symbol.clone();
        self.dispatch(
            GatewayOperation::Definition,
            move |gateway| async move { gateway.security_definition(&request).await },
            move |result| ControllerMsg::DefinitionFetched {
                token,
                symbol,
                result,
            },
        );
    }

    fn on_select_board(&mut self, code: String) {
        info!(board = %code, "Board selected");

        self.state.selection.set_board(code);
        self.state.last_error = None;
        // Pending history was requested for the previous board.
        self.epochs.advance(Scope::History);
        self.publish();
    }

    fn on_fetch_history(&mut self, reply: Reply<usize>) {
        let query = match self.history_query() {
            Ok(query) => query,
            Err(e) => {
                self.reject(&e);
                let _ = reply.send(Err(e));
                return;
            }
        };

        info!(query = %query.key(), "Fetching history");

        self.state.last_error = None;
        let token = self.epochs.advance(Scope::History);
        self.publish();

        let request = query.clone();
        self.dispatch(
            GatewayOperation::History,
            move |gateway| async move { gateway.history(&request).await },
            move |result| ControllerMsg::HistoryFetched {
                token,
                query,
                result,
                reply,
            },
        );
    }

    /// Resolve the history request from the current selection.
    fn history_query(&self) -> ControllerResult<HistoryQuery> {
        let selection = &self.state.selection;
        let engine = selection
            .engine
            .clone()
            .ok_or_else(|| ControllerError::Validation("no engine selected".to_string()))?;
        let market = selection
            .market
            .clone()
            .ok_or_else(|| ControllerError::Validation("no market selected".to_string()))?;
        let symbol = selection
            .symbol()
            .map(str::to_string)
            .ok_or_else(|| ControllerError::Validation("no security selected".to_string()))?;

        Ok(HistoryQuery {
            engine,
            market,
            board: selection.board.clone(),
            symbol,
        })
    }

    // === Result application ===

    fn apply_options(
        &mut self,
        kind: LoadKind,
        token: FetchToken,
        result: GatewayResult<Vec<Row>>,
        columns: OptionColumns,
        slot: OptionSlot,
    ) -> ControllerResult<usize> {
        if !self.epochs.is_current(token) {
            self.discard(kind);
            return Err(ControllerError::Superseded);
        }

        match result {
            Ok(rows) => {
                let options = dedup_options(options_from_rows(&rows, columns));
                let count = options.len();
                *slot(&mut self.state) = options;
                self.publish();

                info!(kind = %kind, rows = rows.len(), count, "Options loaded");
                self.emit(ControllerEvent::Loaded { kind, count });
                Ok(count)
            }
            Err(e) => {
                slot(&mut self.state).clear();
                self.fail(kind, e.to_string(), true);
                Err(e.into())
            }
        }
    }

    fn apply_definition(
        &mut self,
        token: FetchToken,
        symbol: &str,
        result: GatewayResult<SecurityDefinition>,
    ) {
        let kind = LoadKind::Description;
        if !self.epochs.is_current(token) {
            self.discard(kind);
            return;
        }

        match result {
            Ok(definition) => {
                let description =
                    SecurityDescription::from_tables(&definition.description, &definition.boards);
                let count = description.boards.len();
                self.state.description = description;
                self.publish();

                info!(symbol, boards = count, "Security description loaded");
                self.emit(ControllerEvent::Loaded { kind, count });
            }
            Err(e) => {
                // Soft failure: only the description panel is lost.
                self.state.description = SecurityDescription::default();
                self.fail(kind, e.to_string(), false);
            }
        }
    }

    fn apply_history(
        &mut self,
        token: FetchToken,
        query: &HistoryQuery,
        result: GatewayResult<Vec<Row>>,
    ) -> ControllerResult<usize> {
        let kind = LoadKind::History;
        if !self.epochs.is_current(token) {
            self.discard(kind);
            return Err(ControllerError::Superseded);
        }

        let valued = result
            .map_err(ControllerError::from)
            .and_then(|rows| value_history(&rows, &query.market).map_err(ControllerError::from));

        match valued {
            Ok(history) => {
                let count = history.len();
                Metrics::history_points(count);
                self.state.history = history;
                self.publish();

                info!(query = %query.key(), points = count, "History loaded");
                self.emit(ControllerEvent::Loaded { kind, count });
                Ok(count)
            }
            Err(e) => {
                self.state.history = HistorySet::empty();
                self.fail(kind, e.to_string(), true);
                Err(e)
            }
        }
    }

    // === Helpers ===

    /// Run a gateway call off the actor and queue its result back.
    fn dispatch<T, F, Fut, M>(&self, operation: GatewayOperation, call: F, into_msg: M)
    where
        T: Send + 'static,
        F: FnOnce(DynGateway) -> Fut + Send + 'static,
        Fut: Future<Output = GatewayResult<T>> + Send + 'static,
        M: FnOnce(GatewayResult<T>) -> ControllerMsg + Send + 'static,
    {
        let Some(tx) = self.tx.upgrade() else {
            debug!(%operation, "No handles left, fetch skipped");
            return;
        };
        let gateway = Arc::clone(&self.gateway);

        debug!(%operation, "Dispatching fetch");
        tokio::spawn(async move {
            let started = Instant::now();
            let result = call(gateway).await;
            Metrics::gateway_request(
                operation.as_str(),
                result.is_ok(),
                started.elapsed().as_secs_f64() * 1000.0,
            );

            if tx.send(into_msg(result)).await.is_err() {
                debug!(%operation, "Controller closed before result was applied");
            }
        });
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(Arc::new(self.state.clone()));
    }

    fn emit(&self, event: ControllerEvent) {
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }

    fn discard(&self, kind: LoadKind) {
        warn!(kind = %kind, "Discarding stale result");
        Metrics::stale_result(kind.as_str());
        self.emit(ControllerEvent::Discarded { kind });
    }

    fn fail(&mut self, kind: LoadKind, message: String, visible: bool) {
        warn!(kind = %kind, error = %message, "Load failed");
        if visible {
            self.state.last_error = Some(format!("{kind}: {message}"));
        }
        self.publish();
        self.emit(ControllerEvent::Failed { kind, message });
    }

    fn reject(&mut self, error: &ControllerError) {
        warn!(error = %error, "Command rejected");
        self.state.last_error = Some(error.to_string());
        self.publish();
    }
}

// ============================================================================
// ControllerHandle
// ============================================================================

/// Handle for interacting with the controller actor.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<ControllerMsg>,
    snapshot_rx: watch::Receiver<Arc<ControllerSnapshot>>,
    events_tx: broadcast::Sender<ControllerEvent>,
}

impl ControllerHandle {
    async fn send(&self, msg: ControllerMsg) -> ControllerResult<()> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| ControllerError::Closed)
    }

    /// Send a command and wait for its clearing step.
    async fn command(&self, build: impl FnOnce(Ack) -> ControllerMsg) -> ControllerResult<()> {
        let (ack, done) = oneshot::channel();
        self.send(build(ack)).await?;
        done.await.map_err(|_| ControllerError::Closed)
    }

    /// Send a request and wait for its fetch outcome.
    async fn request(
        &self,
        build: impl FnOnce(Reply<usize>) -> ControllerMsg,
    ) -> ControllerResult<usize> {
        let (reply, outcome) = oneshot::channel();
        self.send(build(reply)).await?;
        outcome.await.map_err(|_| ControllerError::Closed)?
    }

    /// Clear every selection and list, then load engines.
    ///
    /// Returns the number of engine options; on failure the engine list
    /// stays empty.
    pub async fn initialize(&self) -> ControllerResult<usize> {
        self.request(|reply| ControllerMsg::Initialize {
            refresh: false,
            reply,
        })
        .await
    }

    /// Reset all four levels and initialize again.
    pub async fn refresh_all(&self) -> ControllerResult<usize> {
        self.request(|reply| ControllerMsg::Initialize {
            refresh: true,
            reply,
        })
        .await
    }

    pub async fn select_engine(&self, code: impl Into<String>) -> ControllerResult<()> {
        let code = code.into();
        self.command(|ack| ControllerMsg::SelectEngine { code, ack })
            .await
    }

    pub async fn select_market(&self, code: impl Into<String>) -> ControllerResult<()> {
        let code = code.into();
        self.command(|ack| ControllerMsg::SelectMarket { code, ack })
            .await
    }

    pub async fn select_security(&self, selection: SecuritySelection) -> ControllerResult<()> {
        self.command(|ack| ControllerMsg::SelectSecurity { selection, ack })
            .await
    }

    pub async fn select_board(&self, code: impl Into<String>) -> ControllerResult<()> {
        let code = code.into();
        self.command(|ack| ControllerMsg::SelectBoard { code, ack })
            .await
    }

    /// Load history for the current selection, replacing the displayed set.
    ///
    /// Fails with `Validation` when engine, market or symbol is missing.
    /// On fetch or valuation failure the history is cleared.
    pub async fn fetch_history(&self) -> ControllerResult<usize> {
        self.request(|reply| ControllerMsg::FetchHistory { reply })
            .await
    }

    /// Current state.
    pub fn snapshot(&self) -> Arc<ControllerSnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// Snapshot stream for change-driven readers.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ControllerSnapshot>> {
        self.snapshot_rx.clone()
    }

    /// Fetch outcome stream.
    pub fn events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events_tx.subscribe()
    }

    /// Stop the actor. In-flight fetch results are dropped.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(ControllerMsg::Shutdown).await;
    }
}

// ============================================================================
// Spawn
// ============================================================================

/// Spawn the controller actor.
pub fn spawn_controller(
    gateway: DynGateway,
    config: &ControllerConfig,
) -> (ControllerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(ControllerSnapshot::default()));
    let (events_tx, _) = broadcast::channel(config.event_capacity.max(1));

    let task = ControllerTask {
        rx,
        tx: tx.downgrade(),
        gateway,
        state: ControllerSnapshot::default(),
        epochs: Epochs::new(),
        snapshot_tx,
        events_tx: events_tx.clone(),
    };

    let handle = ControllerHandle {
        tx,
        snapshot_rx,
        events_tx,
    };

    let join_handle = tokio::spawn(task.run());

    (handle, join_handle)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use eod_gateway::MockGateway;

    fn engine_row(name: &str) -> Row {
        Row::from_pairs([("name", Some(name)), ("title", Some(name))])
    }

    #[tokio::test]
    async fn test_initialize_loads_engines() {
        let gateway = Arc::new(MockGateway::new());
        gateway.with_engines(vec![engine_row("stock"), engine_row("currency")]);

        let (handle, _join) = spawn_controller(gateway, &ControllerConfig::default());

        assert_eq!(handle.initialize().await.unwrap(), 2);
        assert_eq!(handle.snapshot().engines.len(), 2);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_initialize_failure_leaves_engines_empty() {
        let gateway = Arc::new(MockGateway::new());
        gateway.fail(GatewayOperation::Engines, "", "connection refused");

        let (handle, _join) = spawn_controller(gateway, &ControllerConfig::default());

        let err = handle.initialize().await.unwrap_err();
        assert!(matches!(err, ControllerError::Gateway(_)));

        let snapshot = handle.snapshot();
        assert!(snapshot.engines.is_empty());
        assert!(snapshot
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("connection refused")));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_select_market_without_engine_is_rejected() {
        let gateway = Arc::new(MockGateway::new());
        let (handle, _join) = spawn_controller(gateway.clone(), &ControllerConfig::default());

        handle.select_market("shares").await.unwrap();

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.selection.market, None);
        assert!(snapshot.last_error.is_some());
        assert!(gateway.calls().is_empty());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_handle() {
        let gateway = Arc::new(MockGateway::new());
        let (handle, join) = spawn_controller(gateway, &ControllerConfig::default());

        handle.shutdown().await;
        join.await.unwrap();

        assert!(matches!(
            handle.select_engine("stock").await,
            Err(ControllerError::Closed)
        ));
    }
}
