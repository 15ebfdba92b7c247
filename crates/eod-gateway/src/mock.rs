//! In-process gateway with canned responses.
//!
//! Used by controller tests and offline runs. Individual calls can be made
//! to fail or be held until released, which makes out-of-order completion
//! reproducible.

use std::collections::HashMap;
use std::sync::Arc;

use eod_core::Row;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{BoxFuture, GatewayOperation, HistoryQuery, MarketDataGateway, SecurityDefinition};

type CallKey = (GatewayOperation, String);

/// Gateway backed by in-memory tables.
///
/// Call keys: `""` for engines, the engine for markets, `"engine/market"`
/// for securities, the symbol for definitions and [`HistoryQuery::key`]
/// for history. A call without a canned response fails with HTTP 404.
#[derive(Default)]
pub struct MockGateway {
    rows: Mutex<HashMap<CallKey, Vec<Row>>>,
    definitions: Mutex<HashMap<String, SecurityDefinition>>,
    failures: Mutex<HashMap<CallKey, String>>,
    gates: Mutex<HashMap<CallKey, Arc<Semaphore>>>,
    calls: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engines(&self, rows: Vec<Row>) -> &Self {
        self.rows
            .lock()
            .insert((GatewayOperation::Engines, String::new()), rows);
        self
    }

    pub fn with_markets(&self, engine: &str, rows: Vec<Row>) -> &Self {
        self.rows
            .lock()
            .insert((GatewayOperation::Markets, engine.to_string()), rows);
        self
    }

    pub fn with_securities(&self, engine: &str, market: &str, rows: Vec<Row>) -> &Self {
        self.rows.lock().insert(
            (GatewayOperation::Securities, format!("{engine}/{market}")),
            rows,
        );
        self
    }

    pub fn with_definition(&self, symbol: &str, definition: SecurityDefinition) -> &Self {
        self.definitions
            .lock()
            .insert(symbol.to_string(), definition);
        self
    }

    pub fn with_history(&self, query: &HistoryQuery, rows: Vec<Row>) -> &Self {
        self.rows
            .lock()
            .insert((GatewayOperation::History, query.key()), rows);
        self
    }

    /// Make calls for `(operation, key)` fail with `message`.
    pub fn fail(&self, operation: GatewayOperation, key: &str, message: &str) -> &Self {
        self.failures
            .lock()
            .insert((operation, key.to_string()), message.to_string());
        self
    }

    /// Undo [`MockGateway::fail`].
    pub fn recover(&self, operation: GatewayOperation, key: &str) -> &Self {
        self.failures.lock().remove(&(operation, key.to_string()));
        self
    }

    /// Hold calls for `(operation, key)` until [`MockGateway::release`].
    pub fn hold(&self, operation: GatewayOperation, key: &str) -> &Self {
        self.gates
            .lock()
            .insert((operation, key.to_string()), Arc::new(Semaphore::new(0)));
        self
    }

    /// Let held calls for `(operation, key)` complete.
    pub fn release(&self, operation: GatewayOperation, key: &str) {
        if let Some(gate) = self.gates.lock().remove(&(operation, key.to_string())) {
            gate.close();
        }
    }

    /// Calls received so far, e.g. `["engines", "markets:stock"]`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, operation: GatewayOperation) -> usize {
        let prefix = operation.as_str();
        self.calls
            .lock()
            .iter()
            .filter(|c| c.split(':').next() == Some(prefix))
            .count()
    }

    async fn enter(&self, operation: GatewayOperation, key: &str) -> GatewayResult<()> {
        let label = if key.is_empty() {
            operation.to_string()
        } else {
            format!("{operation}:{key}")
        };
        debug!(call = %label, "Mock gateway call");
        self.calls.lock().push(label);

        let call_key = (operation, key.to_string());
        let gate = self.gates.lock().get(&call_key).cloned();
        if let Some(gate) = gate {
            // Closing the semaphore is the release signal.
            let _ = gate.acquire().await;
        }

        let failure = self.failures.lock().get(&call_key).cloned();
        match failure {
            Some(message) => Err(GatewayError::HttpClient(message)),
            None => Ok(()),
        }
    }

    fn not_found(operation: GatewayOperation, key: &str) -> GatewayError {
        GatewayError::Status {
            status: 404,
            body: format!("no canned {operation} response for '{key}'"),
        }
    }

    async fn respond_rows(&self, operation: GatewayOperation, key: String) -> GatewayResult<Vec<Row>> {
        self.enter(operation, &key).await?;
        let rows = self.rows.lock().get(&(operation, key.clone())).cloned();
        rows.ok_or_else(|| Self::not_found(operation, &key))
    }

    async fn respond_definition(&self, symbol: &str) -> GatewayResult<SecurityDefinition> {
        self.enter(GatewayOperation::Definition, symbol).await?;
        let definition = self.definitions.lock().get(symbol).cloned();
        definition.ok_or_else(|| Self::not_found(GatewayOperation::Definition, symbol))
    }
}

impl MarketDataGateway for MockGateway {
    fn list_engines(&self) -> BoxFuture<'_, GatewayResult<Vec<Row>>> {
        Box::pin(self.respond_rows(GatewayOperation::Engines, String::new()))
    }

    fn list_markets<'a>(&'a self, engine: &'a str) -> BoxFuture<'a, GatewayResult<Vec<Row>>> {
        Box::pin(self.respond_rows(GatewayOperation::Markets, engine.to_string()))
    }

    fn list_securities<'a>(
        &'a self,
        engine: &'a str,
        market: &'a str,
    ) -> BoxFuture<'a, GatewayResult<Vec<Row>>> {
        Box::pin(self.respond_rows(GatewayOperation::Securities, format!("{engine}/{market}")))
    }

    fn security_definition<'a>(
        &'a self,
        symbol: &'a str,
    ) -> BoxFuture<'a, GatewayResult<SecurityDefinition>> {
        Box::pin(self.respond_definition(symbol))
    }

    fn history<'a>(&'a self, query: &'a HistoryQuery) -> BoxFuture<'a, GatewayResult<Vec<Row>>> {
        Box::pin(self.respond_rows(GatewayOperation::History, query.key()))
    }
}
