//! Market data gateway trait.
//!
//! Abstracts the provider so the selection controller can be driven by the
//! real ISS client or an in-process mock.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use eod_core::Row;

use crate::error::GatewayResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Gateway operation, used for logging and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOperation {
    Engines,
    Markets,
    Securities,
    Definition,
    History,
}

impl GatewayOperation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Engines => "engines",
            Self::Markets => "markets",
            Self::Securities => "securities",
            Self::Definition => "definition",
            Self::History => "history",
        }
    }
}

impl fmt::Display for GatewayOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Security metadata and the boards it trades on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityDefinition {
    /// Rows with at least `name` and `value` columns.
    pub description: Vec<Row>,
    /// Rows with at least a `boardid` column.
    pub boards: Vec<Row>,
}

/// Parameters of a history request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub engine: String,
    pub market: String,
    /// `None` queries every board the security traded on.
    pub board: Option<String>,
    pub symbol: String,
}

impl HistoryQuery {
    /// Stable key, e.g. `stock/shares/TQBR/SBER` (`*` for no board).
    pub fn key(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.engine,
            self.market,
            self.board.as_deref().unwrap_or("*"),
            self.symbol
        )
    }
}

/// Provider of the exchange taxonomy and end-of-day history.
///
/// Each call is a single attempt; failures are returned, never retried.
pub trait MarketDataGateway: Send + Sync {
    /// List trading engines (table `engines`).
    fn list_engines(&self) -> BoxFuture<'_, GatewayResult<Vec<Row>>>;

    /// List markets of an engine (table `markets`).
    fn list_markets<'a>(&'a self, engine: &'a str) -> BoxFuture<'a, GatewayResult<Vec<Row>>>;

    /// List securities of a market (table `securities`, one row per board).
    fn list_securities<'a>(
        &'a self,
        engine: &'a str,
        market: &'a str,
    ) -> BoxFuture<'a, GatewayResult<Vec<Row>>>;

    /// Fetch a security's description and boards.
    fn security_definition<'a>(
        &'a self,
        symbol: &'a str,
    ) -> BoxFuture<'a, GatewayResult<SecurityDefinition>>;

    /// Fetch end-of-day history rows in provider order.
    fn history<'a>(&'a self, query: &'a HistoryQuery) -> BoxFuture<'a, GatewayResult<Vec<Row>>>;
}

/// Arc wrapper for gateway trait objects.
pub type DynGateway = Arc<dyn MarketDataGateway>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_query_key() {
        let mut query = HistoryQuery {
            engine: "stock".to_string(),
            market: "shares".to_string(),
            board: Some("TQBR".to_string()),
            symbol: "SBER".to_string(),
        };
        assert_eq!(query.key(), "stock/shares/TQBR/SBER");

        query.board = None;
        assert_eq!(query.key(), "stock/shares/*/SBER");
    }

    #[test]
    fn test_operation_labels() {
        assert_eq!(GatewayOperation::Definition.to_string(), "definition");
        assert_eq!(GatewayOperation::History.as_str(), "history");
    }
}
