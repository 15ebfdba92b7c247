//! HTTP client for the MOEX ISS REST API.
//!
//! Endpoints used:
//! - `engines.json`
//! - `engines/{engine}/markets.json`
//! - `engines/{engine}/markets/{market}/securities.json`
//! - `securities/{symbol}.json` (tables `description` and `boards`)
//! - `history/engines/{engine}/markets/{market}[/boards/{board}]/securities/{symbol}.json`

use crate::config::IssConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{BoxFuture, HistoryQuery, MarketDataGateway, SecurityDefinition};
use crate::table::{extract_table, HistoryCursor};
use eod_core::Row;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Client for the ISS REST API.
pub struct IssClient {
    /// HTTP client.
    client: Client,
    /// ISS root, e.g. "https://iss.moex.com/iss".
    base_url: Url,
    /// Response language.
    lang: String,
    /// Upper bound of history pages per request.
    max_history_pages: u32,
}

impl IssClient {
    /// Create a new ISS client.
    pub fn new(config: &IssConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| GatewayError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| GatewayError::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        Ok(Self {
            client,
            base_url,
            lang: config.lang.clone(),
            max_history_pages: config.max_history_pages.max(1),
        })
    }

    /// Append path segments to the ISS root. Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> GatewayResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json(&self, url: Url, extra: &[(&str, String)]) -> GatewayResult<Value> {
        debug!(url = %url, "ISS request");

        let mut params: Vec<(&str, String)> = vec![
            ("iss.meta", "off".to_string()),
            ("lang", self.lang.clone()),
        ];
        params.extend(extra.iter().cloned());

        let response = self
            .client
            .get(url)
            .query(&params)
            .send()
            .await
            .map_err(|e| GatewayError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(format!("Failed to parse response: {e}")))
    }

    /// Fetch the engine list.
    pub async fn fetch_engines(&self) -> GatewayResult<Vec<Row>> {
        let url = self.endpoint(&["engines.json"])?;
        let body = self.get_json(url, &[]).await?;
        let rows = extract_table(&body, "engines")?;
        info!(count = rows.len(), "Fetched engines");
        Ok(rows)
    }

    /// Fetch the markets of an engine.
    pub async fn fetch_markets(&self, engine: &str) -> GatewayResult<Vec<Row>> {
        let url = self.endpoint(&["engines", engine, "markets.json"])?;
        let body = self.get_json(url, &[]).await?;
        let rows = extract_table(&body, "markets")?;
        info!(engine, count = rows.len(), "Fetched markets");
        Ok(rows)
    }

    /// Fetch the securities of a market (one row per security and board).
    pub async fn fetch_securities(&self, engine: &str, market: &str) -> GatewayResult<Vec<Row>> {
        let url = self.endpoint(&["engines", engine, "markets", market, "securities.json"])?;
        let body = self.get_json(url, &[]).await?;
        let rows = extract_table(&body, "securities")?;
        info!(engine, market, count = rows.len(), "Fetched securities");
        Ok(rows)
    }

    /// Fetch a security's description and boards.
    pub async fn fetch_definition(&self, symbol: &str) -> GatewayResult<SecurityDefinition> {
        let file = format!("{symbol}.json");
        let url = self.endpoint(&["securities", &file])?;
        let body = self.get_json(url, &[]).await?;

        let definition = SecurityDefinition {
            description: extract_table(&body, "description")?,
            boards: extract_table(&body, "boards")?,
        };

        info!(
            symbol,
            fields = definition.description.len(),
            boards = definition.boards.len(),
            "Fetched security definition"
        );
        Ok(definition)
    }

    fn history_url(&self, query: &HistoryQuery) -> GatewayResult<Url> {
        let file = format!("{}.json", query.symbol);
        let mut segments = vec![
            "history",
            "engines",
            query.engine.as_str(),
            "markets",
            query.market.as_str(),
        ];
        if let Some(board) = &query.board {
            segments.extend(["boards", board.as_str()]);
        }
        segments.extend(["securities", file.as_str()]);
        self.endpoint(&segments)
    }

    /// Fetch history rows, following the `history.cursor` pages.
    pub async fn fetch_history(&self, query: &HistoryQuery) -> GatewayResult<Vec<Row>> {
        let url = self.history_url(query)?;
        let mut rows = Vec::new();
        let mut start = 0u64;

        for page in 0..self.max_history_pages {
            let body = self.get_json(url.clone(), &[("start", start.to_string())]).await?;
            let page_rows = extract_table(&body, "history")?;
            let page_len = page_rows.len();
            rows.extend(page_rows);

            let next = HistoryCursor::from_body(&body)?.and_then(|c| c.next_start());
            match next {
                Some(next) if page_len > 0 => {
                    if page + 1 == self.max_history_pages {
                        warn!(
                            query = %query.key(),
                            pages = self.max_history_pages,
                            "History truncated at page limit"
                        );
                    }
                    start = next;
                }
                _ => break,
            }
        }

        info!(query = %query.key(), count = rows.len(), "Fetched history");
        Ok(rows)
    }
}

impl MarketDataGateway for IssClient {
    fn list_engines(&self) -> BoxFuture<'_, GatewayResult<Vec<Row>>> {
        Box::pin(self.fetch_engines())
    }

    fn list_markets<'a>(&'a self, engine: &'a str) -> BoxFuture<'a, GatewayResult<Vec<Row>>> {
        Box::pin(self.fetch_markets(engine))
    }

    fn list_securities<'a>(
        &'a self,
        engine: &'a str,
        market: &'a str,
    ) -> BoxFuture<'a, GatewayResult<Vec<Row>>> {
        Box::pin(self.fetch_securities(engine, market))
    }

    fn security_definition<'a>(
        &'a self,
        symbol: &'a str,
    ) -> BoxFuture<'a, GatewayResult<SecurityDefinition>> {
        Box::pin(self.fetch_definition(symbol))
    }

    fn history<'a>(&'a self, query: &'a HistoryQuery) -> BoxFuture<'a, GatewayResult<Vec<Row>>> {
        Box::pin(self.fetch_history(query))
    }
}
