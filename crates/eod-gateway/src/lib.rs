//! Market data gateway for moex-eod.
//!
//! Lists engines, markets, securities and boards, fetches security
//! definitions and end-of-day history from the MOEX ISS REST API.
//!
//! The controller only sees the [`MarketDataGateway`] trait; [`IssClient`]
//! is the network implementation and [`MockGateway`] an in-process one.

pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod mock;
pub mod table;

pub use client::IssClient;
pub use config::IssConfig;
pub use error::{GatewayError, GatewayResult};
pub use gateway::{
    BoxFuture, DynGateway, GatewayOperation, HistoryQuery, MarketDataGateway, SecurityDefinition,
};
pub use mock::MockGateway;
pub use table::{extract_table, HistoryCursor};
