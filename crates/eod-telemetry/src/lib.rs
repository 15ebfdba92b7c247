//! Observability for moex-eod: a `tracing` subscriber writing to stderr
//! and a small set of Prometheus counters describing provider traffic,
//! discarded stale fetches and SQL exports.

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
