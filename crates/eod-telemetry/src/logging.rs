//! Subscriber setup.

use crate::error::{TelemetryError, TelemetryResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable selecting JSON output when set to `production`.
pub const ENV_VAR: &str = "RUST_ENV";

fn filter(default_level: &str) -> TelemetryResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(default_level).map_err(|e| TelemetryError::Filter {
        filter: default_level.to_string(),
        message: e.to_string(),
    })
}

fn json_output() -> bool {
    matches!(std::env::var(ENV_VAR).as_deref(), Ok("production"))
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `default_level`. Everything goes to stderr; stdout
/// carries command output only.
pub fn init_logging(default_level: &str) -> TelemetryResult<()> {
    let registry = tracing_subscriber::registry().with(filter(default_level)?);

    let installed = if json_output() {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()
    };

    installed.map_err(|e| TelemetryError::Subscriber(e.to_string()))
}
