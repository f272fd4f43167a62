//! Telemetry initialization (tracing-subscriber fmt layer with env filter).
//!
//! Log verbosity is controlled via `RUST_LOG` (e.g. `RUST_LOG=promptforge=debug`),
//! defaulting to `info`. The subscriber is the pluggable sink for all
//! structured activity logging; failures to emit never reach request handlers.

use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with console output.
pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    info!("Telemetry initialized");

    Ok(())
}
