//! Structured logging.
//!
//! Installs a global `tracing` subscriber: an `EnvFilter` built from
//! [`TelemetryConfig::log_level`] and a `fmt` layer that writes either
//! human-readable lines or JSON objects with these fields:
//! - `timestamp`
//! - `level`
//! - `target`: emitting module, e.g. `cc_05_batch_consensus::service`
//! - `fields`: message plus the structured fields of the event

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter for `config`. Fails on malformed directives.
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level).map_err(|e| {
        TelemetryError::Config(format!("invalid log filter {:?}: {e}", config.log_level))
    })
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let registry = tracing_subscriber::registry().with(env_filter(config)?);

    let installed = if config.json_logs {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };
    installed.map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}
