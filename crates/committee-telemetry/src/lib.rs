//! # Committee Telemetry
//!
//! Logging and metrics export shared by committee node binaries and tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use committee_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging(&TelemetryConfig::from_env())?;
//!     // Every crate logs through `tracing` from here on.
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CC_SERVICE_NAME` | `committee-chain` | Service name in the startup line |
//! | `CC_LOG_LEVEL` / `RUST_LOG` | `info` | Filter directives |
//! | `CC_JSON_LOGS` | `false` | JSON output |

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};
pub use metrics::encode_metrics;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install log subscriber: {0}")]
    LoggingInit(String),

    #[error("Failed to encode metrics: {0}")]
    Metrics(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
