//! Helpers shared by the integration scenarios.

use committee_telemetry::{init_logging, TelemetryConfig};
use std::sync::Once;

/// Route `tracing` output of the crates under test to the test harness.
///
/// Quiet by default; set `CC_LOG_LEVEL=debug` to follow a failing scenario.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let mut config = TelemetryConfig::for_component("tests");
        if std::env::var("CC_LOG_LEVEL").is_err() {
            config.log_level = "warn".to_string();
        }
        // Another harness may have installed a subscriber already.
        let _ = init_logging(&config);
    });
}

/// Lowercase hex, the external form of ids and addresses.
pub fn hex_of(bytes: &[u8]) -> String {
    hex::encode(bytes)
}
