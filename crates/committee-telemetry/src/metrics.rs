//! Prometheus text export.
//!
//! Subsystems register their counters in the default registry (see the
//! `metrics` feature of `cc-05-batch-consensus`); this module renders them
//! for a node's scrape endpoint. The integration suite checks the consensus
//! counters through it.

use crate::TelemetryError;
use prometheus::{Encoder, TextEncoder};

/// Encode every metric of the default registry in Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
}
