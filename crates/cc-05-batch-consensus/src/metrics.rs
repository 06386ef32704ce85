//! # Consensus Metrics
//!
//! Prometheus metrics for the round actor.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! cc-05-batch-consensus = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `consensus_rounds_committed_total` - Rounds that produced a block
//! - `consensus_rounds_superseded_total` - Rounds dropped for a newer state output
//! - `consensus_shares_rejected_total` - Peer shares rejected (by reason)
//! - `consensus_quorum_timeouts_total` - Rounds that missed the quorum deadline

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref ROUNDS_COMMITTED: IntCounter = register_int_counter!(
        "consensus_rounds_committed_total",
        "Total number of consensus rounds committed"
    )
    .expect("Failed to create ROUNDS_COMMITTED metric");

    pub static ref ROUNDS_SUPERSEDED: IntCounter = register_int_counter!(
        "consensus_rounds_superseded_total",
        "Total number of rounds replaced by a newer state output"
    )
    .expect("Failed to create ROUNDS_SUPERSEDED metric");

    /// Rejected shares, labeled by rejection reason
    pub static ref SHARES_REJECTED: IntCounterVec = register_int_counter_vec!(
        "consensus_shares_rejected_total",
        "Total number of signature shares rejected",
        &["reason"]
    )
    .expect("Failed to create SHARES_REJECTED metric");

    pub static ref QUORUM_TIMEOUTS: IntCounter = register_int_counter!(
        "consensus_quorum_timeouts_total",
        "Total number of rounds that timed out waiting for quorum"
    )
    .expect("Failed to create QUORUM_TIMEOUTS metric");
}

#[cfg(feature = "metrics")]
pub fn record_round_committed() {
    ROUNDS_COMMITTED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_round_superseded() {
    ROUNDS_SUPERSEDED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_share_rejected(reason: &str) {
    SHARES_REJECTED.with_label_values(&[reason]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_quorum_timeout() {
    QUORUM_TIMEOUTS.inc();
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_round_committed() {}

#[cfg(not(feature = "metrics"))]
pub fn record_round_superseded() {}

#[cfg(not(feature = "metrics"))]
pub fn record_share_rejected(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_quorum_timeout() {}
