//! Driven ports (Outbound dependencies)

use async_trait::async_trait;
use shared_types::{Batch, HashValue, StateUpdate, TransactionId};

/// Result of running a batch against the chain state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Essence of the result transaction; every honest peer computes the same bytes.
    pub essence: Vec<u8>,
    pub state_updates: Vec<StateUpdate>,
}

/// Executes batches. Must be deterministic in `(batch, timestamp)`.
#[async_trait]
pub trait BatchProcessor: Send + Sync {
    async fn process(&self, batch: &Batch, timestamp: i64) -> Result<BatchOutcome, String>;
}

/// This peer's share of the committee's threshold key.
pub trait ThresholdSigner: Send + Sync {
    /// Partial signature over `data`.
    fn sign_share(&self, data: &HashValue) -> Result<Vec<u8>, String>;

    /// Check a partial signature produced by the peer at `signer`.
    fn verify_share(&self, signer: &str, data: &HashValue, share: &[u8]) -> bool;

    /// Combine at least T shares into the committee signature.
    ///
    /// The result does not depend on which T shares are used.
    fn aggregate(&self, data: &HashValue, shares: &[(String, Vec<u8>)]) -> Result<Vec<u8>, String>;
}

/// Posts result transactions to the ledger.
#[async_trait]
pub trait ResultPoster: Send + Sync {
    /// Build the result transaction from `essence` and the committee
    /// `signature`, post it and wait for confirmation.
    ///
    /// Posting the same transaction twice is harmless.
    async fn post_and_confirm(
        &self,
        essence: &[u8],
        signature: &[u8],
    ) -> Result<TransactionId, String>;

    async fn is_confirmed(&self, tx_id: &TransactionId) -> Result<bool, String>;
}
