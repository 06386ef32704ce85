//! Driven ports (outbound dependencies) of the deployment workflow.

use crate::domain::transaction::{LedgerOutput, Transaction};
use async_trait::async_trait;
use shared_types::{Address, ChainId, ChainRecord, CommitteeRecord, RequestId};

/// Underlying ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Confirmed unspent outputs owned by `address`.
    async fn get_confirmed_outputs(&self, address: &Address) -> Result<Vec<LedgerOutput>, String>;

    /// Submit `tx` and return once it is confirmed.
    async fn submit_and_wait_for_confirmation(&self, tx: &Transaction) -> Result<(), String>;
}

/// Registry/API of one committee node, addressed by endpoint.
#[async_trait]
pub trait NodeApiClient: Send + Sync {
    async fn put_committee_record(
        &self,
        endpoint: &str,
        record: &CommitteeRecord,
    ) -> Result<(), String>;

    async fn put_chain_record(&self, endpoint: &str, record: &ChainRecord) -> Result<(), String>;

    async fn activate_chain(&self, endpoint: &str, chain_id: &ChainId) -> Result<(), String>;

    async fn is_request_processed(
        &self,
        endpoint: &str,
        chain_id: &ChainId,
        request_id: &RequestId,
    ) -> Result<bool, String>;
}

/// Time source for transaction timestamps.
pub trait TimeSource: Send + Sync {
    /// Current unix time in nanoseconds.
    fn now_nanos(&self) -> i64;
}

/// Default time source using system time.
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_nanos(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or_default()
    }
}
