//! Error types for batch consensus.

use super::BlockLogError;
use shared_types::{OutputId, WireError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsensusError {
    #[error("Quorum not reached for {state_output} within timeout: {shares}/{threshold} shares")]
    QuorumProcessingTimeout {
        state_output: OutputId,
        shares: usize,
        threshold: u16,
    },

    #[error("Batch processing failed: {0}")]
    BatchProcessingFailed(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Share aggregation failed: {0}")]
    AggregationFailed(String),

    #[error("Posting result failed: {0}")]
    PostingFailed(String),

    #[error("Invalid committee: {0}")]
    InvalidCommittee(String),

    #[error("Block log error: {0}")]
    BlockLog(#[from] BlockLogError),

    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    #[error("Consensus service stopped")]
    ServiceStopped,
}

pub type ConsensusResult<T> = Result<T, ConsensusError>;
