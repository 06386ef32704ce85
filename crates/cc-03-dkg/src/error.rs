//! DKG error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DkgError {
    #[error("No API endpoints given")]
    NoApiEndpoints,

    #[error("Invalid threshold {threshold} for {peers} peers")]
    InvalidThreshold { threshold: u16, peers: usize },

    #[error("DKG did not complete within {timeout_ms} ms")]
    DkgTimeout { timeout_ms: u64 },

    #[error("DKG request to {endpoint} failed: {reason}")]
    DkgCommunicationFailure { endpoint: String, reason: String },

    #[error("Invalid address from DKG at {endpoint}: {reason}")]
    InvalidDkgResult { endpoint: String, reason: String },
}

pub type DkgResult<T> = Result<T, DkgError>;
