//! Driven port towards a committee node's DKG endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of the share-generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DkSharesPostRequest {
    /// Peering locations of every committee member.
    pub peer_locations: Vec<String>,
    pub threshold: u16,
    pub timeout_ms: u16,
}

/// Answer of a successful DKG run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DkSharesInfo {
    /// Shared address in external (hex) form.
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DkgClientError {
    /// The node gave up waiting for the other peers.
    #[error("DKG timed out on the node")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Node API client, one call per endpoint.
#[async_trait]
pub trait DkgNodeClient: Send + Sync {
    async fn post_dk_shares(
        &self,
        endpoint: &str,
        request: DkSharesPostRequest,
    ) -> Result<DkSharesInfo, DkgClientError>;
}
