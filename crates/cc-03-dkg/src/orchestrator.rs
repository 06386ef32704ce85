//! # DKG Orchestrator
//!
//! One DKG run per call, no retries. The initiator is drawn from an injected
//! RNG so tests can pin the choice.

use crate::error::{DkgError, DkgResult};
use crate::ports::{DkSharesPostRequest, DkgClientError, DkgNodeClient};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use shared_types::{Address, AddressKind};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Node-side DKG timeout when the caller gives none.
pub const DEFAULT_DKG_TIMEOUT_MS: u16 = 60_000;

/// Extra local wait on top of the node-side timeout, covering the round trip.
const RESPONSE_GRACE: Duration = Duration::from_secs(5);

/// Node-side timeout for a caller-supplied value.
///
/// The value travels as `u16` milliseconds; anything that does not fit below
/// `u16::MAX` falls back to the default.
pub fn effective_timeout_ms(timeout: Option<Duration>) -> u16 {
    match timeout {
        Some(t) if t.as_millis() < u128::from(u16::MAX) => t.as_millis() as u16,
        _ => DEFAULT_DKG_TIMEOUT_MS,
    }
}

pub struct DkgOrchestrator {
    client: Arc<dyn DkgNodeClient>,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl DkgOrchestrator {
    pub fn new(client: Arc<dyn DkgNodeClient>) -> Self {
        Self::with_rng(client, Box::new(StdRng::from_entropy()))
    }

    /// Use `rng` for initiator selection.
    pub fn with_rng(client: Arc<dyn DkgNodeClient>, rng: Box<dyn RngCore + Send>) -> Self {
        Self {
            client,
            rng: Mutex::new(rng),
        }
    }

    /// Run DKG across `peer_locations`, initiated on one of `api_endpoints`.
    ///
    /// Returns the shared control address.
    pub async fn run_dkg(
        &self,
        api_endpoints: &[String],
        peer_locations: &[String],
        threshold: u16,
        timeout: Option<Duration>,
    ) -> DkgResult<Address> {
        if api_endpoints.is_empty() {
            return Err(DkgError::NoApiEndpoints);
        }
        if threshold == 0 || usize::from(threshold) > peer_locations.len() {
            return Err(DkgError::InvalidThreshold {
                threshold,
                peers: peer_locations.len(),
            });
        }

        let timeout_ms = effective_timeout_ms(timeout);
        let initiator = self.rng.lock().gen_range(0..api_endpoints.len());
        let endpoint = &api_endpoints[initiator];

        info!(
            endpoint = %endpoint,
            peers = peer_locations.len(),
            threshold,
            timeout_ms,
            "Starting DKG"
        );

        let request = DkSharesPostRequest {
            peer_locations: peer_locations.to_vec(),
            threshold,
            timeout_ms,
        };
        let local_deadline = Duration::from_millis(u64::from(timeout_ms)) + RESPONSE_GRACE;

        let info = match tokio::time::timeout(
            local_deadline,
            self.client.post_dk_shares(endpoint, request),
        )
        .await
        {
            Err(_) | Ok(Err(DkgClientError::Timeout)) => {
                warn!(endpoint = %endpoint, timeout_ms, "DKG timed out");
                return Err(DkgError::DkgTimeout {
                    timeout_ms: u64::from(timeout_ms),
                });
            }
            Ok(Err(DkgClientError::Transport(reason))) => {
                warn!(endpoint = %endpoint, reason = %reason, "DKG request failed");
                return Err(DkgError::DkgCommunicationFailure {
                    endpoint: endpoint.clone(),
                    reason,
                });
            }
            Ok(Ok(info)) => info,
        };

        let address: Address =
            info.address
                .parse()
                .map_err(|e: shared_types::AddressParseError| DkgError::InvalidDkgResult {
                    endpoint: endpoint.clone(),
                    reason: e.to_string(),
                })?;

        if address.kind() != AddressKind::Threshold {
            debug!(address = %address, kind = ?address.kind(), "DKG returned a non-threshold address");
        }
        info!(address = %address, "DKG complete");
        Ok(address)
    }
}
