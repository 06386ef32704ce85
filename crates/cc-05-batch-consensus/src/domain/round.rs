//! # Consensus Round
//!
//! State machine for one state output:
//!
//! ```text
//! Idle ──NotifyRequests──→ Notified ──StartProcessingBatch──→ Processing
//!   └──────────StartProcessingBatch──────────────────────────────↗   │
//!                                                      own share signed
//!                                                                    ↓
//!                         Committed ←──T matching shares── AwaitingQuorum
//! ```
//!
//! A round never moves backwards; supersession replaces it with a fresh one.

use cc_02_peer_messages::SignedHashMsg;
use serde::{Deserialize, Serialize};
use shared_types::{Batch, HashValue, OutputId, RequestId, StateUpdate};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tokio::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoundPhase {
    Idle,
    Notified,
    Processing,
    AwaitingQuorum,
    Committed,
}

/// Local outcome of processing a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessedBatch {
    pub batch: Batch,
    /// Timestamp of the `StartProcessingBatch` that triggered processing.
    pub orig_timestamp: i64,
    pub batch_hash: HashValue,
    pub essence: Vec<u8>,
    pub essence_hash: HashValue,
    pub state_updates: Vec<StateUpdate>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareRejection {
    /// Batch or essence hash differs from the local result.
    Mismatch,
    /// The share does not verify against the sender's key share.
    InvalidSignature,
}

impl fmt::Display for ShareRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mismatch => f.write_str("hash mismatch"),
            Self::InvalidSignature => f.write_str("invalid signature"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareOutcome {
    Accepted,
    Duplicate,
    /// Kept until the local batch is processed.
    Buffered,
    Rejected(ShareRejection),
    /// The round is already committed.
    Stale,
}

#[derive(Debug)]
pub struct Round {
    state_output: OutputId,
    phase: RoundPhase,
    notified: BTreeSet<RequestId>,
    processed: Option<ProcessedBatch>,
    /// Verified, matching shares by sender location.
    shares: BTreeMap<String, Vec<u8>>,
    early_shares: BTreeMap<String, SignedHashMsg>,
    deadline: Option<Instant>,
}

impl Round {
    pub fn new(state_output: OutputId) -> Self {
        Self {
            state_output,
            phase: RoundPhase::Idle,
            notified: BTreeSet::new(),
            processed: None,
            shares: BTreeMap::new(),
            early_shares: BTreeMap::new(),
            deadline: None,
        }
    }

    pub fn state_output(&self) -> &OutputId {
        &self.state_output
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn notified_requests(&self) -> &BTreeSet<RequestId> {
        &self.notified
    }

    pub fn processed(&self) -> Option<&ProcessedBatch> {
        self.processed.as_ref()
    }

    pub fn share_count(&self) -> usize {
        self.shares.len()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Record requests announced by a peer. Empty lists are heartbeats.
    pub fn notify(&mut self, request_ids: &[RequestId]) -> bool {
        if request_ids.is_empty() || self.phase == RoundPhase::Committed {
            return false;
        }
        self.notified.extend(request_ids.iter().copied());
        if self.phase == RoundPhase::Idle {
            self.phase = RoundPhase::Notified;
        }
        true
    }

    /// Enter `Processing`. Accepted from `Idle` as well, since transport may
    /// deliver the start before any notification.
    pub fn begin_processing(&mut self, deadline: Instant) -> bool {
        match self.phase {
            RoundPhase::Idle | RoundPhase::Notified => {
                self.phase = RoundPhase::Processing;
                self.deadline = Some(deadline);
                true
            }
            _ => false,
        }
    }

    /// Processing failed locally: back to `Notified` (or `Idle`).
    pub fn abort_processing(&mut self) {
        if self.phase == RoundPhase::Processing {
            self.phase = if self.notified.is_empty() {
                RoundPhase::Idle
            } else {
                RoundPhase::Notified
            };
            self.deadline = None;
        }
    }

    /// Enter `AwaitingQuorum` with the own share counted.
    ///
    /// Returns the shares that arrived early, for evaluation by the caller.
    pub fn finish_processing(
        &mut self,
        processed: ProcessedBatch,
        own_location: &str,
        own_share: Vec<u8>,
    ) -> Vec<(String, SignedHashMsg)> {
        self.processed = Some(processed);
        self.phase = RoundPhase::AwaitingQuorum;
        self.shares.insert(own_location.to_string(), own_share);
        std::mem::take(&mut self.early_shares).into_iter().collect()
    }

    /// Offer a peer's share.
    ///
    /// `verify` is called only for shares that match the local hashes.
    pub fn offer_share(
        &mut self,
        sender: &str,
        msg: SignedHashMsg,
        verify: impl FnOnce(&HashValue, &[u8]) -> bool,
    ) -> ShareOutcome {
        match self.phase {
            RoundPhase::Idle | RoundPhase::Notified | RoundPhase::Processing => {
                if self.early_shares.contains_key(sender) {
                    return ShareOutcome::Duplicate;
                }
                self.early_shares.insert(sender.to_string(), msg);
                ShareOutcome::Buffered
            }
            RoundPhase::Committed => ShareOutcome::Stale,
            RoundPhase::AwaitingQuorum => {
                if self.shares.contains_key(sender) {
                    return ShareOutcome::Duplicate;
                }
                let Some(processed) = &self.processed else {
                    return ShareOutcome::Stale;
                };
                if msg.batch_hash != processed.batch_hash
                    || msg.essence_hash != processed.essence_hash
                {
                    return ShareOutcome::Rejected(ShareRejection::Mismatch);
                }
                if !verify(&processed.essence_hash, &msg.sig_share) {
                    return ShareOutcome::Rejected(ShareRejection::InvalidSignature);
                }
                self.shares.insert(sender.to_string(), msg.sig_share);
                ShareOutcome::Accepted
            }
        }
    }

    pub fn has_quorum(&self, threshold: u16) -> bool {
        self.phase == RoundPhase::AwaitingQuorum && self.shares.len() >= usize::from(threshold)
    }

    /// Collected shares, ordered by sender.
    pub fn shares(&self) -> Vec<(String, Vec<u8>)> {
        self.shares
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Move to `Committed`, handing out the processed batch.
    pub fn commit(&mut self) -> Option<ProcessedBatch> {
        if self.phase != RoundPhase::AwaitingQuorum {
            return None;
        }
        self.phase = RoundPhase::Committed;
        self.deadline = None;
        self.processed.take()
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }
}
