//! # cc-05-batch-consensus
//!
//! Batch consensus for one chain, run by every committee member.
//!
//! ## Architecture
//!
//! Each peer drives a round per state output. The leader proposes a batch,
//! every peer processes it, signs the essence hash with its key share and
//! sends the share to the others. The first peer holding T matching shares
//! aggregates them and posts the result transaction:
//!
//! ```text
//!  NotifyRequests ──→ StartProcessingBatch ──→ SignedHash ×(N-1)
//!                                                   │
//!                              T matching shares ───┤
//!                                                   ↓
//!                    post result ──→ NotifyFinalResultPosted ──→ next round
//! ```
//!
//! The committed state updates become the next block. A peer that falls
//! behind fetches missing blocks from a taller peer:
//!
//! ```text
//!  BlockIndexPingPong ──→ GetBlock(h+1) ──→ BlockHeader + StateUpdate ×size
//! ```
//!
//! Batch messages go to the consensus receiver, block messages to the state
//! manager receiver of the same peering scope.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cc_05_batch_consensus::{Committee, ConsensusDependencies, ConsensusService};
//!
//! let handle = ConsensusService::spawn(deps, committee, state_output)?;
//! handle.propose_batch(request_ids, fee_destination).await?;
//!
//! let mut events = handle.subscribe();
//! while let Ok(event) = events.recv().await {
//!     // Committed, Superseded, ShareRejected, BlockSynced, Failed
//! }
//! ```

pub mod adapters;
pub mod domain;
pub mod events;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::{receiver_for, CommitteeLink};
pub use domain::{
    BlockAssembly, BlockLog, BlockLogError, ConsensusConfig, ConsensusError, ConsensusResult,
    ProcessedBatch, Round, RoundPhase, ShareOutcome, ShareRejection,
};
pub use events::{ConsensusEvent, ConsensusInput, RoundStatus};
pub use ports::{BatchOutcome, BatchProcessor, ResultPoster, ThresholdSigner};
pub use service::{Committee, ConsensusDependencies, ConsensusHandle, ConsensusService};
