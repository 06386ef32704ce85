//! Published events (Outgoing)

use crate::domain::{ConsensusError, RoundPhase, ShareRejection};
use serde::{Deserialize, Serialize};
use shared_types::{OutputId, TransactionId};

/// Reported on the consensus event stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsensusEvent {
    /// A round committed; `block_index` is the block it produced.
    Committed {
        state_output: OutputId,
        tx_id: TransactionId,
        block_index: u32,
    },
    /// The round for `from` was discarded in favour of `to`.
    Superseded { from: OutputId, to: OutputId },
    ShareRejected {
        sender: String,
        reason: ShareRejection,
    },
    /// A block fetched from a peer was appended.
    BlockSynced { block_index: u32 },
    Failed(ConsensusError),
}

/// Snapshot of the current round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStatus {
    pub state_output: OutputId,
    pub phase: RoundPhase,
    pub shares: usize,
    /// Index of the latest block in the local log.
    pub height: u32,
}
