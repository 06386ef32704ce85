//! Consumed inputs (Incoming)

use cc_02_peer_messages::ChainMessage;
use shared_types::OutputId;

/// Everything the round actor reacts to, in arrival order.
#[derive(Clone, Debug)]
pub enum ConsensusInput {
    /// A decoded message from a committee peer (or from this node itself).
    Peer {
        sender: String,
        /// Envelope creation time, nanoseconds.
        timestamp: i64,
        message: ChainMessage,
    },
    /// The ledger reports a new state output for the chain.
    StateTransition { state_output: OutputId },
    /// Ask the committee for its heights.
    Sync,
}
