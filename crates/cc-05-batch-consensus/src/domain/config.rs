//! Consensus tunables.

use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsensusConfig {
    /// Longest a round may stay in processing or awaiting quorum.
    pub quorum_timeout: Duration,
    /// Inbound queue of the round actor.
    pub input_capacity: usize,
    /// Buffered consensus events per subscriber.
    pub event_capacity: usize,
    /// Round messages kept for state outputs this node has not reached.
    pub held_capacity: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            quorum_timeout: Duration::from_secs(30),
            input_capacity: 1_000,
            event_capacity: 256,
            held_capacity: 256,
        }
    }
}
