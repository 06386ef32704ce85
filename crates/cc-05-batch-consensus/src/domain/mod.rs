//! Domain layer for batch consensus.
//!
//! - round: per-state-output round state machine and share bookkeeping
//! - block_log: committed blocks and catch-up assembly
//! - config: tunables

mod block_log;
mod config;
mod error;
mod round;

pub use block_log::*;
pub use config::*;
pub use error::*;
pub use round::*;
