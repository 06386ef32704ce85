//! # Peer Messages (cc-02)
//!
//! Binary encoding of the messages committee peers exchange while processing
//! batches and synchronizing blocks.
//!
//! ## Framing
//!
//! The message type byte travels out of band in
//! `PeerMessageData::msg_type`; the payload is one message body.
//!
//! ```text
//! [Consensus] ──NotifyRequests / StartProcessingBatch / SignedHash──→ [Peers]
//! [Consensus] ──NotifyFinalResultPosted──────────────────────────────→ [Peers]
//! [BlockSync] ──GetBlock / BlockHeader / StateUpdate / PingPong──────→ [Peers]
//! ```
//!
//! ## Rules
//!
//! - Integers are little-endian.
//! - Every under-read fails with [`WireError::TruncatedMessage`].
//! - Counts and byte strings are bounded by a 16-bit prefix; longer values
//!   are refused at encode time.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod codec;
pub mod dispatch;
pub mod messages;

pub use codec::PeerMessage;
pub use dispatch::ChainMessage;
pub use messages::*;
pub use shared_types::WireError;

/// Message type bytes.
pub mod msg_types {
    pub const NOTIFY_REQUESTS: u8 = 1;
    pub const NOTIFY_FINAL_RESULT_POSTED: u8 = 2;
    pub const START_PROCESSING_BATCH: u8 = 3;
    pub const SIGNED_HASH: u8 = 4;
    pub const GET_BLOCK: u8 = 5;
    pub const BLOCK_HEADER: u8 = 6;
    pub const STATE_UPDATE: u8 = 7;
    pub const BLOCK_INDEX_PING_PONG: u8 = 8;
}
