//! # Peering - Committee Network Provider
//!
//! Scoped message delivery between the nodes of a committee.
//!
//! ## Delivery Model
//!
//! ```text
//! ┌──────────────┐  send_msg()   ┌──────────────┐
//! │   Node B     │ ────────────► │   Node A     │
//! │ PeerSender   │               │  inbox (FIFO)│
//! └──────────────┘               └──────┬───────┘
//!                                       │ (peering_id, receiver) match
//!                                       ▼
//!                                ┌──────────────┐
//!                                │  handler(s)  │
//!                                └──────────────┘
//! ```
//!
//! - A message reaches only handlers attached on its exact `(PeeringId, receiver)`.
//! - Unmatched messages are dropped silently.
//! - Per-sender order is preserved.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod in_memory;
pub mod message;
pub mod provider;

pub use in_memory::{InMemoryNetworkProvider, InMemoryPeeringNetwork};
pub use message::{receivers, MessageReceiver, PeerMessageData, PeerMessageIn};
pub use provider::{send_to_all, AttachId, MessageHandler, NetworkProvider, PeerSender, PeeringError};

/// Inbox capacity per node before messages are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;
