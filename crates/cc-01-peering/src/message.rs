//! # Peer Messages
//!
//! Envelope carried between committee peers. The payload is opaque here;
//! `msg_type` tells the receiving subsystem how to decode it.

use shared_types::PeeringId;
use std::time::{SystemTime, UNIX_EPOCH};

/// Logical receiver inside a node, e.g. the consensus operator of a chain.
pub type MessageReceiver = u8;

/// Well-known receivers.
pub mod receivers {
    use super::MessageReceiver;

    pub const CHAIN: MessageReceiver = 0;
    pub const CONSENSUS: MessageReceiver = 1;
    pub const STATE_MANAGER: MessageReceiver = 2;
}

/// Outbound message envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerMessageData {
    /// Scope the message belongs to (one per chain).
    pub peering_id: PeeringId,
    /// Receiver inside the destination node.
    pub receiver: MessageReceiver,
    /// Payload type, decoded by the receiver.
    pub msg_type: u8,
    /// Unix time in nanoseconds at creation.
    pub timestamp: i64,
    pub payload: Vec<u8>,
}

impl PeerMessageData {
    pub fn new(
        peering_id: PeeringId,
        receiver: MessageReceiver,
        msg_type: u8,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            peering_id,
            receiver,
            msg_type,
            timestamp: now_nanos(),
            payload,
        }
    }

    /// Whether an attachment on `(peering_id, receiver)` should see this message.
    pub fn matches(&self, peering_id: &PeeringId, receiver: MessageReceiver) -> bool {
        self.peering_id == *peering_id && self.receiver == receiver
    }
}

/// Inbound message as seen by an attachment handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerMessageIn {
    pub data: PeerMessageData,
    /// Network location of the sending peer.
    pub sender_location: String,
}

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default()
}
