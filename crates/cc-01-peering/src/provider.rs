//! # Network Provider
//!
//! The capability consumed by every subsystem that talks to committee peers.
//! Transport details (framing, TLS, discovery) live behind these traits.

use crate::message::{MessageReceiver, PeerMessageData, PeerMessageIn};
use shared_types::PeeringId;
use std::sync::Arc;
use thiserror::Error;

/// Callback invoked for every matching inbound message.
pub type MessageHandler = Arc<dyn Fn(PeerMessageIn) + Send + Sync>;

/// Handle returned by [`NetworkProvider::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachId(pub u64);

/// Errors from peer lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeeringError {
    /// No peer is known at this network location.
    #[error("Unknown peer: {0}")]
    UnknownPeer(String),
}

/// Access to peers of this node.
///
/// Delivery contract:
/// - a message reaches only attachments whose `(peering_id, receiver)` match
///   exactly; anything else is dropped without an error;
/// - messages from one sender to one receiver keep their order;
/// - no ordering across different senders.
pub trait NetworkProvider: Send + Sync {
    /// Network location of this node.
    fn self_location(&self) -> &str;

    /// Register `handler` for messages on `(peering_id, receiver)`.
    fn attach(
        &self,
        peering_id: PeeringId,
        receiver: MessageReceiver,
        handler: MessageHandler,
    ) -> AttachId;

    /// Remove an attachment. Unknown ids are ignored.
    fn detach(&self, id: AttachId);

    /// Sender for the peer at `location`.
    fn peer_by_location(&self, location: &str) -> Result<Arc<dyn PeerSender>, PeeringError>;
}

/// Outbound channel to one peer.
pub trait PeerSender: Send + Sync {
    /// Network location of the destination.
    fn location(&self) -> &str;

    /// Fire-and-forget send. Undeliverable messages are dropped.
    fn send_msg(&self, msg: PeerMessageData);
}

/// Send `msg` to every location in `locations`, skipping unknown peers.
///
/// Returns the number of peers the message was handed to.
pub fn send_to_all(
    provider: &dyn NetworkProvider,
    locations: &[String],
    msg: &PeerMessageData,
) -> usize {
    let mut sent = 0;
    for location in locations {
        match provider.peer_by_location(location) {
            Ok(peer) => {
                peer.send_msg(msg.clone());
                sent += 1;
            }
            Err(e) => tracing::debug!(error = %e, "Skipping peer"),
        }
    }
    sent
}
