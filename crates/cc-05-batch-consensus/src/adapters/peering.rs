//! Peering adapter
//!
//! Connects the round actor to the committee: inbound messages from other
//! members are decoded and queued for the actor, outbound messages are
//! encoded and sent to every other member. Senders outside the committee are
//! dropped here.

use crate::events::ConsensusInput;
use cc_01_peering::{
    receivers, send_to_all, AttachId, MessageHandler, MessageReceiver, NetworkProvider,
    PeerMessageData, PeerMessageIn,
};
use cc_02_peer_messages::{msg_types, ChainMessage, PeerMessage};
use shared_types::{PeeringId, WireError};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Receiver inside the node that handles `msg_type`.
pub fn receiver_for(msg_type: u8) -> MessageReceiver {
    match msg_type {
        msg_types::GET_BLOCK
        | msg_types::BLOCK_HEADER
        | msg_types::STATE_UPDATE
        | msg_types::BLOCK_INDEX_PING_PONG => receivers::STATE_MANAGER,
        _ => receivers::CONSENSUS,
    }
}

/// This node's view of its committee on one chain.
pub struct CommitteeLink {
    provider: Arc<dyn NetworkProvider>,
    peering_id: PeeringId,
    /// Other members, in committee order.
    peers: Vec<String>,
}

impl CommitteeLink {
    pub fn new(provider: Arc<dyn NetworkProvider>, peering_id: PeeringId, members: &[String]) -> Self {
        let me = provider.self_location().to_string();
        let peers = members.iter().filter(|m| **m != me).cloned().collect();
        Self {
            provider,
            peering_id,
            peers,
        }
    }

    pub fn self_location(&self) -> &str {
        self.provider.self_location()
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    pub fn envelope<M: PeerMessage>(&self, msg: &M) -> Result<PeerMessageData, WireError> {
        Ok(PeerMessageData::new(
            self.peering_id,
            receiver_for(M::MSG_TYPE),
            M::MSG_TYPE,
            msg.to_bytes()?,
        ))
    }

    /// Send to every other member. Returns the number of peers reached.
    pub fn broadcast<M: PeerMessage>(&self, msg: &M) -> usize {
        match self.envelope(msg) {
            Ok(data) => self.broadcast_data(&data),
            Err(e) => {
                warn!(msg_type = M::MSG_TYPE, error = %e, "Failed to encode message");
                0
            }
        }
    }

    pub fn broadcast_data(&self, data: &PeerMessageData) -> usize {
        send_to_all(self.provider.as_ref(), &self.peers, data)
    }

    pub fn send_to<M: PeerMessage>(&self, location: &str, msg: &M) -> bool {
        let data = match self.envelope(msg) {
            Ok(data) => data,
            Err(e) => {
                warn!(msg_type = M::MSG_TYPE, error = %e, "Failed to encode message");
                return false;
            }
        };
        match self.provider.peer_by_location(location) {
            Ok(peer) => {
                peer.send_msg(data);
                true
            }
            Err(e) => {
                debug!(error = %e, "Cannot reach peer");
                false
            }
        }
    }

    /// Route this chain's consensus and block-sync messages into `tx`.
    pub fn attach(&self, tx: mpsc::Sender<ConsensusInput>) -> Vec<AttachId> {
        let members: Arc<HashSet<String>> = Arc::new(self.peers.iter().cloned().collect());
        [receivers::CONSENSUS, receivers::STATE_MANAGER]
            .into_iter()
            .map(|receiver| {
                let handler = decoding_handler(tx.clone(), members.clone());
                self.provider.attach(self.peering_id, receiver, handler)
            })
            .collect()
    }

    pub fn detach(&self, ids: &[AttachId]) {
        for id in ids {
            self.provider.detach(*id);
        }
    }
}

fn decoding_handler(
    tx: mpsc::Sender<ConsensusInput>,
    members: Arc<HashSet<String>>,
) -> MessageHandler {
    Arc::new(move |msg: PeerMessageIn| {
        if !members.contains(&msg.sender_location) {
            debug!(
                sender = %msg.sender_location,
                msg_type = msg.data.msg_type,
                "Dropping message from outside the committee"
            );
            return;
        }
        let message = match ChainMessage::decode(msg.data.msg_type, &msg.data.payload) {
            Ok(m) => m,
            Err(e) => {
                warn!(
                    sender = %msg.sender_location,
                    msg_type = msg.data.msg_type,
                    error = %e,
                    "Dropping undecodable peer message"
                );
                return;
            }
        };
        let input = ConsensusInput::Peer {
            sender: msg.sender_location,
            timestamp: msg.data.timestamp,
            message,
        };
        if let Err(e) = tx.try_send(input) {
            warn!(error = %e, "Consensus input queue rejected message");
        }
    })
}
