//! # In-Memory Peering Network
//!
//! A set of nodes wired together inside one process. Used by tests and local
//! simulations of a committee.
//!
//! Each node owns one bounded FIFO inbox drained by a Tokio task, which keeps
//! per-sender ordering and runs handlers outside the sender's call stack.

use crate::message::{MessageReceiver, PeerMessageData, PeerMessageIn};
use crate::provider::{AttachId, MessageHandler, NetworkProvider, PeerSender, PeeringError};
use parking_lot::RwLock;
use shared_types::PeeringId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

struct Attachment {
    peering_id: PeeringId,
    receiver: MessageReceiver,
    handler: MessageHandler,
}

/// Receiving side of one node.
struct NodeInbox {
    attachments: RwLock<HashMap<AttachId, Attachment>>,
    next_attach_id: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl NodeInbox {
    fn new() -> Self {
        Self {
            attachments: RwLock::new(HashMap::new()),
            next_attach_id: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    fn dispatch(&self, msg: PeerMessageIn) {
        // Collect under the lock, call without it: handlers may attach/detach.
        let handlers: Vec<MessageHandler> = self
            .attachments
            .read()
            .values()
            .filter(|a| msg.data.matches(&a.peering_id, a.receiver))
            .map(|a| a.handler.clone())
            .collect();

        if handlers.is_empty() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            trace!(
                peering_id = %msg.data.peering_id,
                receiver = msg.data.receiver,
                msg_type = msg.data.msg_type,
                "No attachment, message dropped"
            );
            return;
        }

        self.delivered.fetch_add(1, Ordering::Relaxed);
        for handler in handlers {
            handler(msg.clone());
        }
    }
}

/// A committee of in-process nodes, one provider per location.
pub struct InMemoryPeeringNetwork {
    providers: Vec<Arc<InMemoryNetworkProvider>>,
}

impl InMemoryPeeringNetwork {
    /// Build the network. Must be called inside a Tokio runtime.
    ///
    /// `queue_capacity` bounds each node's inbox; overflow is dropped.
    pub fn new(locations: &[&str], queue_capacity: usize) -> Self {
        let mut routes = HashMap::new();
        let mut inboxes = Vec::with_capacity(locations.len());

        for location in locations {
            let (tx, mut rx) = mpsc::channel::<PeerMessageIn>(queue_capacity.max(1));
            let inbox = Arc::new(NodeInbox::new());
            let task_inbox = inbox.clone();
            tokio::spawn(async move {
                while let Some(msg) = rx.recv().await {
                    task_inbox.dispatch(msg);
                }
            });
            routes.insert(location.to_string(), tx);
            inboxes.push(inbox);
        }

        let routes = Arc::new(routes);
        let providers = locations
            .iter()
            .zip(inboxes)
            .map(|(location, inbox)| {
                Arc::new(InMemoryNetworkProvider {
                    location: location.to_string(),
                    inbox,
                    routes: routes.clone(),
                })
            })
            .collect();

        debug!(nodes = locations.len(), "In-memory peering network created");
        Self { providers }
    }

    /// Providers in the order of the locations passed to [`Self::new`].
    pub fn network_providers(&self) -> Vec<Arc<InMemoryNetworkProvider>> {
        self.providers.clone()
    }

    pub fn provider(&self, index: usize) -> Option<Arc<InMemoryNetworkProvider>> {
        self.providers.get(index).cloned()
    }
}

/// One node's view of an [`InMemoryPeeringNetwork`].
pub struct InMemoryNetworkProvider {
    location: String,
    inbox: Arc<NodeInbox>,
    routes: Arc<HashMap<String, mpsc::Sender<PeerMessageIn>>>,
}

impl InMemoryNetworkProvider {
    /// Inbound messages handed to at least one attachment.
    pub fn delivered_count(&self) -> u64 {
        self.inbox.delivered.load(Ordering::Relaxed)
    }

    /// Inbound messages no attachment matched.
    pub fn dropped_count(&self) -> u64 {
        self.inbox.dropped.load(Ordering::Relaxed)
    }

    pub fn attachment_count(&self) -> usize {
        self.inbox.attachments.read().len()
    }
}

impl NetworkProvider for InMemoryNetworkProvider {
    fn self_location(&self) -> &str {
        &self.location
    }

    fn attach(
        &self,
        peering_id: PeeringId,
        receiver: MessageReceiver,
        handler: MessageHandler,
    ) -> AttachId {
        let id = AttachId(self.inbox.next_attach_id.fetch_add(1, Ordering::Relaxed));
        self.inbox.attachments.write().insert(
            id,
            Attachment {
                peering_id,
                receiver,
                handler,
            },
        );
        debug!(location = %self.location, peering_id = %peering_id, receiver, "Attached");
        id
    }

    fn detach(&self, id: AttachId) {
        if self.inbox.attachments.write().remove(&id).is_some() {
            debug!(location = %self.location, attach_id = id.0, "Detached");
        }
    }

    fn peer_by_location(&self, location: &str) -> Result<Arc<dyn PeerSender>, PeeringError> {
        let tx = self
            .routes
            .get(location)
            .ok_or_else(|| PeeringError::UnknownPeer(location.to_string()))?;
        Ok(Arc::new(InMemoryPeerSender {
            from: self.location.clone(),
            to: location.to_string(),
            tx: tx.clone(),
        }))
    }
}

struct InMemoryPeerSender {
    from: String,
    to: String,
    tx: mpsc::Sender<PeerMessageIn>,
}

impl PeerSender for InMemoryPeerSender {
    fn location(&self) -> &str {
        &self.to
    }

    fn send_msg(&self, msg: PeerMessageData) {
        let msg_type = msg.msg_type;
        let inbound = PeerMessageIn {
            data: msg,
            sender_location: self.from.clone(),
        };
        match self.tx.try_send(inbound) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(from = %self.from, to = %self.to, msg_type, "Peer inbox full, message dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(from = %self.from, to = %self.to, msg_type, "Peer inbox closed");
            }
        }
    }
}
