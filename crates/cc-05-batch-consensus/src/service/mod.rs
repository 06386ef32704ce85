//! # Consensus Service
//!
//! One actor per chain. It owns the current [`Round`] and the [`BlockLog`],
//! and handles peer messages, state transitions and the quorum deadline
//! strictly one at a time:
//!
//! ```text
//!  peers ──decode──┐
//!                  ├──→ [mpsc] ──→ actor ──→ watch<RoundStatus>
//!  ConsensusHandle ┘                 │   └─→ broadcast<ConsensusEvent>
//!                                    └─────→ peers (shares, results, blocks)
//! ```
//!
//! ## Supersession
//!
//! Every round message carries the state output it refers to. Messages for
//! the current output are handled and messages for retired outputs dropped.
//! Only the ledger (`StateTransition`) or a local commit moves the round to a
//! new output. Messages about an output this node has not reached yet are
//! held, and replayed once that output becomes current; the first one also
//! asks the committee for its heights.


use crate::adapters::CommitteeLink;
use crate::domain::{
    BlockAssembly, BlockLog, ConsensusConfig, ConsensusError, ConsensusResult, ProcessedBatch,
    Round, RoundPhase, ShareOutcome,
};
use crate::events::{ConsensusEvent, ConsensusInput, RoundStatus};
use crate::metrics;
use crate::ports::{BatchProcessor, ResultPoster, ThresholdSigner};
use cc_01_peering::{AttachId, NetworkProvider};
use cc_02_peer_messages::{
    BlockHeaderMsg, BlockIndexPingPongMsg, ChainMessage, GetBlockMsg, NotifyFinalResultPostedMsg,
    NotifyReqMsg, PeerMessage, SignedHashMsg, StartProcessingBatchMsg, StateUpdateMsg,
};
use parking_lot::RwLock;
use shared_types::{
    hash_data, AgentId, Batch, BlockHeader, OutputId, PeeringId, RequestId, StateUpdate,
    TransactionId,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Dependencies for [`ConsensusService`].
pub struct ConsensusDependencies {
    pub processor: Arc<dyn BatchProcessor>,
    pub signer: Arc<dyn ThresholdSigner>,
    pub poster: Arc<dyn ResultPoster>,
    pub provider: Arc<dyn NetworkProvider>,
    pub config: ConsensusConfig,
}

/// The committee running one chain.
#[derive(Clone, Debug)]
pub struct Committee {
    pub peering_id: PeeringId,
    /// Peering locations of all members, this node included.
    pub members: Vec<String>,
    pub threshold: u16,
}

impl Committee {
    fn validate(&self, self_location: &str) -> ConsensusResult<()> {
        if !self.members.iter().any(|m| m == self_location) {
            return Err(ConsensusError::InvalidCommittee(format!(
                "{self_location} is not a member"
            )));
        }
        if self.threshold == 0 || usize::from(self.threshold) > self.members.len() {
            return Err(ConsensusError::InvalidCommittee(format!(
                "threshold {} out of range 1..={}",
                self.threshold,
                self.members.len()
            )));
        }
        Ok(())
    }
}

/// Round actor. Created and driven by [`ConsensusService::spawn`].
pub struct ConsensusService {
    processor: Arc<dyn BatchProcessor>,
    signer: Arc<dyn ThresholdSigner>,
    poster: Arc<dyn ResultPoster>,
    link: Arc<CommitteeLink>,
    config: ConsensusConfig,
    threshold: u16,
    self_location: String,

    round: Round,
    /// Outputs that must never become current again.
    retired: HashSet<OutputId>,
    /// Round messages for outputs not reached yet.
    held: HashMap<OutputId, Vec<HeldMessage>>,
    blocks: Arc<RwLock<BlockLog>>,
    assembly: Option<BlockAssembly>,
    /// Tallest peer seen and its height, while catching up.
    sync_source: Option<(String, u32)>,

    rx: mpsc::Receiver<ConsensusInput>,
    status_tx: watch::Sender<RoundStatus>,
    events_tx: broadcast::Sender<ConsensusEvent>,
}

impl ConsensusService {
    /// Start the actor for a chain whose current state output is
    /// `state_output`. Must be called inside a Tokio runtime.
    pub fn spawn(
        deps: ConsensusDependencies,
        committee: Committee,
        state_output: OutputId,
    ) -> ConsensusResult<ConsensusHandle> {
        let self_location = deps.provider.self_location().to_string();
        committee.validate(&self_location)?;

        let link = Arc::new(CommitteeLink::new(
            deps.provider,
            committee.peering_id,
            &committee.members,
        ));
        let (tx, rx) = mpsc::channel(deps.config.input_capacity);
        let attach_ids = link.attach(tx.clone());

        let blocks = Arc::new(RwLock::new(BlockLog::new(state_output)));
        let round = Round::new(state_output);
        let (status_tx, status_rx) = watch::channel(RoundStatus {
            state_output,
            phase: round.phase(),
            shares: 0,
            height: 0,
        });
        let (events_tx, _) = broadcast::channel(deps.config.event_capacity);

        let service = Self {
            processor: deps.processor,
            signer: deps.signer,
            poster: deps.poster,
            link: link.clone(),
            config: deps.config,
            threshold: committee.threshold,
            self_location: self_location.clone(),
            round,
            retired: HashSet::new(),
            held: HashMap::new(),
            blocks: blocks.clone(),
            assembly: None,
            sync_source: None,
            rx,
            status_tx,
            events_tx: events_tx.clone(),
        };

        info!(
            location = %self_location,
            peering_id = %committee.peering_id,
            members = committee.members.len(),
            threshold = committee.threshold,
            "Starting consensus"
        );
        tokio::spawn(service.run());

        Ok(ConsensusHandle {
            tx,
            status: status_rx,
            events: events_tx,
            blocks,
            link,
            attach_ids,
        })
    }

    async fn run(mut self) {
        loop {
            let deadline = self.round.deadline();
            tokio::select! {
                input = self.rx.recv() => match input {
                    Some(input) => {
                        self.handle_input(input).await;
                        self.replay_held().await;
                    }
                    None => break,
                },
                _ = wait_until(deadline) => self.on_deadline(),
            }
            self.publish_status();
        }
        debug!(location = %self.self_location, "Consensus actor stopped");
    }

    async fn handle_input(&mut self, input: ConsensusInput) {
        match input {
            ConsensusInput::StateTransition { state_output } => {
                if state_output == *self.round.state_output() {
                    return;
                }
                if self.retired.contains(&state_output) {
                    debug!(state_output = %state_output, "Ignoring transition to retired state output");
                    return;
                }
                // Whatever is held for other outputs is behind the ledger now.
                self.held.retain(|output, _| *output == state_output);
                self.supersede(state_output);
            }
            ConsensusInput::Sync => self.request_sync(),
            ConsensusInput::Peer {
                sender,
                timestamp,
                message,
            } => self.on_peer_message(sender, timestamp, message).await,
        }
    }

    async fn on_peer_message(&mut self, sender: String, timestamp: i64, message: ChainMessage) {
        if let Some(output) = round_output(&message) {
            if output != *self.round.state_output() {
                self.hold(output, sender, timestamp, message);
                return;
            }
        }
        match message {
            ChainMessage::NotifyRequests(msg) => {
                if self.round.notify(&msg.request_ids) {
                    debug!(
                        sender = %sender,
                        requests = msg.request_ids.len(),
                        "Requests notified"
                    );
                }
            }
            ChainMessage::StartProcessingBatch(msg) => self.start_batch(msg, timestamp).await,
            ChainMessage::SignedHash(msg) => {
                self.offer_share(&sender, msg);
                self.try_finalize().await;
            }
            ChainMessage::NotifyFinalResultPosted(msg) => self.on_result_posted(msg).await,
            ChainMessage::GetBlock(msg) => self.serve_block(&sender, msg.block_index),
            ChainMessage::BlockHeader(msg) => self.on_block_header(&sender, msg.header),
            ChainMessage::StateUpdate(msg) => self.on_state_update(&sender, msg),
            ChainMessage::BlockIndexPingPong(msg) => self.on_ping_pong(&sender, msg),
        }
    }

    // =========================================================================
    // ROUND
    // =========================================================================

    /// Keep a message about `output` until the round reaches it.
    fn hold(&mut self, output: OutputId, sender: String, timestamp: i64, message: ChainMessage) {
        if self.retired.contains(&output) {
            debug!(state_output = %output, "Ignoring message for retired state output");
            return;
        }
        let held: usize = self.held.values().map(Vec::len).sum();
        if held >= self.config.held_capacity {
            debug!(state_output = %output, held, "Held message buffer full, dropping");
            return;
        }
        debug!(sender = %sender, state_output = %output, "Holding message for unreached state output");
        let first = !self.held.contains_key(&output);
        self.held.entry(output).or_default().push(HeldMessage {
            sender,
            timestamp,
            message,
        });
        if first {
            // This node may be behind.
            self.request_sync();
        }
    }

    async fn replay_held(&mut self) {
        while let Some(held) = self.held.remove(self.round.state_output()) {
            debug!(state_output = %self.round.state_output(), count = held.len(), "Replaying held messages");
            for msg in held {
                self.on_peer_message(msg.sender, msg.timestamp, msg.message)
                    .await;
            }
        }
    }

    fn retire(&mut self, output: OutputId) {
        self.retired.insert(output);
        self.held.remove(&output);
    }

    fn supersede(&mut self, to: OutputId) {
        let from = *self.round.state_output();
        self.retire(from);
        self.round = Round::new(to);
        metrics::record_round_superseded();
        info!(from = %from, to = %to, "Round superseded");
        self.emit(ConsensusEvent::Superseded { from, to });
        // A jump in state means blocks may be missing here.
        self.request_sync();
    }

    async fn start_batch(&mut self, msg: StartProcessingBatchMsg, timestamp: i64) {
        let Some(batch) = Batch::new(msg.state_output_id, msg.request_ids, msg.fee_destination)
        else {
            debug!("Ignoring empty batch");
            return;
        };
        let deadline = Instant::now() + self.config.quorum_timeout;
        if !self.round.begin_processing(deadline) {
            debug!(phase = ?self.round.phase(), "Batch already started for this round");
            return;
        }
        debug!(requests = batch.len(), "Processing batch");

        let outcome = match self.processor.process(&batch, timestamp).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.round.abort_processing();
                self.fail(ConsensusError::BatchProcessingFailed(e));
                return;
            }
        };

        let batch_hash = batch.hash();
        let essence_hash = hash_data(&[&outcome.essence]);
        let own_share = match self.signer.sign_share(&essence_hash) {
            Ok(share) => share,
            Err(e) => {
                self.round.abort_processing();
                self.fail(ConsensusError::SigningFailed(e));
                return;
            }
        };

        let share_msg = SignedHashMsg {
            state_output_id: *batch.state_output(),
            orig_timestamp: timestamp,
            batch_hash,
            essence_hash,
            sig_share: own_share.clone(),
        };
        let processed = ProcessedBatch {
            batch,
            orig_timestamp: timestamp,
            batch_hash,
            essence: outcome.essence,
            essence_hash,
            state_updates: outcome.state_updates,
        };
        let early = self
            .round
            .finish_processing(processed, &self.self_location, own_share);
        self.link.broadcast(&share_msg);

        for (sender, msg) in early {
            self.offer_share(&sender, msg);
        }
        self.try_finalize().await;
    }

    fn offer_share(&mut self, sender: &str, msg: SignedHashMsg) {
        let signer = self.signer.clone();
        let outcome = self
            .round
            .offer_share(sender, msg, |data, share| signer.verify_share(sender, data, share));
        match outcome {
            ShareOutcome::Accepted => {
                debug!(sender = %sender, shares = self.round.share_count(), "Share accepted")
            }
            ShareOutcome::Buffered => debug!(sender = %sender, "Share buffered until processed"),
            ShareOutcome::Duplicate | ShareOutcome::Stale => {}
            ShareOutcome::Rejected(reason) => {
                warn!(sender = %sender, reason = %reason, "Share rejected");
                metrics::record_share_rejected(&reason.to_string());
                self.emit(ConsensusEvent::ShareRejected {
                    sender: sender.to_string(),
                    reason,
                });
            }
        }
    }

    async fn try_finalize(&mut self) {
        if !self.round.has_quorum(self.threshold) {
            return;
        }
        let Some(processed) = self.round.processed() else {
            return;
        };
        let essence = processed.essence.clone();
        let signature = match self
            .signer
            .aggregate(&processed.essence_hash, &self.round.shares())
        {
            Ok(signature) => signature,
            Err(e) => {
                self.fail(ConsensusError::AggregationFailed(e));
                return;
            }
        };
        match self.poster.post_and_confirm(&essence, &signature).await {
            Ok(tx_id) => self.commit(tx_id),
            Err(e) => self.fail(ConsensusError::PostingFailed(e)),
        }
    }

    async fn on_result_posted(&mut self, msg: NotifyFinalResultPostedMsg) {
        if self.round.phase() != RoundPhase::AwaitingQuorum {
            debug!(phase = ?self.round.phase(), tx_id = %msg.tx_id, "Result notice ignored");
            return;
        }
        match self.poster.is_confirmed(&msg.tx_id).await {
            Ok(true) => self.commit(msg.tx_id),
            Ok(false) => debug!(tx_id = %msg.tx_id, "Posted result not confirmed yet"),
            Err(e) => warn!(tx_id = %msg.tx_id, error = %e, "Result confirmation query failed"),
        }
    }

    fn commit(&mut self, tx_id: TransactionId) {
        let state_output = *self.round.state_output();
        let Some(processed) = self.round.commit() else {
            return;
        };
        let approving = OutputId::new(tx_id, 0);
        let appended = self
            .blocks
            .write()
            .append_committed(approving, processed.state_updates);
        let header = match appended {
            Ok(header) => header,
            Err(e) => {
                self.fail(e.into());
                return;
            }
        };
        self.publish_status();

        metrics::record_round_committed();
        info!(
            state_output = %state_output,
            tx_id = %tx_id,
            block_index = header.block_index,
            "Round committed"
        );
        self.link.broadcast(&NotifyFinalResultPostedMsg {
            state_output_id: state_output,
            tx_id,
        });
        self.emit(ConsensusEvent::Committed {
            state_output,
            tx_id,
            block_index: header.block_index,
        });

        self.retire(state_output);
        self.round = Round::new(approving);
    }

    fn on_deadline(&mut self) {
        if !self.round.is_expired(Instant::now()) {
            return;
        }
        let state_output = *self.round.state_output();
        let shares = self.round.share_count();
        warn!(
            state_output = %state_output,
            shares,
            threshold = self.threshold,
            "Quorum not reached in time"
        );
        metrics::record_quorum_timeout();
        self.round = Round::new(state_output);
        self.emit(ConsensusEvent::Failed(ConsensusError::QuorumProcessingTimeout {
            state_output,
            shares,
            threshold: self.threshold,
        }));
    }

    // =========================================================================
    // BLOCK SYNC
    // =========================================================================

    fn request_sync(&self) {
        let height = self.blocks.read().height();
        self.link.broadcast(&BlockIndexPingPongMsg {
            block_index: height,
            rsvp: true,
        });
    }

    fn on_ping_pong(&mut self, sender: &str, msg: BlockIndexPingPongMsg) {
        let height = self.blocks.read().height();
        if msg.rsvp {
            self.link.send_to(
                sender,
                &BlockIndexPingPongMsg {
                    block_index: height,
                    rsvp: false,
                },
            );
        }
        if msg.block_index > height {
            debug!(peer = %sender, peer_height = msg.block_index, height, "Peer is ahead");
            self.sync_source = Some((sender.to_string(), msg.block_index));
            self.link.send_to(
                sender,
                &GetBlockMsg {
                    block_index: height + 1,
                },
            );
        }
    }

    fn serve_block(&self, sender: &str, block_index: u32) {
        let block = {
            let log = self.blocks.read();
            log.header(block_index)
                .copied()
                .zip(log.updates(block_index).map(<[StateUpdate]>::to_vec))
        };
        let Some((header, updates)) = block else {
            debug!(peer = %sender, block_index, "Requested block not available");
            return;
        };
        self.link.send_to(sender, &BlockHeaderMsg { header });
        for (index_in_block, state_update) in (0u16..).zip(updates) {
            self.link.send_to(
                sender,
                &StateUpdateMsg {
                    block_index,
                    state_update,
                    index_in_block,
                },
            );
        }
    }

    fn on_block_header(&mut self, sender: &str, header: BlockHeader) {
        let next = self.blocks.read().next_index();
        if header.block_index != next {
            debug!(block_index = header.block_index, next, "Ignoring block header");
            return;
        }
        self.assembly = Some(BlockAssembly::new(header));
        self.try_append_assembly(sender);
    }

    fn on_state_update(&mut self, sender: &str, msg: StateUpdateMsg) {
        match self.assembly.as_mut() {
            Some(assembly) if assembly.block_index() == msg.block_index => {
                if !assembly.add(msg.index_in_block, msg.state_update) {
                    debug!(
                        block_index = msg.block_index,
                        index_in_block = msg.index_in_block,
                        "State update outside block"
                    );
                    return;
                }
            }
            _ => {
                debug!(block_index = msg.block_index, "No block being assembled");
                return;
            }
        }
        self.try_append_assembly(sender);
    }

    fn try_append_assembly(&mut self, sender: &str) {
        if !self.assembly.as_ref().is_some_and(BlockAssembly::is_complete) {
            return;
        }
        let Some(assembly) = self.assembly.take() else {
            return;
        };
        let (header, updates) = assembly.into_parts();
        if let Err(e) = self.blocks.write().append(header, updates) {
            warn!(peer = %sender, error = %e, "Synced block rejected");
            return;
        }
        info!(peer = %sender, block_index = header.block_index, "Block synced");
        self.emit(ConsensusEvent::BlockSynced {
            block_index: header.block_index,
        });

        let height = header.block_index;
        match self.sync_source.clone() {
            Some((peer, target)) if target > height => {
                self.link.send_to(
                    &peer,
                    &GetBlockMsg {
                        block_index: height + 1,
                    },
                );
            }
            _ => self.sync_source = None,
        }
    }

    // =========================================================================
    // OUTPUT
    // =========================================================================

    fn emit(&self, event: ConsensusEvent) {
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }

    fn fail(&self, err: ConsensusError) {
        warn!(state_output = %self.round.state_output(), error = %err, "Round failed");
        self.emit(ConsensusEvent::Failed(err));
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(RoundStatus {
            state_output: *self.round.state_output(),
            phase: self.round.phase(),
            shares: self.round.share_count(),
            height: self.blocks.read().height(),
        });
    }
}

/// A round message waiting for its state output.
struct HeldMessage {
    sender: String,
    timestamp: i64,
    message: ChainMessage,
}

/// State output a round message refers to; block-sync messages have none.
fn round_output(message: &ChainMessage) -> Option<OutputId> {
    match message {
        ChainMessage::NotifyRequests(msg) => Some(msg.state_output_id),
        ChainMessage::StartProcessingBatch(msg) => Some(msg.state_output_id),
        ChainMessage::SignedHash(msg) => Some(msg.state_output_id),
        ChainMessage::NotifyFinalResultPosted(msg) => Some(msg.state_output_id),
        ChainMessage::GetBlock(_)
        | ChainMessage::BlockHeader(_)
        | ChainMessage::StateUpdate(_)
        | ChainMessage::BlockIndexPingPong(_) => None,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Front end of a running [`ConsensusService`]. Dropping it detaches the
/// service from the network, which stops the actor.
pub struct ConsensusHandle {
    tx: mpsc::Sender<ConsensusInput>,
    status: watch::Receiver<RoundStatus>,
    events: broadcast::Sender<ConsensusEvent>,
    blocks: Arc<RwLock<BlockLog>>,
    link: Arc<CommitteeLink>,
    attach_ids: Vec<AttachId>,
}

impl ConsensusHandle {
    pub fn status(&self) -> RoundStatus {
        self.status.borrow().clone()
    }

    /// Receiver notified after every handled input.
    pub fn status_watch(&self) -> watch::Receiver<RoundStatus> {
        self.status.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsensusEvent> {
        self.events.subscribe()
    }

    pub fn height(&self) -> u32 {
        self.blocks.read().height()
    }

    pub fn block(&self, block_index: u32) -> Option<(BlockHeader, Vec<StateUpdate>)> {
        let log = self.blocks.read();
        let header = *log.header(block_index)?;
        let updates = log.updates(block_index)?.to_vec();
        Some((header, updates))
    }

    pub fn self_location(&self) -> &str {
        self.link.self_location()
    }

    /// The ledger reports a new state output for the chain.
    pub async fn state_transition(&self, state_output: OutputId) -> ConsensusResult<()> {
        self.submit(ConsensusInput::StateTransition { state_output })
            .await
    }

    /// Ask the committee for its heights and fetch missing blocks.
    pub async fn request_sync(&self) -> ConsensusResult<()> {
        self.submit(ConsensusInput::Sync).await
    }

    /// Announce `request_ids` for the current state output to the whole
    /// committee. An empty list is a heartbeat.
    pub async fn notify_requests(&self, request_ids: Vec<RequestId>) -> ConsensusResult<()> {
        let msg = NotifyReqMsg {
            state_output_id: self.status().state_output,
            request_ids,
        };
        self.send_everywhere(msg).await
    }

    /// Start a batch on the current state output, here and on every peer.
    ///
    /// All peers process it with the same timestamp.
    pub async fn propose_batch(
        &self,
        request_ids: Vec<RequestId>,
        fee_destination: AgentId,
    ) -> ConsensusResult<()> {
        let msg = StartProcessingBatchMsg {
            state_output_id: self.status().state_output,
            request_ids,
            fee_destination,
        };
        self.send_everywhere(msg).await
    }

    async fn send_everywhere<M>(&self, msg: M) -> ConsensusResult<()>
    where
        M: PeerMessage + Into<ChainMessage>,
    {
        let data = self.link.envelope(&msg)?;
        self.link.broadcast_data(&data);
        self.submit(ConsensusInput::Peer {
            sender: self.link.self_location().to_string(),
            timestamp: data.timestamp,
            message: msg.into(),
        })
        .await
    }

    async fn submit(&self, input: ConsensusInput) -> ConsensusResult<()> {
        self.tx
            .send(input)
            .await
            .map_err(|_| ConsensusError::ServiceStopped)
    }
}

impl Drop for ConsensusHandle {
    fn drop(&mut self) {
        self.link.detach(&self.attach_ids);
    }
}
