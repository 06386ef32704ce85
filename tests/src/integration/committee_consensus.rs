//! # Committee Consensus
//!
//! Batch consensus (cc-05) for several chains over one in-memory peering
//! network (cc-01), with Ed25519 key shares standing in for the threshold
//! scheme.
//!
//! ## Flow Tested:
//!
//! 1. **Isolation**: two committees sharing nodes commit independently
//! 2. **Share checks**: a forged share never counts toward T
//! 3. **Rejoin**: a restarted member syncs missing blocks and joins the next round
//! 4. **Metrics**: round counters reach the Prometheus export

#[cfg(test)]
mod tests {
    use super::super::fixtures::init_test_logging;
    use async_trait::async_trait;
    use cc_01_peering::{InMemoryNetworkProvider, InMemoryPeeringNetwork};
    use cc_05_batch_consensus::{
        BatchOutcome, BatchProcessor, Committee, ConsensusConfig, ConsensusDependencies,
        ConsensusError, ConsensusEvent, ConsensusHandle, ConsensusService, ResultPoster,
        ShareRejection, ThresholdSigner,
    };
    use committee_telemetry::encode_metrics;
    use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
    use parking_lot::Mutex;
    use shared_types::{
        hash_data, Address, AgentId, Batch, ChainId, HashValue, Mutation, OutputId, RequestId,
        StateUpdate, TransactionId,
    };
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast;
    use tokio::sync::broadcast::error::RecvError;
    use tokio::time::timeout;

    const NODES: [&str; 4] = ["node-0", "node-1", "node-2", "node-3"];

    // =============================================================================
    // PORTS
    // =============================================================================

    /// Appends every request id under a `last` key.
    struct RecordingProcessor;

    #[async_trait]
    impl BatchProcessor for RecordingProcessor {
        async fn process(&self, batch: &Batch, timestamp: i64) -> Result<BatchOutcome, String> {
            let state_updates = batch
                .request_ids()
                .iter()
                .map(|id| {
                    StateUpdate::new(*id, timestamp).with_mutation(Mutation::Set {
                        key: b"last".to_vec(),
                        value: id.as_bytes().to_vec(),
                    })
                })
                .collect();
            Ok(BatchOutcome {
                essence: hash_data(&[&batch.hash().0, &timestamp.to_le_bytes()]).0.to_vec(),
                state_updates,
            })
        }
    }

    fn node_key(location: &str) -> SigningKey {
        SigningKey::from_bytes(&hash_data(&[location.as_bytes()]).0)
    }

    struct Ed25519ShareSigner {
        key: SigningKey,
        committee: Arc<HashMap<String, VerifyingKey>>,
        threshold: usize,
    }

    impl ThresholdSigner for Ed25519ShareSigner {
        fn sign_share(&self, data: &HashValue) -> Result<Vec<u8>, String> {
            Ok(self.key.sign(&data.0).to_bytes().to_vec())
        }

        fn verify_share(&self, signer: &str, data: &HashValue, share: &[u8]) -> bool {
            let Some(key) = self.committee.get(signer) else {
                return false;
            };
            Signature::from_slice(share).is_ok_and(|sig| key.verify(&data.0, &sig).is_ok())
        }

        fn aggregate(&self, data: &HashValue, shares: &[(String, Vec<u8>)]) -> Result<Vec<u8>, String> {
            if shares.len() < self.threshold {
                return Err(format!("{} of {} shares", shares.len(), self.threshold));
            }
            Ok(hash_data(&[&data.0, b"committee"]).0.to_vec())
        }
    }

    /// One chain's view of the ledger.
    #[derive(Default)]
    struct ChainLedger {
        confirmed: Mutex<HashSet<TransactionId>>,
    }

    #[async_trait]
    impl ResultPoster for ChainLedger {
        async fn post_and_confirm(
            &self,
            essence: &[u8],
            signature: &[u8],
        ) -> Result<TransactionId, String> {
            let tx_id = TransactionId(hash_data(&[essence, signature]).0);
            self.confirmed.lock().insert(tx_id);
            Ok(tx_id)
        }

        async fn is_confirmed(&self, tx_id: &TransactionId) -> Result<bool, String> {
            Ok(self.confirmed.lock().contains(tx_id))
        }
    }

    // =============================================================================
    // CHAIN FIXTURE
    // =============================================================================

    struct TestChain {
        committee: Committee,
        origin: OutputId,
        ledger: Arc<ChainLedger>,
        public_keys: Arc<HashMap<String, VerifyingKey>>,
    }

    impl TestChain {
        fn new(tag: u8, members: &[&str], threshold: u16) -> Self {
            let chain_id = ChainId([tag; 32]);
            let public_keys = members
                .iter()
                .map(|m| (m.to_string(), node_key(m).verifying_key()))
                .collect();
            Self {
                committee: Committee {
                    peering_id: chain_id.peering_id(),
                    members: members.iter().map(|m| m.to_string()).collect(),
                    threshold,
                },
                origin: OutputId::new(TransactionId([tag; 32]), 0),
                ledger: Arc::new(ChainLedger::default()),
                public_keys: Arc::new(public_keys),
            }
        }

        fn join(&self, provider: Arc<InMemoryNetworkProvider>, key: SigningKey) -> ConsensusHandle {
            let deps = ConsensusDependencies {
                processor: Arc::new(RecordingProcessor),
                signer: Arc::new(Ed25519ShareSigner {
                    key,
                    committee: self.public_keys.clone(),
                    threshold: usize::from(self.committee.threshold),
                }),
                poster: self.ledger.clone(),
                provider,
                config: ConsensusConfig {
                    quorum_timeout: Duration::from_secs(3),
                    ..ConsensusConfig::default()
                },
            };
            ConsensusService::spawn(deps, self.committee.clone(), self.origin).unwrap()
        }

        fn join_honest(&self, network: &InMemoryPeeringNetwork, index: usize) -> ConsensusHandle {
            self.join(network.provider(index).unwrap(), node_key(NODES[index]))
        }
    }

    fn fee() -> AgentId {
        AgentId::new(Address::ed25519(&[3u8; 32]), 0)
    }

    async fn next_event(
        events: &mut broadcast::Receiver<ConsensusEvent>,
        matches: impl Fn(&ConsensusEvent) -> bool,
    ) -> ConsensusEvent {
        timeout(Duration::from_secs(10), async {
            loop {
                match events.recv().await {
                    Ok(event) if matches(&event) => return event,
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => panic!("event stream closed"),
                }
            }
        })
        .await
        .expect("expected event not published")
    }

    async fn committed(events: &mut broadcast::Receiver<ConsensusEvent>) -> (TransactionId, u32) {
        match next_event(events, |e| matches!(e, ConsensusEvent::Committed { .. })).await {
            ConsensusEvent::Committed {
                tx_id, block_index, ..
            } => (tx_id, block_index),
            other => panic!("unexpected event {other:?}"),
        }
    }

    fn last_value(handle: &ConsensusHandle, block_index: u32) -> Vec<u8> {
        let (_, updates) = handle.block(block_index).unwrap();
        match &updates[0].mutations[0] {
            Mutation::Set { value, .. } => value.clone(),
            other => panic!("unexpected mutation {other:?}"),
        }
    }

    // =============================================================================
    // SCENARIOS
    // =============================================================================

    #[tokio::test]
    async fn test_two_chains_share_one_network() {
        init_test_logging();
        let network = InMemoryPeeringNetwork::new(&NODES, 1_000);
        let chain_a = TestChain::new(0xa1, &NODES, 3);
        let chain_b = TestChain::new(0xb2, &NODES[..3], 2);

        let a: Vec<_> = (0..4).map(|i| chain_a.join_honest(&network, i)).collect();
        let b: Vec<_> = (0..3).map(|i| chain_b.join_honest(&network, i)).collect();
        let mut a_events: Vec<_> = a.iter().map(|h| h.subscribe()).collect();
        let mut b_events: Vec<_> = b.iter().map(|h| h.subscribe()).collect();

        let request_a = RequestId::new(TransactionId([0x0a; 32]), 0);
        let request_b = RequestId::new(TransactionId([0x0b; 32]), 0);
        let (ra, rb) = tokio::join!(
            a[0].propose_batch(vec![request_a], fee()),
            b[1].propose_batch(vec![request_b], fee()),
        );
        ra.unwrap();
        rb.unwrap();

        let mut a_txs = HashSet::new();
        for events in a_events.iter_mut() {
            let (tx_id, block_index) = committed(events).await;
            assert_eq!(block_index, 1);
            a_txs.insert(tx_id);
        }
        let mut b_txs = HashSet::new();
        for events in b_events.iter_mut() {
            let (tx_id, block_index) = committed(events).await;
            assert_eq!(block_index, 1);
            b_txs.insert(tx_id);
        }

        // One result per chain, agreed by every member.
        assert_eq!(a_txs.len(), 1);
        assert_eq!(b_txs.len(), 1);
        assert!(a_txs.is_disjoint(&b_txs));

        for handle in &a {
            assert_eq!(last_value(handle, 1), request_a.as_bytes().to_vec());
        }
        for handle in &b {
            assert_eq!(last_value(handle, 1), request_b.as_bytes().to_vec());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_forged_share_never_counts() {
        let network = InMemoryPeeringNetwork::new(&NODES, 1_000);
        let chain = TestChain::new(0xc3, &NODES, 4);

        let mut handles: Vec<_> = (0..3).map(|i| chain.join_honest(&network, i)).collect();
        // node-3 signs with a key the committee does not know.
        handles.push(chain.join(network.provider(3).unwrap(), SigningKey::from_bytes(&[0xee; 32])));
        let mut events = handles[0].subscribe();

        handles[0]
            .propose_batch(vec![RequestId::new(TransactionId([0x0c; 32]), 0)], fee())
            .await
            .unwrap();

        let rejected = next_event(&mut events, |e| {
            matches!(e, ConsensusEvent::ShareRejected { .. })
        })
        .await;
        assert_eq!(
            rejected,
            ConsensusEvent::ShareRejected {
                sender: "node-3".to_string(),
                reason: ShareRejection::InvalidSignature,
            }
        );

        let failed = next_event(&mut events, |e| matches!(e, ConsensusEvent::Failed(_))).await;
        assert_eq!(
            failed,
            ConsensusEvent::Failed(ConsensusError::QuorumProcessingTimeout {
                state_output: chain.origin,
                shares: 3,
                threshold: 4,
            })
        );
        assert!(chain.ledger.confirmed.lock().is_empty());
        assert_eq!(handles[0].height(), 0);
    }

    #[tokio::test]
    async fn test_restarted_member_rejoins() {
        init_test_logging();
        let network = InMemoryPeeringNetwork::new(&NODES[..3], 1_000);
        let chain = TestChain::new(0xd4, &NODES[..3], 2);

        let leader = chain.join_honest(&network, 0);
        let follower = chain.join_honest(&network, 1);
        let mut leader_events = leader.subscribe();

        // Block 1 while node-2 is down.
        leader
            .propose_batch(vec![RequestId::new(TransactionId([0x01; 32]), 0)], fee())
            .await
            .unwrap();
        let (first_tx, _) = committed(&mut leader_events).await;
        let approving = OutputId::new(first_tx, 0);

        let restarted = chain.join_honest(&network, 2);
        let mut restarted_events = restarted.subscribe();
        restarted.request_sync().await.unwrap();
        assert_eq!(
            next_event(&mut restarted_events, |e| {
                matches!(e, ConsensusEvent::BlockSynced { .. })
            })
            .await,
            ConsensusEvent::BlockSynced { block_index: 1 }
        );
        assert_eq!(restarted.block(1), leader.block(1));

        // The ledger reports the current state; the member takes part again.
        restarted.state_transition(approving).await.unwrap();
        let mut status = leader.status_watch();
        timeout(
            Duration::from_secs(5),
            status.wait_for(|s| s.state_output == approving),
        )
        .await
        .unwrap()
        .unwrap();

        let second = RequestId::new(TransactionId([0x02; 32]), 0);
        leader.propose_batch(vec![second], fee()).await.unwrap();

        let (tx_leader, index_leader) = committed(&mut leader_events).await;
        let (tx_restarted, index_restarted) = committed(&mut restarted_events).await;
        assert_eq!((index_leader, index_restarted), (2, 2));
        assert_eq!(tx_leader, tx_restarted);
        assert_eq!(last_value(&restarted, 2), second.as_bytes().to_vec());

        let mut follower_status = follower.status_watch();
        timeout(Duration::from_secs(5), follower_status.wait_for(|s| s.height == 2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(follower.block(2), leader.block(2));
    }

    fn counter_value(text: &str, name: &str) -> f64 {
        text.lines()
            .find(|line| line.starts_with(name) && !line.starts_with('#'))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|value| value.parse().ok())
            .unwrap_or(0.0)
    }

    #[tokio::test]
    async fn test_commits_are_exported_as_metrics() {
        let network = InMemoryPeeringNetwork::new(&NODES[..1], 16);
        let chain = TestChain::new(0xe5, &NODES[..1], 1);
        let handle = chain.join_honest(&network, 0);
        let mut events = handle.subscribe();

        handle
            .propose_batch(vec![RequestId::new(TransactionId([0x0e; 32]), 0)], fee())
            .await
            .unwrap();
        committed(&mut events).await;

        let text = encode_metrics().unwrap();
        assert!(text.contains("# TYPE consensus_rounds_committed_total counter"));
        assert!(counter_value(&text, "consensus_rounds_committed_total") >= 1.0);
    }
}
