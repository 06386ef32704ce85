//! # Deployment Flow
//!
//! Runs DKG (cc-03) and the deployment workflow (cc-04) against a simulated
//! ledger and committee nodes that behave like the real ones: the ledger
//! checks signatures and spends outputs, nodes only process requests for
//! chains they have activated.

#[cfg(test)]
mod tests {
    use super::super::fixtures::init_test_logging;
    use async_trait::async_trait;
    use cc_03_dkg::{
        DkSharesInfo, DkSharesPostRequest, DkgClientError, DkgNodeClient, DkgOrchestrator,
    };
    use cc_04_chain_deployment::{
        originator_address, ChainDeployer, CommitteeConfig, CreateChainParams, DeploymentError,
        DeploymentStep, LedgerClient, LedgerOutput, NodeApiClient, Transaction, WriterProgress,
        DESCRIPTION_VARIABLE, ROOT_INIT_REQUEST_CODE,
    };
    use ed25519_dalek::SigningKey;
    use parking_lot::Mutex;
    use shared_types::{
        hash_data, Address, ChainId, ChainRecord, CommitteeRecord, OutputId, RequestBlock,
        RequestId, TransactionId, WireReader,
    };
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Arc;
    use std::time::Duration;

    // =============================================================================
    // SIMULATED COMMITTEE
    // =============================================================================

    #[derive(Default)]
    struct NodeState {
        committee: Option<CommitteeRecord>,
        chains: HashMap<ChainId, ChainRecord>,
    }

    #[derive(Default)]
    struct Ledger {
        unspent: BTreeMap<OutputId, LedgerOutput>,
        /// Decoded request outputs, by target chain alias.
        requests: HashMap<Address, HashMap<RequestId, RequestBlock>>,
        confirmed: Vec<TransactionId>,
    }

    struct SimulatedCommittee {
        ledger: Mutex<Ledger>,
        nodes: Mutex<HashMap<String, NodeState>>,
        dkg_calls: Mutex<Vec<(String, DkSharesPostRequest)>>,
    }

    impl SimulatedCommittee {
        fn new(endpoints: &[String]) -> Arc<Self> {
            let nodes = endpoints
                .iter()
                .map(|e| (e.clone(), NodeState::default()))
                .collect();
            Arc::new(Self {
                ledger: Mutex::new(Ledger::default()),
                nodes: Mutex::new(nodes),
                dkg_calls: Mutex::new(Vec::new()),
            })
        }

        fn fund(&self, owner: Address, amount: u64) {
            let id = OutputId::new(TransactionId(hash_data(&[&owner.to_bytes()]).0), 0);
            self.ledger.lock().unspent.insert(
                id,
                LedgerOutput {
                    id,
                    address: owner,
                    amount,
                },
            );
        }

        fn balance(&self, owner: &Address) -> u64 {
            self.ledger
                .lock()
                .unspent
                .values()
                .filter(|o| o.address == *owner)
                .map(|o| o.amount)
                .sum()
        }

        fn unspent_at(&self, owner: &Address) -> Vec<LedgerOutput> {
            self.ledger
                .lock()
                .unspent
                .values()
                .filter(|o| o.address == *owner)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl LedgerClient for SimulatedCommittee {
        async fn get_confirmed_outputs(&self, address: &Address) -> Result<Vec<LedgerOutput>, String> {
            Ok(self.unspent_at(address))
        }

        async fn submit_and_wait_for_confirmation(&self, tx: &Transaction) -> Result<(), String> {
            if !tx.verify_signature() {
                return Err("bad signature".to_string());
            }
            let signer = tx.signer_address();
            let mut ledger = self.ledger.lock();
            for input in tx.inputs() {
                match ledger.unspent.get(input) {
                    Some(o) if o.address == signer => {}
                    Some(_) => return Err(format!("input {input} not owned by signer")),
                    None => return Err(format!("input {input} already spent")),
                }
            }
            for input in tx.inputs() {
                ledger.unspent.remove(input);
            }
            for (index, output) in (0u16..).zip(tx.outputs()) {
                let id = tx.output_id(index);
                ledger.unspent.insert(
                    id,
                    LedgerOutput {
                        id,
                        address: output.address,
                        amount: output.amount,
                    },
                );
                let mut r = WireReader::new(&output.payload);
                if let Ok(block) = RequestBlock::read(&mut r) {
                    if r.finish().is_ok() && block.address == output.address {
                        ledger
                            .requests
                            .entry(output.address)
                            .or_default()
                            .insert(RequestId::from(id), block);
                    }
                }
            }
            ledger.confirmed.push(tx.id());
            Ok(())
        }
    }

    #[async_trait]
    impl NodeApiClient for SimulatedCommittee {
        async fn put_committee_record(
            &self,
            endpoint: &str,
            record: &CommitteeRecord,
        ) -> Result<(), String> {
            let mut nodes = self.nodes.lock();
            let node = nodes.get_mut(endpoint).ok_or("connection refused")?;
            node.committee = Some(record.clone());
            Ok(())
        }

        async fn put_chain_record(&self, endpoint: &str, record: &ChainRecord) -> Result<(), String> {
            let mut nodes = self.nodes.lock();
            let node = nodes.get_mut(endpoint).ok_or("connection refused")?;
            node.chains.insert(record.chain_id, record.clone());
            Ok(())
        }

        async fn activate_chain(&self, endpoint: &str, chain_id: &ChainId) -> Result<(), String> {
            let mut nodes = self.nodes.lock();
            let node = nodes.get_mut(endpoint).ok_or("connection refused")?;
            let record = node
                .chains
                .get_mut(chain_id)
                .ok_or_else(|| format!("unknown chain {chain_id}"))?;
            record.active = true;
            Ok(())
        }

        async fn is_request_processed(
            &self,
            endpoint: &str,
            chain_id: &ChainId,
            request_id: &RequestId,
        ) -> Result<bool, String> {
            let active = {
                let nodes = self.nodes.lock();
                let node = nodes.get(endpoint).ok_or("connection refused")?;
                node.chains.get(chain_id).is_some_and(|c| c.active)
            };
            if !active {
                return Ok(false);
            }
            let ledger = self.ledger.lock();
            Ok(ledger
                .requests
                .get(&chain_id.alias_address())
                .is_some_and(|requests| requests.contains_key(request_id)))
        }
    }

    #[async_trait]
    impl DkgNodeClient for SimulatedCommittee {
        async fn post_dk_shares(
            &self,
            endpoint: &str,
            request: DkSharesPostRequest,
        ) -> Result<DkSharesInfo, DkgClientError> {
            if !self.nodes.lock().contains_key(endpoint) {
                return Err(DkgClientError::Transport("connection refused".to_string()));
            }
            let joined = request.peer_locations.join(",");
            let address = Address::threshold(hash_data(&[joined.as_bytes()]).0);
            self.dkg_calls.lock().push((endpoint.to_string(), request));
            Ok(DkSharesInfo {
                address: address.to_string(),
            })
        }
    }

    // =============================================================================
    // FIXTURES
    // =============================================================================

    fn hosts(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}-{i}")).collect()
    }

    fn originator() -> SigningKey {
        SigningKey::from_bytes(&[42u8; 32])
    }

    fn config() -> CommitteeConfig {
        CommitteeConfig {
            committee_size: 4,
            threshold: 3,
            quorum_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(10),
            description: "integration chain".to_string(),
            ..CommitteeConfig::default()
        }
    }

    fn deployer(world: &Arc<SimulatedCommittee>) -> ChainDeployer {
        ChainDeployer::new(
            world.clone(),
            world.clone(),
            DkgOrchestrator::new(world.clone()),
            &config(),
        )
    }

    fn owner() -> Address {
        originator_address(&originator())
    }

    // =============================================================================
    // SCENARIOS
    // =============================================================================

    #[tokio::test]
    async fn test_chain_deployed_end_to_end() {
        init_test_logging();
        let api = hosts("api", 4);
        let peering = hosts("peer", 4);
        let world = SimulatedCommittee::new(&api);
        world.fund(owner(), 10);

        let params = CreateChainParams::from_config(&config(), api.clone(), peering.clone(), originator());
        let (chain_id, control) = deployer(&world).deploy_chain_with_dkg(&params).await.unwrap();

        // DKG ran once, with the committee's peering locations and T.
        let calls = world.dkg_calls.lock().clone();
        assert_eq!(calls.len(), 1);
        assert!(api.contains(&calls[0].0));
        assert_eq!(calls[0].1.peer_locations, peering);
        assert_eq!(calls[0].1.threshold, 3);

        // Every node knows the committee and runs the chain.
        for endpoint in &api {
            let nodes = world.nodes.lock();
            let node = &nodes[endpoint];
            let committee = node.committee.as_ref().unwrap();
            assert_eq!(committee.address, control);
            assert_eq!(committee.nodes, peering);
            assert!(node.chains[&chain_id].active);
        }

        // The chain anchor sits at the control address and names the chain.
        let anchors = world.unspent_at(&control);
        assert_eq!(anchors.len(), 1);
        assert_eq!(ChainId::from_origin_output(&anchors[0].id), chain_id);

        // Two deposits left the originator; the rest came back as change.
        assert_eq!(world.balance(&owner()), 8);
        assert_eq!(world.ledger.lock().confirmed.len(), 2);

        // One request output at the chain alias, seen by the nodes.
        let request = world.unspent_at(&chain_id.alias_address());
        assert_eq!(request.len(), 1);
        let request_id = RequestId::from(request[0].id);
        assert!(world
            .is_request_processed(&api[0], &chain_id, &request_id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_root_init_request_reaches_chain() {
        let api = hosts("api", 4);
        let world = SimulatedCommittee::new(&api);
        world.fund(owner(), 3);

        let control = Address::threshold([8u8; 32]);
        let params = CreateChainParams::from_config(&config(), api, hosts("peer", 4), originator());
        let chain_id = deployer(&world).deploy_chain(&params, control).await.unwrap();

        // Confirmed last: the request transaction, request at output 0.
        let last = *world.ledger.lock().confirmed.last().unwrap();
        let request_id = RequestId::new(last, 0);
        let block = world.ledger.lock().requests[&chain_id.alias_address()][&request_id].clone();
        assert_eq!(block.request_code, ROOT_INIT_REQUEST_CODE);
        assert_eq!(
            block.variables.get(DESCRIPTION_VARIABLE.as_bytes()),
            Some(&b"integration chain".to_vec())
        );

        // Not processed on a node that does not run the chain.
        world.nodes.lock().insert("api-9".to_string(), NodeState::default());
        assert!(!world
            .is_request_processed("api-9", &chain_id, &request_id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unfunded_originator_stops_before_anchoring() {
        let api = hosts("api", 4);
        let world = SimulatedCommittee::new(&api);

        let params = CreateChainParams::from_config(&config(), api.clone(), hosts("peer", 4), originator());
        let err = deployer(&world)
            .deploy_chain(&params, Address::threshold([8u8; 32]))
            .await
            .unwrap_err();

        assert_eq!(err.step(), DeploymentStep::OriginTransaction);
        assert!(matches!(err, DeploymentError::OriginTransactionFailed { .. }));

        // Step 1 already happened and is not rolled back.
        let nodes = world.nodes.lock();
        assert!(api.iter().all(|e| nodes[e].committee.is_some()));
        assert!(api.iter().all(|e| nodes[e].chains.is_empty()));
        assert!(world.ledger.lock().confirmed.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_member_named_in_error() {
        let api = hosts("api", 4);
        // api-2 does not exist in the simulated committee.
        let world = SimulatedCommittee::new(&[api[0].clone(), api[1].clone(), api[3].clone()]);
        world.fund(owner(), 10);

        let params = CreateChainParams::from_config(&config(), api, hosts("peer", 4), originator());
        let err = deployer(&world)
            .deploy_chain(&params, Address::threshold([8u8; 32]))
            .await
            .unwrap_err();

        match err {
            DeploymentError::CommitteeRecordDistributionFailed { endpoint, .. } => {
                assert_eq!(endpoint, "api-2")
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(world.balance(&owner()), 10);
    }

    #[tokio::test]
    async fn test_progress_transcript() {
        let api = hosts("api", 4);
        let world = SimulatedCommittee::new(&api);
        world.fund(owner(), 10);

        let sink = Arc::new(WriterProgress::new(Vec::<u8>::new()));
        let params = CreateChainParams::from_config(&config(), api, hosts("peer", 4), originator())
            .with_progress(sink.clone(), "[deploy] ");
        let chain_id = deployer(&world)
            .deploy_chain(&params, Address::threshold([8u8; 32]))
            .await
            .unwrap();

        drop(params);
        let transcript = String::from_utf8(Arc::try_unwrap(sink).ok().unwrap().into_inner()).unwrap();
        let lines: Vec<&str> = transcript.lines().collect();

        assert!(lines.iter().all(|l| l.starts_with("[deploy] ")));
        assert!(lines[0].contains("creating new chain"));
        assert!(lines[0].contains("N = 4, T = 3"));
        assert!(lines.iter().any(|l| l.ends_with("activating chain.. OK")));
        let last = lines.last().unwrap();
        assert!(last.contains("chain has been created successfully"));
        assert!(last.contains(&chain_id.to_string()));
    }
}
