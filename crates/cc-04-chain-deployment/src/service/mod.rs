//! # Chain Deployer
//!
//! Runs the deployment workflow against the ledger and node API ports.
//! Calls on one deployer are serialized, DKG included.


use crate::config::CommitteeConfig;
use crate::domain::error::{DeploymentError, DeploymentResult, DeploymentStep};
use crate::domain::transaction::{
    chain_origin_transaction, originator_address, root_init_request_transaction, LedgerOutput,
};
use crate::ports::{LedgerClient, NodeApiClient, SystemTimeSource, TimeSource};
use crate::progress::{NullProgress, Progress, ProgressSink};
use cc_03_dkg::DkgOrchestrator;
use ed25519_dalek::SigningKey;
use shared_types::{Address, ChainId, ChainRecord, CommitteeRecord, RequestId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// Inputs of one deployment.
pub struct CreateChainParams {
    /// Node API endpoints, one per committee member.
    pub committee_api_hosts: Vec<String>,
    /// Peering locations, one per committee member.
    pub committee_peering_hosts: Vec<String>,
    pub n: u16,
    pub t: u16,
    /// Funds the deployment and signs both transactions.
    pub originator: SigningKey,
    pub description: String,
    pub progress: Arc<dyn ProgressSink>,
    /// Put in front of every progress line.
    pub prefix: String,
}

impl CreateChainParams {
    /// N, T and description from `config`; silent progress.
    pub fn from_config(
        config: &CommitteeConfig,
        committee_api_hosts: Vec<String>,
        committee_peering_hosts: Vec<String>,
        originator: SigningKey,
    ) -> Self {
        Self {
            committee_api_hosts,
            committee_peering_hosts,
            n: config.committee_size,
            t: config.threshold,
            originator,
            description: config.description.clone(),
            progress: Arc::new(NullProgress),
            prefix: String::new(),
        }
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>, prefix: impl Into<String>) -> Self {
        self.progress = sink;
        self.prefix = prefix.into();
        self
    }

    fn validate(&self) -> DeploymentResult<()> {
        let reason = if self.committee_api_hosts.is_empty() {
            "no committee API hosts".to_string()
        } else if self.committee_peering_hosts.len() != usize::from(self.n) {
            format!(
                "{} peering hosts for committee of {}",
                self.committee_peering_hosts.len(),
                self.n
            )
        } else if self.t == 0 || self.t > self.n {
            format!("threshold {} out of range 1..={}", self.t, self.n)
        } else {
            return Ok(());
        };
        Err(DeploymentError::InvalidParameters { reason })
    }
}

pub struct ChainDeployer {
    ledger: Arc<dyn LedgerClient>,
    nodes: Arc<dyn NodeApiClient>,
    dkg: DkgOrchestrator,
    time: Arc<dyn TimeSource>,
    dkg_timeout: Duration,
    quorum_timeout: Duration,
    poll_interval: Duration,
    in_progress: Mutex<()>,
}

impl ChainDeployer {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        nodes: Arc<dyn NodeApiClient>,
        dkg: DkgOrchestrator,
        config: &CommitteeConfig,
    ) -> Self {
        Self {
            ledger,
            nodes,
            dkg,
            time: Arc::new(SystemTimeSource),
            dkg_timeout: config.dkg_timeout,
            quorum_timeout: config.quorum_timeout,
            poll_interval: config.poll_interval,
            in_progress: Mutex::new(()),
        }
    }

    pub fn with_time_source(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.time = time;
        self
    }

    /// Run DKG for a control address, then deploy on it.
    pub async fn deploy_chain_with_dkg(
        &self,
        params: &CreateChainParams,
    ) -> DeploymentResult<(ChainId, Address)> {
        params.validate()?;
        let _guard = self.in_progress.lock().await;
        let control_address = self
            .dkg
            .run_dkg(
                &params.committee_api_hosts,
                &params.committee_peering_hosts,
                params.t,
                Some(self.dkg_timeout),
            )
            .await?;
        let chain_id = self.run_steps(params, control_address).await?;
        Ok((chain_id, control_address))
    }

    /// Deploy a chain controlled by `control_address`.
    pub async fn deploy_chain(
        &self,
        params: &CreateChainParams,
        control_address: Address,
    ) -> DeploymentResult<ChainId> {
        params.validate()?;
        let _guard = self.in_progress.lock().await;
        self.run_steps(params, control_address).await
    }

    /// Steps 1..8. Callers hold `in_progress`.
    async fn run_steps(
        &self,
        params: &CreateChainParams,
        control_address: Address,
    ) -> DeploymentResult<ChainId> {
        let progress = Progress::new(params.progress.as_ref(), &params.prefix);
        let originator = originator_address(&params.originator);
        info!(
            originator = %originator,
            control_address = %control_address,
            n = params.n,
            t = params.t,
            "Deploying chain"
        );
        progress.say(&format!(
            "creating new chain. Owner address is {originator}. Parameters N = {}, T = {}",
            params.n, params.t
        ));

        // 1. Committee record on every node.
        let committee = CommitteeRecord {
            address: control_address,
            nodes: params.committee_peering_hosts.clone(),
        };
        for endpoint in &params.committee_api_hosts {
            if let Err(reason) = self.nodes.put_committee_record(endpoint, &committee).await {
                let err = DeploymentError::CommitteeRecordDistributionFailed {
                    endpoint: endpoint.clone(),
                    reason,
                };
                return Err(self.fail(&progress, "sending committee record to nodes", err));
            }
        }
        progress.ok("sending committee record to nodes");

        // 2. Originator funds.
        let outputs = self
            .fetch_outputs(&originator, DeploymentStep::FetchOutputs)
            .await
            .map_err(|e| self.fail(&progress, "requesting owner address' outputs from ledger", e))?;
        progress.ok("requesting owner address' outputs from ledger");

        // 3. Origin transaction.
        let (origin_tx, chain_id) = chain_origin_transaction(
            &params.originator,
            control_address,
            self.time.now_nanos(),
            &outputs,
        )
        .map_err(|e| {
            let err = DeploymentError::OriginTransactionFailed {
                reason: e.to_string(),
            };
            self.fail(&progress, "creating origin transaction", err)
        })?;
        progress.ok(&format!(
            "creating origin transaction. Origin txid = {}",
            origin_tx.id()
        ));

        if let Err(reason) = self.ledger.submit_and_wait_for_confirmation(&origin_tx).await {
            let err = DeploymentError::OriginTransactionFailed { reason };
            return Err(self.fail(&progress, "posting origin transaction", err));
        }
        progress.ok(&format!("posting origin transaction. txid: {}", origin_tx.id()));
        debug!(chain_id = %chain_id, origin_tx = %origin_tx.id(), "Origin confirmed");

        // 4. Chain record on every node.
        let record = ChainRecord::new(chain_id);
        for endpoint in &params.committee_api_hosts {
            if let Err(reason) = self.nodes.put_chain_record(endpoint, &record).await {
                let err = DeploymentError::ChainRecordDistributionFailed {
                    endpoint: endpoint.clone(),
                    reason,
                };
                return Err(self.fail(&progress, "sending chain data to nodes", err));
            }
        }
        progress.ok("sending chain data to nodes");

        // 5. Activation.
        for endpoint in &params.committee_api_hosts {
            if let Err(reason) = self.nodes.activate_chain(endpoint, &chain_id).await {
                let err = DeploymentError::ChainActivationFailed {
                    endpoint: endpoint.clone(),
                    reason,
                };
                return Err(self.fail(&progress, "activating chain", err));
            }
        }
        progress.ok("activating chain");

        // 6. Funds again: the origin transaction spent the previous set.
        let outputs = self
            .fetch_outputs(&originator, DeploymentStep::RefetchOutputs)
            .await
            .map_err(|e| self.fail(&progress, "requesting owner address' outputs from ledger", e))?;

        // 7. Root init request. Whoever gets it processed first owns the chain.
        let request_tx = root_init_request_transaction(
            &params.originator,
            &chain_id,
            &params.description,
            self.time.now_nanos(),
            &outputs,
        )
        .map_err(|e| {
            let err = DeploymentError::RootInitFailed {
                reason: e.to_string(),
            };
            self.fail(&progress, "creating root init request", err)
        })?;
        let request_id = RequestId::new(request_tx.id(), 0);
        progress.ok("creating root init request");
        progress.say(&format!(
            "root init txid: {}, request id: {request_id}",
            request_tx.id()
        ));

        if let Err(reason) = self.ledger.submit_and_wait_for_confirmation(&request_tx).await {
            let err = DeploymentError::RootInitFailed { reason };
            return Err(self.fail(&progress, "posting root init request transaction", err));
        }
        progress.ok(&format!("posting root init request. txid: {}", request_tx.id()));

        // 8. Wait for every node to process it.
        if let Err(err) = self
            .await_processed(&params.committee_api_hosts, &chain_id, &request_id)
            .await
        {
            return Err(self.fail(&progress, "waiting root init request transaction", err));
        }

        progress.say(&format!(
            "chain has been created successfully. ChainID: {chain_id}, State address: {control_address}, N = {}, T = {}",
            params.n, params.t
        ));
        info!(chain_id = %chain_id, "Chain deployed");
        Ok(chain_id)
    }

    async fn fetch_outputs(
        &self,
        owner: &Address,
        step: DeploymentStep,
    ) -> DeploymentResult<Vec<LedgerOutput>> {
        self.ledger
            .get_confirmed_outputs(owner)
            .await
            .map_err(|reason| DeploymentError::OutputFetchFailed { step, reason })
    }

    /// Poll until every endpoint reports `request_id` processed.
    async fn await_processed(
        &self,
        endpoints: &[String],
        chain_id: &ChainId,
        request_id: &RequestId,
    ) -> DeploymentResult<()> {
        let deadline = Instant::now() + self.quorum_timeout;
        let mut pending: Vec<String> = endpoints.to_vec();

        loop {
            let mut still_pending = Vec::with_capacity(pending.len());
            for endpoint in pending {
                let query = self.nodes.is_request_processed(&endpoint, chain_id, request_id);
                match timeout_at(deadline, query).await {
                    Ok(Ok(true)) => {
                        debug!(endpoint = %endpoint, request = %request_id.short(), "Processed")
                    }
                    Ok(Ok(false)) => still_pending.push(endpoint),
                    Ok(Err(e)) => {
                        debug!(endpoint = %endpoint, error = %e, "Processing query failed");
                        still_pending.push(endpoint);
                    }
                    Err(_) => {
                        debug!(endpoint = %endpoint, "Processing query outlived the deadline");
                        still_pending.push(endpoint);
                    }
                }
            }
            pending = still_pending;

            if pending.is_empty() {
                return Ok(());
            }
            if Instant::now() + self.poll_interval > deadline {
                return Err(DeploymentError::QuorumProcessingTimeout { pending });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn fail(&self, progress: &Progress<'_>, what: &str, err: DeploymentError) -> DeploymentError {
        progress.failed(what, &err);
        warn!(step = %err.step(), error = %err, "Deployment failed");
        err
    }
}
