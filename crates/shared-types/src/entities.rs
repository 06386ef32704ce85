//! # Core Domain Entities
//!
//! Records and value objects shared between the committee subsystems.
//!
//! ## Clusters
//!
//! - **Registry**: `CommitteeRecord`, `ChainRecord`
//! - **Requests**: `RequestBlock`, `RequestRef`, `Batch`
//! - **Blocks**: `BlockHeader`, `StateUpdate`, `Mutation`

use crate::errors::WireError;
use crate::hashing::hash_data;
use crate::identifiers::{
    Address, AgentId, ChainId, HashValue, OutputId, RequestId, TransactionId,
};
use crate::wire::{WireReader, WireWrite};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// CLUSTER A: REGISTRY RECORDS
// =============================================================================

/// Committee controlling a chain: the DKG address and the peer locations
/// of its members, in committee order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeRecord {
    pub address: Address,
    pub nodes: Vec<String>,
}

/// Chain known to a node. Inert until activated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRecord {
    pub chain_id: ChainId,
    pub active: bool,
}

impl ChainRecord {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            active: false,
        }
    }
}

// =============================================================================
// CLUSTER B: REQUESTS
// =============================================================================

/// Reference to a request output inside a known transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestRef {
    pub tx_id: TransactionId,
    pub index: u16,
}

impl RequestRef {
    pub fn request_id(&self) -> RequestId {
        RequestId::new(self.tx_id, self.index)
    }
}

/// Request identifiers of `refs`, in order.
pub fn take_request_ids(refs: &[RequestRef]) -> Vec<RequestId> {
    refs.iter().map(RequestRef::request_id).collect()
}

/// Request payload carried by a ledger output addressed to a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBlock {
    pub address: Address,
    pub request_code: u16,
    pub variables: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl RequestBlock {
    pub fn new(address: Address, request_code: u16) -> Self {
        Self {
            address,
            request_code,
            variables: BTreeMap::new(),
        }
    }

    pub fn with_variable(mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn write(&self, w: &mut impl WireWrite) -> Result<(), WireError> {
        self.address.write(w);
        w.write_u16(self.request_code);
        w.write_len16(self.variables.len())?;
        for (key, value) in &self.variables {
            w.write_bytes16(key)?;
            w.write_bytes16(value)?;
        }
        Ok(())
    }

    pub fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let address = Address::read(r)?;
        let request_code = r.read_u16()?;
        let count = r.read_u16()?;
        let mut variables = BTreeMap::new();
        for _ in 0..count {
            let key = r.read_bytes16()?;
            let value = r.read_bytes16()?;
            variables.insert(key, value);
        }
        Ok(Self {
            address,
            request_code,
            variables,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        Ok(buf)
    }
}

/// Requests processed together against one state output.
///
/// Never empty: an empty request set is a heartbeat, not a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    state_output: OutputId,
    request_ids: Vec<RequestId>,
    fee_destination: AgentId,
}

impl Batch {
    /// Returns `None` for an empty request set.
    pub fn new(
        state_output: OutputId,
        request_ids: Vec<RequestId>,
        fee_destination: AgentId,
    ) -> Option<Self> {
        if request_ids.is_empty() {
            return None;
        }
        Some(Self {
            state_output,
            request_ids,
            fee_destination,
        })
    }

    pub fn state_output(&self) -> &OutputId {
        &self.state_output
    }

    pub fn request_ids(&self) -> &[RequestId] {
        &self.request_ids
    }

    pub fn fee_destination(&self) -> &AgentId {
        &self.fee_destination
    }

    pub fn len(&self) -> usize {
        self.request_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.request_ids.is_empty()
    }

    /// Hash over state output, request ids (in order) and fee destination.
    pub fn hash(&self) -> HashValue {
        let mut buf = Vec::with_capacity(
            OutputId::LENGTH + self.request_ids.len() * RequestId::LENGTH + AgentId::LENGTH,
        );
        self.state_output.write(&mut buf);
        for id in &self.request_ids {
            id.write(&mut buf);
        }
        self.fee_destination.write(&mut buf);
        hash_data(&[&buf])
    }
}

// =============================================================================
// CLUSTER C: BLOCKS
// =============================================================================

/// Header of a committed block. Indices are sequential from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub block_index: u32,
    /// Number of state updates in the block.
    pub size: u16,
    /// Output produced by the transaction that committed the block.
    pub approving_output_id: OutputId,
}

/// One key mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    Set { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

const MUTATION_SET: u8 = 0;
const MUTATION_DELETE: u8 = 1;

/// Smallest encoding: tag plus an empty length-prefixed key.
const MIN_MUTATION_LEN: usize = 1 + 2;

/// Room for at most `count` mutations, and no more than `remaining` bytes can hold.
fn mutation_capacity(count: u16, remaining: usize) -> usize {
    usize::from(count).min(remaining / MIN_MUTATION_LEN)
}

impl Mutation {
    pub fn key(&self) -> &[u8] {
        match self {
            Mutation::Set { key, .. } | Mutation::Delete { key } => key,
        }
    }

    fn write(&self, w: &mut impl WireWrite) -> Result<(), WireError> {
        match self {
            Mutation::Set { key, value } => {
                w.write_u8(MUTATION_SET);
                w.write_bytes16(key)?;
                w.write_bytes16(value)
            }
            Mutation::Delete { key } => {
                w.write_u8(MUTATION_DELETE);
                w.write_bytes16(key)
            }
        }
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        match r.read_u8()? {
            MUTATION_SET => Ok(Mutation::Set {
                key: r.read_bytes16()?,
                value: r.read_bytes16()?,
            }),
            MUTATION_DELETE => Ok(Mutation::Delete {
                key: r.read_bytes16()?,
            }),
            tag => Err(WireError::InvalidTag {
                field: "mutation",
                tag,
            }),
        }
    }
}

/// Mutations produced by one request, in application order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub request_id: RequestId,
    pub timestamp: i64,
    pub mutations: Vec<Mutation>,
}

impl StateUpdate {
    pub fn new(request_id: RequestId, timestamp: i64) -> Self {
        Self {
            request_id,
            timestamp,
            mutations: Vec::new(),
        }
    }

    pub fn with_mutation(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }

    /// Self-delimiting: the mutation count precedes the mutations.
    pub fn write(&self, w: &mut impl WireWrite) -> Result<(), WireError> {
        self.request_id.write(w);
        w.write_i64(self.timestamp);
        w.write_len16(self.mutations.len())?;
        for m in &self.mutations {
            m.write(w)?;
        }
        Ok(())
    }

    pub fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let request_id = RequestId::read(r)?;
        let timestamp = r.read_i64()?;
        let count = r.read_u16()?;
        let mut mutations = Vec::with_capacity(mutation_capacity(count, r.remaining()));
        for _ in 0..count {
            mutations.push(Mutation::read(r)?);
        }
        Ok(Self {
            request_id,
            timestamp,
            mutations,
        })
    }
}
