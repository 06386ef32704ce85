//! # Deployment Transactions
//!
//! Minimal value-transfer transactions: consumed outputs, new outputs with an
//! optional payload, a timestamp and the originator's Ed25519 signature over
//! the essence. The transaction id is the SHA3-256 of the essence.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use shared_types::{
    hash_data, Address, ChainId, HashValue, OutputId, RequestBlock, TransactionId, WireError,
    WireWrite,
};
use thiserror::Error;

/// Amount locked in the chain anchor output.
pub const ORIGIN_DEPOSIT: u64 = 1;

/// Amount attached to a request output.
pub const REQUEST_DEPOSIT: u64 = 1;

/// Request code of the root contract's init entry point.
pub const ROOT_INIT_REQUEST_CODE: u16 = 0;

/// Variable carrying the chain description in the root-init request.
pub const DESCRIPTION_VARIABLE: &str = "description";

/// Marker payload of the origin anchor output.
const ORIGIN_MARKER: &[u8] = b"chain-origin";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionBuildError {
    #[error("No confirmed outputs to consume")]
    NoInputs,

    #[error("Insufficient funds: {available} available, {required} required")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("Encoding error: {0}")]
    Encoding(#[from] WireError),
}

/// A confirmed, unspent output owned by some address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerOutput {
    pub id: OutputId,
    pub address: Address,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: Address,
    pub amount: u64,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    inputs: Vec<OutputId>,
    outputs: Vec<TxOutput>,
    timestamp: i64,
    public_key: [u8; 32],
    signature: [u8; 64],
    id: TransactionId,
}

impl Transaction {
    /// Build and sign.
    pub fn signed(
        key: &SigningKey,
        inputs: Vec<OutputId>,
        outputs: Vec<TxOutput>,
        timestamp: i64,
    ) -> Result<Self, TransactionBuildError> {
        let essence = encode_essence(&inputs, &outputs, timestamp)?;
        let signature = key.sign(&essence).to_bytes();
        let id = TransactionId(hash_data(&[&essence]).0);
        Ok(Self {
            inputs,
            outputs,
            timestamp,
            public_key: key.verifying_key().to_bytes(),
            signature,
            id,
        })
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn inputs(&self) -> &[OutputId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TxOutput] {
        &self.outputs
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Id of output `index` of this transaction.
    pub fn output_id(&self, index: u16) -> OutputId {
        OutputId::new(self.id, index)
    }

    pub fn essence_hash(&self) -> Result<HashValue, WireError> {
        let essence = encode_essence(&self.inputs, &self.outputs, self.timestamp)?;
        Ok(hash_data(&[&essence]))
    }

    /// Check the signature against the embedded public key.
    pub fn verify_signature(&self) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.public_key) else {
            return false;
        };
        let Ok(essence) = encode_essence(&self.inputs, &self.outputs, self.timestamp) else {
            return false;
        };
        key.verify(&essence, &Signature::from_bytes(&self.signature))
            .is_ok()
    }

    /// Address of the signer.
    pub fn signer_address(&self) -> Address {
        Address::ed25519(&self.public_key)
    }
}

fn encode_essence(
    inputs: &[OutputId],
    outputs: &[TxOutput],
    timestamp: i64,
) -> Result<Vec<u8>, WireError> {
    let mut buf = Vec::new();
    buf.write_len16(inputs.len())?;
    for input in inputs {
        input.write(&mut buf);
    }
    buf.write_len16(outputs.len())?;
    for output in outputs {
        output.address.write(&mut buf);
        buf.write_u64(output.amount);
        buf.write_bytes16(&output.payload)?;
    }
    buf.write_i64(timestamp);
    Ok(buf)
}

/// Originator address for `key`.
pub fn originator_address(key: &SigningKey) -> Address {
    Address::ed25519(&key.verifying_key().to_bytes())
}

/// Consume `inputs`, lock [`ORIGIN_DEPOSIT`] at `control_address` as output 0
/// and return the change to the originator.
///
/// The chain id is derived from output 0.
pub fn chain_origin_transaction(
    key: &SigningKey,
    control_address: Address,
    timestamp: i64,
    inputs: &[LedgerOutput],
) -> Result<(Transaction, ChainId), TransactionBuildError> {
    let outputs = spend(
        key,
        inputs,
        TxOutput {
            address: control_address,
            amount: ORIGIN_DEPOSIT,
            payload: ORIGIN_MARKER.to_vec(),
        },
    )?;
    let tx = Transaction::signed(key, input_ids(inputs), outputs, timestamp)?;
    let chain_id = ChainId::from_origin_output(&tx.output_id(0));
    Ok((tx, chain_id))
}

/// Request to the chain's root contract init entry point as output 0.
///
/// Its request id is `RequestId(tx.id(), 0)`.
pub fn root_init_request_transaction(
    key: &SigningKey,
    chain_id: &ChainId,
    description: &str,
    timestamp: i64,
    inputs: &[LedgerOutput],
) -> Result<Transaction, TransactionBuildError> {
    let target = chain_id.alias_address();
    let request = RequestBlock::new(target, ROOT_INIT_REQUEST_CODE)
        .with_variable(DESCRIPTION_VARIABLE, description.as_bytes());
    let outputs = spend(
        key,
        inputs,
        TxOutput {
            address: target,
            amount: REQUEST_DEPOSIT,
            payload: request.to_bytes()?,
        },
    )?;
    Transaction::signed(key, input_ids(inputs), outputs, timestamp)
}

fn input_ids(inputs: &[LedgerOutput]) -> Vec<OutputId> {
    inputs.iter().map(|o| o.id).collect()
}

fn spend(
    key: &SigningKey,
    inputs: &[LedgerOutput],
    first: TxOutput,
) -> Result<Vec<TxOutput>, TransactionBuildError> {
    if inputs.is_empty() {
        return Err(TransactionBuildError::NoInputs);
    }
    let available = inputs.iter().fold(0u64, |acc, o| acc.saturating_add(o.amount));
    if available < first.amount {
        return Err(TransactionBuildError::InsufficientFunds {
            available,
            required: first.amount,
        });
    }
    let change = available - first.amount;
    let mut outputs = vec![first];
    if change > 0 {
        outputs.push(TxOutput {
            address: originator_address(key),
            amount: change,
            payload: Vec::new(),
        });
    }
    Ok(outputs)
}
