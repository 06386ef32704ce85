//! # Identifiers
//!
//! Fixed-width identifiers used by every subsystem: transactions, ledger
//! outputs, requests, chains, addresses and peering scopes.
//!
//! All identifiers are value types compared byte-wise. Integer parts are
//! little-endian, the same byte order as the peer wire protocol.

use crate::errors::{AddressParseError, WireError};
use crate::hashing::hash_data;
use crate::wire::{WireReader, WireWrite};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;
use std::str::FromStr;

/// Size of a SHA3-256 digest.
pub const HASH_SIZE: usize = 32;

/// Size of a ledger transaction identifier.
pub const TRANSACTION_ID_LENGTH: usize = 32;

/// Transaction identifier plus a 16-bit output index.
pub const OUTPUT_ID_LENGTH: usize = TRANSACTION_ID_LENGTH + 2;

/// Requests are named by the output that carries them.
pub const REQUEST_ID_LENGTH: usize = OUTPUT_ID_LENGTH;

/// Kind byte plus a 32-byte digest.
pub const ADDRESS_LENGTH: usize = 1 + HASH_SIZE;

/// Address plus a 32-bit contract hname.
pub const AGENT_ID_LENGTH: usize = ADDRESS_LENGTH + 4;

/// Number of characters of the display form kept by [`RequestId::short`].
const SHORT_ID_PREFIX: usize = 8;

macro_rules! fixed_width_id {
    ($name:ident, $len:expr, $kind:literal) => {
        impl $name {
            pub const LENGTH: usize = $len;

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Build from exactly `LENGTH` bytes.
            pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
                let arr: [u8; $len] =
                    bytes
                        .try_into()
                        .map_err(|_| WireError::MalformedIdentifier {
                            kind: $kind,
                            expected: $len,
                            actual: bytes.len(),
                        })?;
                Ok(Self(arr))
            }

            pub fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
                Ok(Self(r.read_array()?))
            }

            pub fn write(&self, w: &mut impl WireWrite) {
                w.write_raw(&self.0);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(self.0))
            }
        }
    };
}

/// SHA3-256 digest (batch hashes, essence hashes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct HashValue(pub [u8; HASH_SIZE]);

fixed_width_id!(HashValue, HASH_SIZE, "hash");

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Ledger transaction identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TransactionId(pub [u8; TRANSACTION_ID_LENGTH]);

fixed_width_id!(TransactionId, TRANSACTION_ID_LENGTH, "transaction id");

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Ledger output identifier: `transaction id || output index`.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputId(#[serde_as(as = "Bytes")] pub [u8; OUTPUT_ID_LENGTH]);

fixed_width_id!(OutputId, OUTPUT_ID_LENGTH, "output id");

impl OutputId {
    pub fn new(tx_id: TransactionId, index: u16) -> Self {
        Self(join_tx_and_index(&tx_id, index))
    }

    pub fn transaction_id(&self) -> TransactionId {
        TransactionId(split_tx(&self.0))
    }

    pub fn index(&self) -> u16 {
        split_index(&self.0)
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.transaction_id(), self.index())
    }
}

/// Identity of a request: the transaction that carries it and its output position.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(#[serde_as(as = "Bytes")] pub [u8; REQUEST_ID_LENGTH]);

fixed_width_id!(RequestId, REQUEST_ID_LENGTH, "request id");

impl RequestId {
    pub fn new(tx_id: TransactionId, index: u16) -> Self {
        Self(join_tx_and_index(&tx_id, index))
    }

    /// Random transaction part, fixed index. Test fixtures only.
    pub fn random(index: u16) -> Self {
        let mut tx = [0u8; TRANSACTION_ID_LENGTH];
        rand::thread_rng().fill_bytes(&mut tx);
        Self::new(TransactionId(tx), index)
    }

    pub fn transaction_id(&self) -> TransactionId {
        TransactionId(split_tx(&self.0))
    }

    pub fn index(&self) -> u16 {
        split_index(&self.0)
    }

    /// The ledger output carrying this request.
    pub fn output_id(&self) -> OutputId {
        OutputId(self.0)
    }

    /// Truncated display form for log lines. Never compare or route on it.
    pub fn short(&self) -> String {
        let full = self.to_string();
        let prefix: String = full.chars().take(SHORT_ID_PREFIX).collect();
        format!("{prefix}..")
    }
}

impl From<OutputId> for RequestId {
    fn from(id: OutputId) -> Self {
        Self(id.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}", self.index(), self.transaction_id())
    }
}

fn join_tx_and_index(tx_id: &TransactionId, index: u16) -> [u8; OUTPUT_ID_LENGTH] {
    let mut out = [0u8; OUTPUT_ID_LENGTH];
    out[..TRANSACTION_ID_LENGTH].copy_from_slice(&tx_id.0);
    out[TRANSACTION_ID_LENGTH..].copy_from_slice(&index.to_le_bytes());
    out
}

fn split_tx(bytes: &[u8; OUTPUT_ID_LENGTH]) -> [u8; TRANSACTION_ID_LENGTH] {
    let mut tx = [0u8; TRANSACTION_ID_LENGTH];
    tx.copy_from_slice(&bytes[..TRANSACTION_ID_LENGTH]);
    tx
}

fn split_index(bytes: &[u8; OUTPUT_ID_LENGTH]) -> u16 {
    u16::from_le_bytes([
        bytes[TRANSACTION_ID_LENGTH],
        bytes[TRANSACTION_ID_LENGTH + 1],
    ])
}

/// Scope multiplexing independent consensus instances over one transport.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct PeeringId(pub [u8; HASH_SIZE]);

fixed_width_id!(PeeringId, HASH_SIZE, "peering id");

impl PeeringId {
    pub fn random() -> Self {
        let mut id = [0u8; HASH_SIZE];
        rand::thread_rng().fill_bytes(&mut id);
        Self(id)
    }
}

impl fmt::Display for PeeringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0[..8]))
    }
}

/// Chain identifier, derived from the output created by the origin transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ChainId(pub [u8; HASH_SIZE]);

fixed_width_id!(ChainId, HASH_SIZE, "chain id");

impl ChainId {
    pub fn from_origin_output(origin: &OutputId) -> Self {
        Self(hash_data(&[origin.as_bytes()]).0)
    }

    /// Address under which requests to this chain are sent.
    pub fn alias_address(&self) -> Address {
        Address::alias(self.0)
    }

    /// Peering scope used by the chain's committee.
    pub fn peering_id(&self) -> PeeringId {
        PeeringId(self.0)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Address kinds understood by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum AddressKind {
    /// Single-signer Ed25519 key.
    Ed25519 = 0,
    /// Committee key produced by DKG.
    Threshold = 1,
    /// Chain alias.
    Alias = 2,
}

impl TryFrom<u8> for AddressKind {
    type Error = WireError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(AddressKind::Ed25519),
            1 => Ok(AddressKind::Threshold),
            2 => Ok(AddressKind::Alias),
            tag => Err(WireError::InvalidTag {
                field: "address kind",
                tag,
            }),
        }
    }
}

/// Ledger address: kind byte plus 32-byte digest.
///
/// The external representation is the lowercase hex of the 33 wire bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address {
    kind: AddressKind,
    digest: [u8; HASH_SIZE],
}

impl Address {
    pub const LENGTH: usize = ADDRESS_LENGTH;

    pub fn new(kind: AddressKind, digest: [u8; HASH_SIZE]) -> Self {
        Self { kind, digest }
    }

    /// Address controlled by a single Ed25519 key.
    pub fn ed25519(public_key: &[u8; 32]) -> Self {
        Self::new(AddressKind::Ed25519, hash_data(&[public_key]).0)
    }

    pub fn threshold(digest: [u8; HASH_SIZE]) -> Self {
        Self::new(AddressKind::Threshold, digest)
    }

    pub fn alias(digest: [u8; HASH_SIZE]) -> Self {
        Self::new(AddressKind::Alias, digest)
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn digest(&self) -> &[u8; HASH_SIZE] {
        &self.digest
    }

    pub fn to_bytes(&self) -> [u8; ADDRESS_LENGTH] {
        let mut out = [0u8; ADDRESS_LENGTH];
        out[0] = self.kind as u8;
        out[1..].copy_from_slice(&self.digest);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() != ADDRESS_LENGTH {
            return Err(WireError::MalformedIdentifier {
                kind: "address",
                expected: ADDRESS_LENGTH,
                actual: bytes.len(),
            });
        }
        let mut r = WireReader::new(bytes);
        Self::read(&mut r)
    }

    pub fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let kind = AddressKind::try_from(r.read_u8()?)?;
        let digest = r.read_array()?;
        Ok(Self { kind, digest })
    }

    pub fn write(&self, w: &mut impl WireWrite) {
        w.write_raw(&self.to_bytes());
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({:?}:{})", self.kind, hex::encode(self.digest))
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(trimmed).map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        Ok(Self::from_bytes(&bytes)?)
    }
}

/// Address plus contract hname; used as a fee destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId {
    pub address: Address,
    pub hname: u32,
}

impl AgentId {
    pub const LENGTH: usize = AGENT_ID_LENGTH;

    pub fn new(address: Address, hname: u32) -> Self {
        Self { address, hname }
    }

    pub fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let address = Address::read(r)?;
        let hname = r.read_u32()?;
        Ok(Self { address, hname })
    }

    pub fn write(&self, w: &mut impl WireWrite) {
        self.address.write(w);
        w.write_u32(self.hname);
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{:08x}", self.address, self.hname)
    }
}
