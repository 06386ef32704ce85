//! Decoding by out-of-band type byte.

use crate::codec::PeerMessage;
use crate::messages::*;
use crate::msg_types;
use shared_types::WireError;

/// Any peer message, tagged by type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainMessage {
    NotifyRequests(NotifyReqMsg),
    NotifyFinalResultPosted(NotifyFinalResultPostedMsg),
    StartProcessingBatch(StartProcessingBatchMsg),
    SignedHash(SignedHashMsg),
    GetBlock(GetBlockMsg),
    BlockHeader(BlockHeaderMsg),
    StateUpdate(StateUpdateMsg),
    BlockIndexPingPong(BlockIndexPingPongMsg),
}

impl ChainMessage {
    /// Decode `payload` as the message identified by `msg_type`.
    pub fn decode(msg_type: u8, payload: &[u8]) -> Result<Self, WireError> {
        let msg = match msg_type {
            msg_types::NOTIFY_REQUESTS => Self::NotifyRequests(NotifyReqMsg::from_bytes(payload)?),
            msg_types::NOTIFY_FINAL_RESULT_POSTED => {
                Self::NotifyFinalResultPosted(NotifyFinalResultPostedMsg::from_bytes(payload)?)
            }
            msg_types::START_PROCESSING_BATCH => {
                Self::StartProcessingBatch(StartProcessingBatchMsg::from_bytes(payload)?)
            }
            msg_types::SIGNED_HASH => Self::SignedHash(SignedHashMsg::from_bytes(payload)?),
            msg_types::GET_BLOCK => Self::GetBlock(GetBlockMsg::from_bytes(payload)?),
            msg_types::BLOCK_HEADER => Self::BlockHeader(BlockHeaderMsg::from_bytes(payload)?),
            msg_types::STATE_UPDATE => Self::StateUpdate(StateUpdateMsg::from_bytes(payload)?),
            msg_types::BLOCK_INDEX_PING_PONG => {
                Self::BlockIndexPingPong(BlockIndexPingPongMsg::from_bytes(payload)?)
            }
            other => return Err(WireError::UnknownMessageType(other)),
        };
        Ok(msg)
    }

    pub fn msg_type(&self) -> u8 {
        match self {
            Self::NotifyRequests(_) => NotifyReqMsg::MSG_TYPE,
            Self::NotifyFinalResultPosted(_) => NotifyFinalResultPostedMsg::MSG_TYPE,
            Self::StartProcessingBatch(_) => StartProcessingBatchMsg::MSG_TYPE,
            Self::SignedHash(_) => SignedHashMsg::MSG_TYPE,
            Self::GetBlock(_) => GetBlockMsg::MSG_TYPE,
            Self::BlockHeader(_) => BlockHeaderMsg::MSG_TYPE,
            Self::StateUpdate(_) => StateUpdateMsg::MSG_TYPE,
            Self::BlockIndexPingPong(_) => BlockIndexPingPongMsg::MSG_TYPE,
        }
    }

    /// Body bytes, without the type byte.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        match self {
            Self::NotifyRequests(m) => m.to_bytes(),
            Self::NotifyFinalResultPosted(m) => m.to_bytes(),
            Self::StartProcessingBatch(m) => m.to_bytes(),
            Self::SignedHash(m) => m.to_bytes(),
            Self::GetBlock(m) => m.to_bytes(),
            Self::BlockHeader(m) => m.to_bytes(),
            Self::StateUpdate(m) => m.to_bytes(),
            Self::BlockIndexPingPong(m) => m.to_bytes(),
        }
    }
}

macro_rules! impl_from_msg {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(impl From<$ty> for ChainMessage {
            fn from(m: $ty) -> Self {
                Self::$variant(m)
            }
        })*
    };
}

impl_from_msg!(
    NotifyRequests(NotifyReqMsg),
    NotifyFinalResultPosted(NotifyFinalResultPostedMsg),
    StartProcessingBatch(StartProcessingBatchMsg),
    SignedHash(SignedHashMsg),
    GetBlock(GetBlockMsg),
    BlockHeader(BlockHeaderMsg),
    StateUpdate(StateUpdateMsg),
    BlockIndexPingPong(BlockIndexPingPongMsg),
);
