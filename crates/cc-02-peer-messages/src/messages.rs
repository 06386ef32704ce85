//! # Message Bodies
//!
//! One struct per message type. Field order below is the wire order.

use crate::codec::PeerMessage;
use crate::msg_types;
use shared_types::{
    AgentId, BlockHeader, HashValue, OutputId, RequestId, StateUpdate, TransactionId, WireError,
    WireReader, WireWrite,
};

// =============================================================================
// BATCH COORDINATION
// =============================================================================

/// Requests this peer has seen for the given state output.
///
/// An empty list is a heartbeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyReqMsg {
    pub state_output_id: OutputId,
    pub request_ids: Vec<RequestId>,
}

impl PeerMessage for NotifyReqMsg {
    const MSG_TYPE: u8 = msg_types::NOTIFY_REQUESTS;

    fn write(&self, buf: &mut Vec<u8>) -> Result<(), WireError> {
        self.state_output_id.write(buf);
        write_request_ids(buf, &self.request_ids)
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            state_output_id: OutputId::read(r)?,
            request_ids: read_request_ids(r)?,
        })
    }
}

/// The result transaction for a state output has been posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyFinalResultPostedMsg {
    pub state_output_id: OutputId,
    pub tx_id: TransactionId,
}

impl PeerMessage for NotifyFinalResultPostedMsg {
    const MSG_TYPE: u8 = msg_types::NOTIFY_FINAL_RESULT_POSTED;

    fn write(&self, buf: &mut Vec<u8>) -> Result<(), WireError> {
        self.state_output_id.write(buf);
        self.tx_id.write(buf);
        Ok(())
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            state_output_id: OutputId::read(r)?,
            tx_id: TransactionId::read(r)?,
        })
    }
}

/// Leader's instruction to process a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartProcessingBatchMsg {
    pub state_output_id: OutputId,
    pub request_ids: Vec<RequestId>,
    pub fee_destination: AgentId,
}

impl PeerMessage for StartProcessingBatchMsg {
    const MSG_TYPE: u8 = msg_types::START_PROCESSING_BATCH;

    fn write(&self, buf: &mut Vec<u8>) -> Result<(), WireError> {
        self.state_output_id.write(buf);
        write_request_ids(buf, &self.request_ids)?;
        self.fee_destination.write(buf);
        Ok(())
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            state_output_id: OutputId::read(r)?,
            request_ids: read_request_ids(r)?,
            fee_destination: AgentId::read(r)?,
        })
    }
}

/// A peer's partial signature over the essence of a processed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHashMsg {
    pub state_output_id: OutputId,
    /// Timestamp of the `StartProcessingBatch` this share answers.
    pub orig_timestamp: i64,
    pub batch_hash: HashValue,
    pub essence_hash: HashValue,
    pub sig_share: Vec<u8>,
}

impl PeerMessage for SignedHashMsg {
    const MSG_TYPE: u8 = msg_types::SIGNED_HASH;

    fn write(&self, buf: &mut Vec<u8>) -> Result<(), WireError> {
        self.state_output_id.write(buf);
        buf.write_i64(self.orig_timestamp);
        self.batch_hash.write(buf);
        self.essence_hash.write(buf);
        buf.write_bytes16(&self.sig_share)
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            state_output_id: OutputId::read(r)?,
            orig_timestamp: r.read_i64()?,
            batch_hash: HashValue::read(r)?,
            essence_hash: HashValue::read(r)?,
            sig_share: r.read_bytes16()?,
        })
    }
}

// =============================================================================
// BLOCK SYNC
// =============================================================================

/// Ask a peer for block `block_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetBlockMsg {
    pub block_index: u32,
}

impl PeerMessage for GetBlockMsg {
    const MSG_TYPE: u8 = msg_types::GET_BLOCK;

    fn write(&self, buf: &mut Vec<u8>) -> Result<(), WireError> {
        buf.write_u32(self.block_index);
        Ok(())
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            block_index: r.read_u32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeaderMsg {
    pub header: BlockHeader,
}

impl PeerMessage for BlockHeaderMsg {
    const MSG_TYPE: u8 = msg_types::BLOCK_HEADER;

    fn write(&self, buf: &mut Vec<u8>) -> Result<(), WireError> {
        buf.write_u32(self.header.block_index);
        buf.write_u16(self.header.size);
        self.header.approving_output_id.write(buf);
        Ok(())
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            header: BlockHeader {
                block_index: r.read_u32()?,
                size: r.read_u16()?,
                approving_output_id: OutputId::read(r)?,
            },
        })
    }
}

/// One state update of a block, with its position in the block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateUpdateMsg {
    pub block_index: u32,
    pub state_update: StateUpdate,
    pub index_in_block: u16,
}

impl PeerMessage for StateUpdateMsg {
    const MSG_TYPE: u8 = msg_types::STATE_UPDATE;

    fn write(&self, buf: &mut Vec<u8>) -> Result<(), WireError> {
        buf.write_u32(self.block_index);
        self.state_update.write(buf)?;
        buf.write_u16(self.index_in_block);
        Ok(())
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            block_index: r.read_u32()?,
            state_update: StateUpdate::read(r)?,
            index_in_block: r.read_u16()?,
        })
    }
}

/// Height announcement. `rsvp` asks the receiver to answer with its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockIndexPingPongMsg {
    pub block_index: u32,
    pub rsvp: bool,
}

impl PeerMessage for BlockIndexPingPongMsg {
    const MSG_TYPE: u8 = msg_types::BLOCK_INDEX_PING_PONG;

    fn write(&self, buf: &mut Vec<u8>) -> Result<(), WireError> {
        buf.write_u32(self.block_index);
        buf.write_bool(self.rsvp);
        Ok(())
    }

    fn read(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            block_index: r.read_u32()?,
            rsvp: r.read_bool()?,
        })
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn write_request_ids(buf: &mut Vec<u8>, ids: &[RequestId]) -> Result<(), WireError> {
    buf.write_len16(ids.len())?;
    for id in ids {
        id.write(buf);
    }
    Ok(())
}

fn read_request_ids(r: &mut WireReader<'_>) -> Result<Vec<RequestId>, WireError> {
    let count = r.read_u16()? as usize;
    // Cap the allocation by what the buffer can actually hold.
    let mut ids = Vec::with_capacity(count.min(r.remaining() / RequestId::LENGTH));
    for _ in 0..count {
        ids.push(RequestId::read(r)?);
    }
    Ok(ids)
}
