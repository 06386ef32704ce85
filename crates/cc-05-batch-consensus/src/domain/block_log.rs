//! # Block Log
//!
//! Append-only list of committed blocks, starting with the origin block 0.
//! Lagging peers rebuild missing blocks from a header followed by its
//! `size` state updates.

use shared_types::{BlockHeader, OutputId, StateUpdate};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockLogError {
    #[error("Block {got} out of order, expected {expected}")]
    OutOfOrder { expected: u32, got: u32 },

    #[error("Block {block_index} declares {declared} updates, got {actual}")]
    SizeMismatch {
        block_index: u32,
        declared: u16,
        actual: usize,
    },

    #[error("Block with {0} updates does not fit a block header")]
    TooManyUpdates(usize),
}

#[derive(Debug, Clone)]
struct Block {
    header: BlockHeader,
    updates: Vec<StateUpdate>,
}

#[derive(Debug, Clone)]
pub struct BlockLog {
    blocks: Vec<Block>,
}

impl BlockLog {
    /// Log holding only the origin block, approved by `origin_output`.
    pub fn new(origin_output: OutputId) -> Self {
        Self {
            blocks: vec![Block {
                header: BlockHeader {
                    block_index: 0,
                    size: 0,
                    approving_output_id: origin_output,
                },
                updates: Vec::new(),
            }],
        }
    }

    /// Index of the latest block.
    pub fn height(&self) -> u32 {
        (self.blocks.len() - 1) as u32
    }

    pub fn next_index(&self) -> u32 {
        self.blocks.len() as u32
    }

    pub fn latest(&self) -> &BlockHeader {
        &self.blocks[self.blocks.len() - 1].header
    }

    pub fn header(&self, index: u32) -> Option<&BlockHeader> {
        self.blocks.get(index as usize).map(|b| &b.header)
    }

    pub fn updates(&self, index: u32) -> Option<&[StateUpdate]> {
        self.blocks.get(index as usize).map(|b| b.updates.as_slice())
    }

    /// Append a block committed locally.
    pub fn append_committed(
        &mut self,
        approving_output_id: OutputId,
        updates: Vec<StateUpdate>,
    ) -> Result<BlockHeader, BlockLogError> {
        let size =
            u16::try_from(updates.len()).map_err(|_| BlockLogError::TooManyUpdates(updates.len()))?;
        let header = BlockHeader {
            block_index: self.next_index(),
            size,
            approving_output_id,
        };
        self.append(header, updates)?;
        Ok(header)
    }

    /// Append a block assembled elsewhere. Only the next index is accepted.
    pub fn append(
        &mut self,
        header: BlockHeader,
        updates: Vec<StateUpdate>,
    ) -> Result<(), BlockLogError> {
        if header.block_index != self.next_index() {
            return Err(BlockLogError::OutOfOrder {
                expected: self.next_index(),
                got: header.block_index,
            });
        }
        if usize::from(header.size) != updates.len() {
            return Err(BlockLogError::SizeMismatch {
                block_index: header.block_index,
                declared: header.size,
                actual: updates.len(),
            });
        }
        self.blocks.push(Block { header, updates });
        Ok(())
    }
}

/// A block being received from a peer.
#[derive(Debug)]
pub struct BlockAssembly {
    header: BlockHeader,
    updates: BTreeMap<u16, StateUpdate>,
}

impl BlockAssembly {
    pub fn new(header: BlockHeader) -> Self {
        Self {
            header,
            updates: BTreeMap::new(),
        }
    }

    pub fn block_index(&self) -> u32 {
        self.header.block_index
    }

    /// Store update `index_in_block`. Out-of-range indices are refused.
    pub fn add(&mut self, index_in_block: u16, update: StateUpdate) -> bool {
        if index_in_block >= self.header.size {
            return false;
        }
        self.updates.insert(index_in_block, update);
        true
    }

    pub fn is_complete(&self) -> bool {
        self.updates.len() == usize::from(self.header.size)
    }

    /// Header and updates in block order.
    pub fn into_parts(self) -> (BlockHeader, Vec<StateUpdate>) {
        (self.header, self.updates.into_values().collect())
    }
}
