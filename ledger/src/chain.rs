//! The append-only chain of sealed blocks.

use std::collections::HashMap;

use ringchain_types::BlockHash;

use crate::Block;

/// Sealed blocks in append order, indexed by hash.
///
/// `append` does no validation; linkage (`block[i].prev == hash(block[i-1])`)
/// is the caller's responsibility. Blocks are never removed or reordered.
#[derive(Debug, Default)]
pub struct Chain {
    blocks: Vec<Block>,
    index: HashMap<BlockHash, usize>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, block: Block) {
        self.index.insert(block.hash(), self.blocks.len());
        self.blocks.push(block);
    }

    /// Membership by header hash.
    pub fn exists(&self, block: &Block) -> bool {
        self.contains_hash(&block.hash())
    }

    pub fn contains_hash(&self, hash: &BlockHash) -> bool {
        self.index.contains_key(hash)
    }

    /// The chain tip, or `None` for an empty chain.
    pub fn previous_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn first(&self) -> Option<&Block> {
        self.blocks.first()
    }

    pub fn get(&self, hash: &BlockHash) -> Option<&Block> {
        self.index.get(hash).map(|&i| &self.blocks[i])
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }
}
