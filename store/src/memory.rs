//! In-memory block store, safe to share between the engine and the
//! transport's connection tasks.

use std::collections::HashMap;
use std::sync::RwLock;

use ringchain_ledger::Block;
use ringchain_types::BlockHash;

use crate::{BlockStore, StoreError};

#[derive(Default)]
struct Inner {
    blocks: Vec<Block>,
    index: HashMap<BlockHash, usize>,
}

/// A `Vec` of blocks in insertion order plus a hash index.
#[derive(Default)]
pub struct MemoryBlockStore {
    inner: RwLock<Inner>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.blocks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlockStore for MemoryBlockStore {
    fn get(&self, hash: &BlockHash) -> Result<Option<Block>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.index.get(hash).map(|&i| inner.blocks[i].clone()))
    }

    fn first_block(&self) -> Result<Option<Block>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.blocks.first().cloned())
    }

    fn last_block(&self) -> Result<Option<Block>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.blocks.last().cloned())
    }

    fn put_block(&self, block: &Block) -> Result<(), StoreError> {
        let hash = block.hash();
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if inner.index.contains_key(&hash) {
            return Ok(());
        }
        let position = inner.blocks.len();
        inner.index.insert(hash, position);
        inner.blocks.push(block.clone());
        Ok(())
    }
}
