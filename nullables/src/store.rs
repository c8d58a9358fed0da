//! Nullable block store — in memory, with switchable failures.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use ringchain_ledger::Block;
use ringchain_store::{BlockStore, MemoryBlockStore, StoreError};
use ringchain_types::BlockHash;

/// A [`MemoryBlockStore`] that counts writes and can be told to fail.
#[derive(Default)]
pub struct NullBlockStore {
    inner: MemoryBlockStore,
    puts: AtomicUsize,
    failing: AtomicBool,
}

impl NullBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call return a backend error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `put_block` calls, including failed ones.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null store set to fail".into()));
        }
        Ok(())
    }
}

impl BlockStore for NullBlockStore {
    fn get(&self, hash: &BlockHash) -> Result<Option<Block>, StoreError> {
        self.check()?;
        self.inner.get(hash)
    }

    fn first_block(&self) -> Result<Option<Block>, StoreError> {
        self.check()?;
        self.inner.first_block()
    }

    fn last_block(&self) -> Result<Option<Block>, StoreError> {
        self.check()?;
        self.inner.last_block()
    }

    fn put_block(&self, block: &Block) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.put_block(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringchain_crypto::keypair_from_seed;

    #[test]
    fn failing_store_rejects_everything() {
        let store = NullBlockStore::new();
        let block = Block::pending(None, keypair_from_seed(&[1; 32]).public);
        store.put_block(&block).unwrap();
        assert_eq!(store.len(), 1);

        store.set_failing(true);
        assert!(store.get(&block.hash()).is_err());
        assert!(store.put_block(&block).is_err());
        assert_eq!(store.put_count(), 2);

        store.set_failing(false);
        assert_eq!(store.last_block().unwrap(), Some(block));
    }
}
