//! Block storage trait.

use crate::StoreError;
use ringchain_ledger::Block;
use ringchain_types::BlockHash;

/// Durable (or not) storage of sealed blocks in chain order.
///
/// "Not present" is `Ok(None)`, never an error.
pub trait BlockStore: Send + Sync {
    /// Retrieve a block by header hash.
    fn get(&self, hash: &BlockHash) -> Result<Option<Block>, StoreError>;

    /// The first block ever stored (genesis).
    fn first_block(&self) -> Result<Option<Block>, StoreError>;

    /// The most recently stored block (chain tip).
    fn last_block(&self) -> Result<Option<Block>, StoreError>;

    /// Store a block after the current tip. Storing a known hash is a no-op.
    fn put_block(&self, block: &Block) -> Result<(), StoreError>;
}
