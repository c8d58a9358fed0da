//! Block storage for ringchain.
//!
//! The replication transport answers peer pulls through [`BlockStore`];
//! the consensus engine writes every block it appends through to the same
//! store. Backends only have to answer by-hash, first and last queries.

pub mod block;
pub mod error;
pub mod memory;

pub use block::BlockStore;
pub use error::StoreError;
pub use memory::MemoryBlockStore;
