//! Chain data for ringchain.
//!
//! - [`Transaction`]: a signed, proof-of-work-stamped transfer of an opaque payload
//! - [`Block`]: a header over an ordered transaction set; *pending* until the
//!   miner seals it with proof-of-work and a signature
//! - [`Chain`]: the append-only sequence of sealed blocks
//! - [`diff_transactions`]: carry-forward computation between two blocks

pub mod block;
pub mod chain;
pub mod diff;
pub mod error;
pub mod merkle;
pub mod transaction;

pub use block::{Block, BlockHeader};
pub use chain::Chain;
pub use diff::diff_transactions;
pub use error::LedgerError;
pub use merkle::merkle_root;
pub use transaction::{Transaction, TransactionHeader};
