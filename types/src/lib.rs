//! Fundamental types for ringchain.
//!
//! Hashes, keys, signatures and timestamps are all fixed-width byte values.
//! Equality is plain byte equality; nothing here knows how the values are
//! produced (see `ringchain-crypto`) or what they identify (see
//! `ringchain-ledger`).

pub mod block;
pub mod hash;
pub mod keys;
pub mod time;

pub use block::BlockHash;
pub use hash::TxHash;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use time::Timestamp;
