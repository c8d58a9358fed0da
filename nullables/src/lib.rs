//! Nullable infrastructure for deterministic testing.
//!
//! The transport and the engine reach the DHT and block storage through
//! traits. The implementations here:
//! - Return scripted values
//! - Record what was asked of them
//! - Never touch the network or the filesystem
//!
//! Usage: swap real implementations for nullables in tests.

pub mod ring;
pub mod store;

pub use ring::NullRing;
pub use store::NullBlockStore;
