//! Replication layer for ringchain.
//!
//! Blocks and transactions are not flooded. Each item is sent to the hosts
//! that a DHT [`Ring`] names as its replica set, over a pool of reusable
//! outbound connections. Inbound connections answer pulls from the local
//! [`BlockStore`](ringchain_store::BlockStore) and forward pushes into the
//! consensus engine's queues.

pub mod error;
pub mod pool;
pub mod registry;
pub mod ring;
pub mod transport;

pub use error::NetworkError;
pub use pool::{ConnectionPool, PooledConnection};
pub use registry::InboundRegistry;
pub use ring::{replica_targets, unique_hosts, Ring, StaticRing, Vnode};
pub use transport::{ReplicationTransport, TransportConfig};
