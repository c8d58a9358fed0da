//! ringchain node.
//!
//! The node:
//! - Verifies incoming transactions and gathers them into a pending block
//! - Mines the pending block on a dedicated thread
//! - Extends its chain with blocks that build on the tip
//! - Replicates accepted items to the hosts the DHT ring names for them

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod message;
pub mod miner;
pub mod node;
pub mod shutdown;

pub use config::NodeConfig;
pub use engine::{BlockOutcome, ConsensusEngine, EngineConfig, EngineQueues, TxOutcome};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use message::{Message, MessageKind};
pub use miner::{prepare_seed, Miner, MinerHandle};
pub use node::ChainNode;
pub use shutdown::{wait_for_signal, ShutdownController};
