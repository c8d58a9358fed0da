//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use ringchain_network::TransportConfig;
use ringchain_work::thresholds::{DEFAULT_BLOCK_DIFFICULTY, DEFAULT_TRANSACTION_DIFFICULTY};
use ringchain_work::WorkThresholds;

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for a ringchain node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Address the replication listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Host name this node is known by on the ring. Defaults to
    /// `listen_addr`.
    #[serde(default)]
    pub advertise_host: Option<String>,

    /// Replica-set size looked up per block or transaction.
    #[serde(default = "default_replication_factor")]
    pub replication_factor: usize,

    /// Outbound dial timeout in milliseconds.
    #[serde(default = "default_dial_timeout_ms")]
    pub dial_timeout_ms: u64,

    /// Inbound connections serviced concurrently.
    #[serde(default = "default_max_inbound_connections")]
    pub max_inbound_connections: usize,

    /// Leading zero bits required of a block hash.
    #[serde(default = "default_block_difficulty")]
    pub block_difficulty: u32,

    /// Leading zero bits required of a transaction hash.
    #[serde(default = "default_transaction_difficulty")]
    pub transaction_difficulty: u32,

    /// Pause between accepting a transaction and relaying it.
    #[serde(default = "default_tx_broadcast_delay_ms")]
    pub tx_broadcast_delay_ms: u64,

    /// Capacity of the engine's transaction and block queues.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Hosts of the static ring, besides this node.
    #[serde(default)]
    pub ring_peers: Vec<String>,

    /// Virtual nodes placed on the static ring per host.
    #[serde(default = "default_vnodes_per_host")]
    pub vnodes_per_host: usize,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9119))
}

fn default_replication_factor() -> usize {
    3
}

fn default_dial_timeout_ms() -> u64 {
    5_000
}

fn default_max_inbound_connections() -> usize {
    400
}

fn default_block_difficulty() -> u32 {
    DEFAULT_BLOCK_DIFFICULTY
}

fn default_transaction_difficulty() -> u32 {
    DEFAULT_TRANSACTION_DIFFICULTY
}

fn default_tx_broadcast_delay_ms() -> u64 {
    300
}

fn default_queue_capacity() -> usize {
    64
}

fn default_vnodes_per_host() -> usize {
    4
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject values the node cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.replication_factor == 0 {
            return Err(NodeError::Config("replication_factor must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(NodeError::Config("queue_capacity must be at least 1".into()));
        }
        if self.max_inbound_connections == 0 {
            return Err(NodeError::Config(
                "max_inbound_connections must be at least 1".into(),
            ));
        }
        self.log_format()?;
        Ok(())
    }

    /// The host name to use on the ring.
    pub fn advertise_host(&self) -> String {
        self.advertise_host
            .clone()
            .unwrap_or_else(|| self.listen_addr.to_string())
    }

    pub fn thresholds(&self) -> WorkThresholds {
        WorkThresholds::with(self.block_difficulty, self.transaction_difficulty)
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            replication_factor: self.replication_factor,
            dial_timeout: Duration::from_millis(self.dial_timeout_ms),
            max_inbound_connections: self.max_inbound_connections,
        }
    }

    pub fn tx_broadcast_delay(&self) -> Duration {
        Duration::from_millis(self.tx_broadcast_delay_ms)
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            advertise_host: None,
            replication_factor: default_replication_factor(),
            dial_timeout_ms: default_dial_timeout_ms(),
            max_inbound_connections: default_max_inbound_connections(),
            block_difficulty: default_block_difficulty(),
            transaction_difficulty: default_transaction_difficulty(),
            tx_broadcast_delay_ms: default_tx_broadcast_delay_ms(),
            queue_capacity: default_queue_capacity(),
            ring_peers: Vec::new(),
            vnodes_per_host: default_vnodes_per_host(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.listen_addr, config.listen_addr);
        assert_eq!(parsed.replication_factor, config.replication_factor);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.listen_addr.port(), 9119);
        assert_eq!(config.replication_factor, 3);
        assert_eq!(config.dial_timeout_ms, 5_000);
        assert_eq!(config.max_inbound_connections, 400);
        assert_eq!(config.tx_broadcast_delay_ms, 300);
        assert!(config.transaction_difficulty < config.block_difficulty);
        assert_eq!(config.log_format().unwrap(), LogFormat::Human);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            listen_addr = "127.0.0.1:7000"
            advertise_host = "node-a:7000"
            ring_peers = ["node-b:7000", "node-c:7000"]
            block_difficulty = 4
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.advertise_host(), "node-a:7000");
        assert_eq!(config.ring_peers.len(), 2);
        assert_eq!(config.thresholds().block, 4);
        assert_eq!(config.log_format, "human"); // default
    }

    #[test]
    fn advertise_host_falls_back_to_listen_addr() {
        let config = NodeConfig::from_toml_str("listen_addr = \"127.0.0.1:7001\"").unwrap();
        assert_eq!(config.advertise_host(), "127.0.0.1:7001");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(NodeConfig::from_toml_str("replication_factor = 0").is_err());
        assert!(NodeConfig::from_toml_str("log_format = \"xml\"").is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dial_timeout_ms = 250").unwrap();
        let config = NodeConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.transport_config().dial_timeout, Duration::from_millis(250));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/ringchain.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
