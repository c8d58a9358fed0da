//! ringchain daemon — entry point for running a ringchain node.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use ringchain_network::StaticRing;
use ringchain_node::{init_logging, wait_for_signal, ChainNode, NodeConfig};
use ringchain_store::MemoryBlockStore;

#[derive(Parser)]
#[command(name = "ringchain-daemon", about = "ringchain node daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "RINGCHAIN_CONFIG")]
    config: Option<PathBuf>,

    /// Address to accept replication connections on.
    #[arg(long, env = "RINGCHAIN_LISTEN")]
    listen: Option<SocketAddr>,

    /// Host name this node is known by on the ring.
    #[arg(long, env = "RINGCHAIN_ADVERTISE_HOST")]
    advertise_host: Option<String>,

    /// Other ring members (comma-separated: "10.0.0.2:9119,10.0.0.3:9119").
    #[arg(long, env = "RINGCHAIN_RING_PEERS", value_delimiter = ',')]
    ring_peers: Vec<String>,

    /// Replica-set size per block or transaction.
    #[arg(long, env = "RINGCHAIN_REPLICATION_FACTOR")]
    replication_factor: Option<usize>,

    /// Leading zero bits required of mined blocks.
    #[arg(long, env = "RINGCHAIN_BLOCK_DIFFICULTY")]
    block_difficulty: Option<u32>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "RINGCHAIN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "RINGCHAIN_LOG_FORMAT")]
    log_format: Option<String>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Node operations.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node until SIGINT or SIGTERM.
    Run,
}

impl Cli {
    /// File settings (or defaults) with flags and env vars applied on top.
    fn resolve_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::from_toml_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => NodeConfig::default(),
        };

        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(host) = &self.advertise_host {
            config.advertise_host = Some(host.clone());
        }
        if !self.ring_peers.is_empty() {
            config.ring_peers = self.ring_peers.clone();
        }
        if let Some(factor) = self.replication_factor {
            config.replication_factor = factor;
        }
        if let Some(difficulty) = self.block_difficulty {
            config.block_difficulty = difficulty;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

async fn run_node(config: NodeConfig) -> anyhow::Result<()> {
    let host = config.advertise_host();
    let ring = Arc::new(StaticRing::new(
        host.clone(),
        config.ring_peers.iter().cloned(),
        config.vnodes_per_host,
    ));
    let store = Arc::new(MemoryBlockStore::new());

    // Keys are not persisted; every run mines under a fresh identity.
    let keypair = ringchain_crypto::generate_keypair();
    tracing::info!(
        host = %host,
        origin = %hex::encode(keypair.public.as_bytes()),
        peers = config.ring_peers.len(),
        replication_factor = config.replication_factor,
        "starting ringchain node"
    );

    let mut node = ChainNode::start(&config, keypair, ring, store)
        .await
        .context("starting node")?;

    let signal = wait_for_signal().await;

    tracing::info!(signal, "shutdown signal received, stopping node");
    node.stop().await?;
    tracing::info!("ringchain daemon exited cleanly");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    init_logging(config.log_format()?, &config.log_level)?;

    match cli.command {
        Command::Node { action } => match action {
            NodeAction::Run => run_node(config).await?,
        },
    }

    Ok(())
}
