//! Node wiring: miner thread, consensus engine, replication transport and
//! the relay between them.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use ringchain_ledger::{Block, Transaction};
use ringchain_network::{ReplicationTransport, Ring};
use ringchain_store::BlockStore;
use ringchain_types::KeyPair;

use crate::engine::{ConsensusEngine, EngineConfig, EngineQueues};
use crate::message::{Message, MessageKind};
use crate::miner::Miner;
use crate::shutdown::ShutdownController;
use crate::{NodeConfig, NodeError};

/// A running ringchain node.
pub struct ChainNode {
    transport: Arc<ReplicationTransport>,
    local_addr: SocketAddr,
    tx_sink: mpsc::Sender<Transaction>,
    block_sink: mpsc::Sender<Block>,
    shutdown: ShutdownController,
    tasks: Vec<JoinHandle<()>>,
    miner_thread: Option<thread::JoinHandle<()>>,
    stopped: bool,
}

impl ChainNode {
    /// Bind `config.listen_addr` and start the node.
    pub async fn start(
        config: &NodeConfig,
        keypair: KeyPair,
        ring: Arc<dyn Ring>,
        store: Arc<dyn BlockStore>,
    ) -> Result<Self, NodeError> {
        let listener = TcpListener::bind(config.listen_addr).await?;
        Self::start_with_listener(config, keypair, ring, store, listener)
    }

    /// Start the node on an already bound listener.
    pub fn start_with_listener(
        config: &NodeConfig,
        keypair: KeyPair,
        ring: Arc<dyn Ring>,
        store: Arc<dyn BlockStore>,
        listener: TcpListener,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let (tx_sink, transactions) = mpsc::channel(config.queue_capacity);
        let (block_sink, blocks) = mpsc::channel(config.queue_capacity);
        let (mined_tx, mined) = mpsc::unbounded_channel();
        let (outbound_tx, outbound) = mpsc::channel(config.queue_capacity);

        let transport = ReplicationTransport::new(
            config.transport_config(),
            ring,
            Arc::clone(&store),
            tx_sink.clone(),
            block_sink.clone(),
        );
        let local_addr = transport.listen(listener)?;

        let origin = keypair.public.clone();
        let (miner, miner_thread) = Miner::start(keypair, config.block_difficulty, mined_tx)?;

        let engine = ConsensusEngine::new(
            origin,
            EngineConfig {
                thresholds: config.thresholds(),
                tx_broadcast_delay: config.tx_broadcast_delay(),
            },
            store,
            miner,
            outbound_tx,
        );

        let shutdown = ShutdownController::new();
        let engine_task = tokio::spawn(engine.run(
            EngineQueues {
                transactions,
                blocks,
                mined,
            },
            shutdown.subscribe(),
        ));
        let relay_task = tokio::spawn(relay(outbound, Arc::clone(&transport)));

        info!(%local_addr, host = transport.hostname(), "node started");
        Ok(Self {
            transport,
            local_addr,
            tx_sink,
            block_sink,
            shutdown,
            tasks: vec![engine_task, relay_task],
            miner_thread: Some(miner_thread),
            stopped: false,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn hostname(&self) -> &str {
        self.transport.hostname()
    }

    pub fn transport(&self) -> &Arc<ReplicationTransport> {
        &self.transport
    }

    /// Queue a transaction for the engine, as if received from a peer.
    pub async fn submit_transaction(&self, tx: Transaction) -> Result<(), NodeError> {
        self.tx_sink
            .send(tx)
            .await
            .map_err(|_| NodeError::EngineStopped)
    }

    /// Queue a block for the engine, as if received from a peer.
    pub async fn submit_block(&self, block: Block) -> Result<(), NodeError> {
        self.block_sink
            .send(block)
            .await
            .map_err(|_| NodeError::EngineStopped)
    }

    /// Stop the transport, the engine, the relay and the miner. Later calls
    /// do nothing.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;

        self.transport.shutdown().await;
        self.shutdown.shutdown();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "node task ended abnormally");
            }
        }
        // The engine owned the miner handle; with it gone the thread exits.
        if let Some(miner) = self.miner_thread.take() {
            match tokio::task::spawn_blocking(move || miner.join()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => warn!("miner thread panicked"),
                Err(e) => warn!(error = %e, "could not join miner thread"),
            }
        }
        info!("node stopped");
        Ok(())
    }
}

/// Turn the engine's outbound messages into replication broadcasts.
async fn relay(mut outbound: mpsc::Receiver<Message>, transport: Arc<ReplicationTransport>) {
    while let Some(message) = outbound.recv().await {
        let issued = match message.kind {
            MessageKind::Transaction => message
                .decode_transaction()
                .and_then(|tx| transport.broadcast_transaction(&tx).map_err(NodeError::from)),
            MessageKind::Block => message
                .decode_block()
                .and_then(|block| transport.broadcast_block(&block).map_err(NodeError::from)),
        };
        match issued {
            Ok(requests) => debug!(kind = ?message.kind, requests, "relayed"),
            Err(e) => warn!(kind = ?message.kind, error = %e, "relay failed"),
        }
    }
}
