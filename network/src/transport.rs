//! The replication transport.
//!
//! Outbound: pushes blocks and transactions to their replica hosts and
//! pulls blocks by hash, first or last. Inbound: one task per accepted
//! connection, serving requests sequentially until the peer hangs up.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use ringchain_ledger::{Block, Transaction};
use ringchain_protocol::{write_record, Header, ProtocolError, RecordReader, RequestKind};
use ringchain_store::BlockStore;
use ringchain_types::BlockHash;

use crate::pool::{ConnectionPool, PooledConnection};
use crate::registry::InboundRegistry;
use crate::ring::{replica_targets, Ring};
use crate::NetworkError;

/// Transport tuning.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Replica-set size requested from the ring per item.
    pub replication_factor: usize,
    /// Upper bound on establishing an outbound connection.
    pub dial_timeout: Duration,
    /// Inbound connections serviced at once; further accepts wait.
    pub max_inbound_connections: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            replication_factor: 3,
            dial_timeout: Duration::from_secs(5),
            max_inbound_connections: 400,
        }
    }
}

/// DHT-routed replication of blocks and transactions.
pub struct ReplicationTransport {
    config: TransportConfig,
    ring: Arc<dyn Ring>,
    store: Arc<dyn BlockStore>,
    tx_sink: mpsc::Sender<Transaction>,
    block_sink: mpsc::Sender<Block>,
    pool: ConnectionPool,
    inbound: Arc<InboundRegistry>,
    permits: Arc<Semaphore>,
    listener: Mutex<Option<AbortHandle>>,
    shut_down: AtomicBool,
}

impl ReplicationTransport {
    /// Create a transport. Received transactions and blocks are forwarded
    /// into `tx_sink` and `block_sink`.
    pub fn new(
        config: TransportConfig,
        ring: Arc<dyn Ring>,
        store: Arc<dyn BlockStore>,
        tx_sink: mpsc::Sender<Transaction>,
        block_sink: mpsc::Sender<Block>,
    ) -> Arc<Self> {
        Arc::new(Self {
            pool: ConnectionPool::new(config.dial_timeout),
            permits: Arc::new(Semaphore::new(config.max_inbound_connections.max(1))),
            config,
            ring,
            store,
            tx_sink,
            block_sink,
            inbound: Arc::new(InboundRegistry::new()),
            listener: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        })
    }

    /// The host name this node is known by on the ring.
    pub fn hostname(&self) -> &str {
        self.ring.hostname()
    }

    /// Start accepting inbound connections on `listener`.
    pub fn listen(self: &Arc<Self>, listener: TcpListener) -> Result<SocketAddr, NetworkError> {
        if self.is_shut_down() {
            return Err(NetworkError::ShutDown);
        }
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(Arc::clone(self).accept_loop(listener));
        let previous = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle.abort_handle());
        if let Some(previous) = previous {
            previous.abort();
        }
        info!(%addr, host = self.hostname(), "replication transport listening");
        Ok(addr)
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        loop {
            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                break;
            };
            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "inbound connection");
                    let transport = Arc::clone(&self);
                    self.inbound.spawn(async move {
                        let _permit = permit;
                        match transport.serve_connection(stream).await {
                            Ok(()) => debug!(%peer, "inbound connection closed"),
                            Err(e) => warn!(%peer, error = %e, "inbound connection failed"),
                        }
                    });
                }
                Err(e) => warn!(error = %e, "accept failed"),
            }
        }
    }

    /// Service one inbound connection until the peer closes it or sends
    /// something invalid.
    async fn serve_connection(&self, stream: TcpStream) -> Result<(), NetworkError> {
        let (read_half, mut writer) = stream.into_split();
        let mut reader = RecordReader::new(read_half);

        loop {
            let Some(header) = reader.read_record::<Header>().await? else {
                return Ok(());
            };
            match header.kind()? {
                RequestKind::FirstBlock => {
                    let block = self.store.first_block()?;
                    write_record(&mut writer, &block).await?;
                }
                RequestKind::LastBlock => {
                    let block = self.store.last_block()?;
                    write_record(&mut writer, &block).await?;
                }
                RequestKind::BlockByHash => {
                    let hash: BlockHash = read_payload(&mut reader).await?;
                    let block = self.store.get(&hash)?;
                    if block.is_none() {
                        debug!(hash = %hash.short(), "pulled block not found");
                    }
                    write_record(&mut writer, &block).await?;
                }
                RequestKind::TxBroadcast => {
                    let tx: Transaction = read_payload(&mut reader).await?;
                    if self.tx_sink.send(tx).await.is_err() {
                        return Ok(());
                    }
                }
                RequestKind::BlockBroadcast => {
                    let block: Block = read_payload(&mut reader).await?;
                    if self.block_sink.send(block).await.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Distinct replica hosts for `key`, excluding this node.
    fn targets_for(&self, key: &[u8]) -> Result<Vec<String>, NetworkError> {
        let vnodes = self.ring.lookup(self.config.replication_factor, key)?;
        Ok(replica_targets(&vnodes, self.ring.hostname()))
    }

    /// Push `block` to its replica hosts, one task per host. Returns the
    /// number of requests issued; delivery failures are only logged.
    pub fn broadcast_block(self: &Arc<Self>, block: &Block) -> Result<usize, NetworkError> {
        let hash = block.hash();
        self.broadcast(hash.as_bytes(), RequestKind::BlockBroadcast, block)
    }

    /// Push `tx` to its replica hosts, one task per host.
    pub fn broadcast_transaction(self: &Arc<Self>, tx: &Transaction) -> Result<usize, NetworkError> {
        let hash = tx.hash();
        self.broadcast(hash.as_bytes(), RequestKind::TxBroadcast, tx)
    }

    fn broadcast<T>(self: &Arc<Self>, key: &[u8], kind: RequestKind, item: &T) -> Result<usize, NetworkError>
    where
        T: Serialize + Clone + Send + Sync + 'static,
    {
        if self.is_shut_down() {
            return Err(NetworkError::ShutDown);
        }
        let targets = self.targets_for(key)?;
        for host in &targets {
            let transport = Arc::clone(self);
            let item = item.clone();
            let host = host.clone();
            tokio::spawn(async move {
                if let Err(e) = transport.push(&host, kind, &item).await {
                    warn!(host = %host, ?kind, error = %e, "replication push failed");
                }
            });
        }
        debug!(?kind, requests = targets.len(), "broadcast issued");
        Ok(targets.len())
    }

    async fn push<T: Serialize>(&self, host: &str, kind: RequestKind, item: &T) -> Result<(), NetworkError> {
        if self.is_shut_down() {
            return Err(NetworkError::ShutDown);
        }
        let mut conn = self.pool.acquire(host).await?;
        // On error the connection is dropped rather than returned.
        send_request(&mut conn, kind, Some(item)).await?;
        self.pool.release(conn).await;
        Ok(())
    }

    async fn pull(&self, host: &str, kind: RequestKind, hash: Option<&BlockHash>) -> Result<Option<Block>, NetworkError> {
        if self.is_shut_down() {
            return Err(NetworkError::ShutDown);
        }
        let mut conn = self.pool.acquire(host).await?;
        send_request(&mut conn, kind, hash).await?;
        let block = conn.receive::<Option<Block>>().await?;
        self.pool.release(conn).await;
        Ok(block)
    }

    /// The genesis block held by `host`, or `None` if its chain is empty.
    pub async fn first_block(&self, host: &str) -> Result<Option<Block>, NetworkError> {
        self.pull(host, RequestKind::FirstBlock, None).await
    }

    /// The chain tip held by `host`, or `None` if its chain is empty.
    pub async fn last_block(&self, host: &str) -> Result<Option<Block>, NetworkError> {
        self.pull(host, RequestKind::LastBlock, None).await
    }

    /// The block `hash` as held by `host`, or `None` if it has none.
    pub async fn block_by_hash(&self, host: &str, hash: &BlockHash) -> Result<Option<Block>, NetworkError> {
        self.pull(host, RequestKind::BlockByHash, Some(hash)).await
    }

    /// Pull each of `hashes` from its replica hosts and forward the sealed
    /// blocks into the block queue. The first host that returns the
    /// requested block wins. Returns how many blocks were forwarded.
    ///
    /// Nothing calls this automatically when a gap is detected.
    pub async fn request_blocks(&self, hashes: &[BlockHash]) -> Result<usize, NetworkError> {
        let mut forwarded = 0;
        for hash in hashes {
            for host in self.targets_for(hash.as_bytes())? {
                match self.block_by_hash(&host, hash).await {
                    Ok(Some(block)) if block.is_sealed() && block.hash() == *hash => {
                        if self.block_sink.send(block).await.is_err() {
                            return Ok(forwarded);
                        }
                        forwarded += 1;
                        break;
                    }
                    Ok(_) => debug!(host = %host, hash = %hash.short(), "host has no such block"),
                    Err(e) => warn!(host = %host, hash = %hash.short(), error = %e, "block pull failed"),
                }
            }
        }
        Ok(forwarded)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Stop listening, abort inbound connections, close and clear the
    /// outbound pool. Later calls do nothing.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            listener.abort();
        }
        self.permits.close();
        let inbound = self.inbound.abort_all();
        let outbound = self.pool.close_all().await;
        info!(inbound, outbound, "replication transport shut down");
    }

    /// Connection pool, exposed for inspection.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Number of inbound connections currently being serviced.
    pub fn inbound_connections(&self) -> usize {
        self.inbound.len()
    }
}

async fn send_request<T: Serialize>(
    conn: &mut PooledConnection,
    kind: RequestKind,
    payload: Option<&T>,
) -> Result<(), NetworkError> {
    conn.send(&Header::new(kind)).await?;
    if let Some(payload) = payload {
        conn.send(payload).await?;
    }
    Ok(())
}

async fn read_payload<T: DeserializeOwned>(
    reader: &mut RecordReader<tokio::net::tcp::OwnedReadHalf>,
) -> Result<T, NetworkError> {
    reader
        .read_record()
        .await?
        .ok_or(NetworkError::Protocol(ProtocolError::UnexpectedEof))
}
