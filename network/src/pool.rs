//! Outbound connection pool keyed by remote host.
//!
//! A connection is taken out of the pool for one request, then either
//! released for reuse or, after any error, dropped. The map lock is only
//! held to push or pop; dialing happens outside it.

use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use ringchain_protocol::{write_record, ProtocolError, RecordReader};

use crate::NetworkError;

/// One outbound TCP connection with its record reader.
pub struct PooledConnection {
    host: String,
    reader: RecordReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl PooledConnection {
    fn new(host: String, stream: TcpStream) -> Self {
        let (read_half, writer) = stream.into_split();
        Self {
            host,
            reader: RecordReader::new(read_half),
            writer,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Write one record.
    pub async fn send<T: Serialize>(&mut self, value: &T) -> Result<(), NetworkError> {
        write_record(&mut self.writer, value).await?;
        Ok(())
    }

    /// Read one record. A close by the peer is an error here: the caller
    /// is waiting for a response.
    pub async fn receive<T: DeserializeOwned>(&mut self) -> Result<T, NetworkError> {
        self.reader
            .read_record()
            .await?
            .ok_or(NetworkError::Protocol(ProtocolError::UnexpectedEof))
    }
}

/// Idle outbound connections per host.
pub struct ConnectionPool {
    idle: Mutex<HashMap<String, Vec<PooledConnection>>>,
    dial_timeout: Duration,
}

impl ConnectionPool {
    pub fn new(dial_timeout: Duration) -> Self {
        Self {
            idle: Mutex::new(HashMap::new()),
            dial_timeout,
        }
    }

    /// Take an idle connection to `host`, or dial a new one.
    pub async fn acquire(&self, host: &str) -> Result<PooledConnection, NetworkError> {
        let reused = {
            let mut idle = self.idle.lock().await;
            idle.get_mut(host).and_then(Vec::pop)
        };
        if let Some(conn) = reused {
            trace!(host, "reusing pooled connection");
            return Ok(conn);
        }

        let stream = tokio::time::timeout(self.dial_timeout, TcpStream::connect(host))
            .await
            .map_err(|_| NetworkError::DialTimeout {
                host: host.to_string(),
                timeout_ms: self.dial_timeout.as_millis() as u64,
            })?
            .map_err(|e| NetworkError::ConnectionFailed {
                host: host.to_string(),
                reason: e.to_string(),
            })?;
        stream.set_nodelay(true)?;
        debug!(host, "dialed");
        Ok(PooledConnection::new(host.to_string(), stream))
    }

    /// Return a healthy connection for reuse.
    ///
    /// Only call this after a request completed without error; failed
    /// connections are simply dropped, which closes them.
    pub async fn release(&self, conn: PooledConnection) {
        if conn.reader.has_buffered() {
            // Stray bytes would be read as the next response.
            debug!(host = %conn.host, "discarding connection with unread data");
            return;
        }
        let mut idle = self.idle.lock().await;
        idle.entry(conn.host.clone()).or_default().push(conn);
    }

    /// Close every idle connection and empty the pool. Returns how many
    /// were closed.
    pub async fn close_all(&self) -> usize {
        let drained: Vec<PooledConnection> = {
            let mut idle = self.idle.lock().await;
            idle.drain().flat_map(|(_, conns)| conns).collect()
        };
        drained.len()
    }

    /// Idle connections currently held for `host`.
    pub async fn idle_count(&self, host: &str) -> usize {
        self.idle.lock().await.get(host).map_or(0, Vec::len)
    }
}
