use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("connection to {host} failed: {reason}")]
    ConnectionFailed { host: String, reason: String },

    #[error("dial to {host} timed out after {timeout_ms}ms")]
    DialTimeout { host: String, timeout_ms: u64 },

    #[error("ring lookup failed: {0}")]
    Ring(String),

    #[error("transport is shut down")]
    ShutDown,

    #[error("protocol error: {0}")]
    Protocol(#[from] ringchain_protocol::ProtocolError),

    #[error("store error: {0}")]
    Store(#[from] ringchain_store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
