use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] ringchain_ledger::LedgerError),

    #[error("network error: {0}")]
    Network(#[from] ringchain_network::NetworkError),

    #[error("store error: {0}")]
    Store(#[from] ringchain_store::StoreError),

    #[error("message codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("miner is not running")]
    MinerStopped,

    #[error("consensus engine is not running")]
    EngineStopped,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
