use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("proof-of-work below difficulty {difficulty}")]
    InsufficientWork { difficulty: u32 },

    #[error("invalid signature")]
    InvalidSignature,

    #[error("merkle root does not match transactions")]
    MerkleMismatch,

    #[error("block is not sealed")]
    NotSealed,

    #[error("payload does not match header (hash or length)")]
    PayloadMismatch,

    #[error("payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    #[error("work error: {0}")]
    Work(#[from] ringchain_work::WorkError),
}
