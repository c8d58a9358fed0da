use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown request kind: {0}")]
    UnknownKind(u8),

    #[error("record too large: {size} > {max}")]
    RecordTooLarge { size: usize, max: usize },

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("stream ended inside a record")]
    UnexpectedEof,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether the error is a transport failure rather than bad input.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::UnexpectedEof)
    }
}
