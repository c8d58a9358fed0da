//! Request kinds and the header record.

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Wire value of the first request kind; the rest follow consecutively.
pub const KIND_BASE: u8 = 43;

/// The one-byte message kind carried by every header. Values are
/// wire-stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestKind {
    /// Ask for the peer's genesis block. Response: a block or the sentinel.
    FirstBlock = KIND_BASE,
    /// Ask for the peer's chain tip. Response: a block or the sentinel.
    LastBlock = KIND_BASE + 1,
    /// Payload: a block hash. Response: the block or the sentinel.
    BlockByHash = KIND_BASE + 2,
    /// Payload: a sealed block. No response.
    BlockBroadcast = KIND_BASE + 3,
    /// Payload: a transaction. No response.
    TxBroadcast = KIND_BASE + 4,
}

impl RequestKind {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether the requester waits for a response record.
    pub fn expects_response(self) -> bool {
        matches!(self, Self::FirstBlock | Self::LastBlock | Self::BlockByHash)
    }
}

impl TryFrom<u8> for RequestKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            v if v == Self::FirstBlock as u8 => Self::FirstBlock,
            v if v == Self::LastBlock as u8 => Self::LastBlock,
            v if v == Self::BlockByHash as u8 => Self::BlockByHash,
            v if v == Self::BlockBroadcast as u8 => Self::BlockBroadcast,
            v if v == Self::TxBroadcast as u8 => Self::TxBroadcast,
            other => return Err(ProtocolError::UnknownKind(other)),
        })
    }
}

/// The header record that opens every exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub t: u8,
}

impl Header {
    pub fn new(kind: RequestKind) -> Self {
        Self { t: kind.as_u8() }
    }

    pub fn kind(&self) -> Result<RequestKind, ProtocolError> {
        RequestKind::try_from(self.t)
    }
}
