//! Wire protocol for block and transaction replication.
//!
//! Every exchange starts with a [`Header`] record naming a [`RequestKind`],
//! optionally followed by a payload record. Records are JSON values written
//! back to back; the codec's own syntax delimits them, so there is no
//! length prefix.

pub mod codec;
pub mod error;
pub mod kind;

pub use codec::{decode, encode, write_record, RecordReader, MAX_RECORD_SIZE};
pub use error::ProtocolError;
pub use kind::{Header, RequestKind, KIND_BASE};
