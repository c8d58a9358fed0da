//! Proof-of-work for ringchain.
//!
//! A hash meets difficulty `d` when its first `d` bits are zero. Blocks are
//! mined against the block threshold; transactions carry their own, lower,
//! proof-of-work so that flooding the pending block costs the sender CPU.

pub mod error;
pub mod generator;
pub mod thresholds;
pub mod validator;

pub use error::WorkError;
pub use generator::WorkGenerator;
pub use thresholds::{WorkKind, WorkThresholds};
pub use validator::{leading_zero_bits, validate_work, MAX_DIFFICULTY};
