//! Signed transactions.

use serde::{Deserialize, Serialize};

use ringchain_crypto::{blake2b_256, blake2b_256_multi, sign_message, verify_signature};
use ringchain_types::{KeyPair, PublicKey, Signature, Timestamp, TxHash};
use ringchain_work::{validate_work, WorkGenerator};

use crate::LedgerError;

/// Payload length travels as a u32 in the header.
pub const MAX_PAYLOAD_LEN: usize = u32::MAX as usize;

/// The hashed part of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHeader {
    pub from: PublicKey,
    pub to: PublicKey,
    pub timestamp: Timestamp,
    pub payload_hash: [u8; 32],
    pub payload_length: u32,
    pub nonce: u64,
}

impl TransactionHeader {
    /// Header for `payload` sent now, with nonce 0.
    pub fn new(from: PublicKey, to: PublicKey, payload: &[u8]) -> Result<Self, LedgerError> {
        let payload_length =
            u32::try_from(payload.len()).map_err(|_| LedgerError::PayloadTooLarge(payload.len()))?;
        Ok(Self {
            from,
            to,
            timestamp: Timestamp::now(),
            payload_hash: blake2b_256(payload),
            payload_length,
            nonce: 0,
        })
    }

    pub fn hash(&self) -> TxHash {
        self.hash_with_nonce(self.nonce)
    }

    /// Header hash as it would be with a different nonce.
    pub fn hash_with_nonce(&self, nonce: u64) -> TxHash {
        TxHash::new(blake2b_256_multi(&[
            self.from.as_bytes(),
            self.to.as_bytes(),
            &self.timestamp.to_be_bytes(),
            &self.payload_hash,
            &self.payload_length.to_be_bytes(),
            &nonce.to_be_bytes(),
        ]))
    }

    /// Search a nonce meeting `difficulty` and store it in the header.
    pub fn solve(&mut self, difficulty: u32) -> Result<(), LedgerError> {
        let nonce =
            WorkGenerator.generate(difficulty, |n| *self.hash_with_nonce(n).as_bytes())?;
        self.nonce = nonce;
        Ok(())
    }
}

/// A transaction. Its identity is its signature, which is assumed unique.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub header: TransactionHeader,
    #[serde(default)]
    pub payload: Vec<u8>,
    pub signature: Signature,
}

impl Transaction {
    /// Build, solve and sign a transaction from `keypair` to `to`.
    pub fn create(
        keypair: &KeyPair,
        to: PublicKey,
        payload: Vec<u8>,
        difficulty: u32,
    ) -> Result<Self, LedgerError> {
        let mut header = TransactionHeader::new(keypair.public.clone(), to, &payload)?;
        header.solve(difficulty)?;
        Ok(Self::signed(header, payload, keypair))
    }

    /// Sign an already-prepared header. The header is not re-solved.
    pub fn signed(header: TransactionHeader, payload: Vec<u8>, keypair: &KeyPair) -> Self {
        let signature = sign_message(header.hash().as_bytes(), &keypair.private);
        Self {
            header,
            payload,
            signature,
        }
    }

    pub fn hash(&self) -> TxHash {
        self.header.hash()
    }

    /// Check payload integrity, proof-of-work at `difficulty`, and the
    /// sender's signature over the header hash.
    pub fn verify(&self, difficulty: u32) -> Result<(), LedgerError> {
        if self.header.payload_hash != blake2b_256(&self.payload)
            || self.header.payload_length as usize != self.payload.len()
        {
            return Err(LedgerError::PayloadMismatch);
        }
        let hash = self.hash();
        if !validate_work(hash.as_bytes(), difficulty) {
            return Err(LedgerError::InsufficientWork { difficulty });
        }
        if !verify_signature(hash.as_bytes(), &self.signature, &self.header.from) {
            return Err(LedgerError::InvalidSignature);
        }
        Ok(())
    }
}
