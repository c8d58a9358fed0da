//! Blocks: a header, an ordered transaction set, and the origin's seal.

use std::fmt;

use serde::{Deserialize, Serialize};

use ringchain_crypto::{blake2b_256_multi, sign_message, verify_signature};
use ringchain_types::{BlockHash, KeyPair, PublicKey, Signature, Timestamp};
use ringchain_work::validate_work;

use crate::merkle::merkle_root;
use crate::{LedgerError, Transaction};

/// The hashed part of a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Node that mined the block.
    pub origin: PublicKey,
    /// Hash of the preceding block; `None` for the genesis block.
    pub prev_block: Option<BlockHash>,
    pub merkle_root: [u8; 32],
    pub timestamp: Timestamp,
    pub nonce: u64,
}

impl BlockHeader {
    pub fn hash(&self) -> BlockHash {
        // A flag byte keeps "no previous block" distinct from a zero hash.
        let (flag, prev) = match &self.prev_block {
            Some(prev) => (1u8, *prev.as_bytes()),
            None => (0u8, [0u8; 32]),
        };
        BlockHash::new(blake2b_256_multi(&[
            self.origin.as_bytes(),
            &[flag],
            &prev,
            &self.merkle_root,
            &self.timestamp.to_be_bytes(),
            &self.nonce.to_be_bytes(),
        ]))
    }
}

/// A block. Pending while `signature` is `None`; sealed once the miner has
/// found a valid nonce and signed the header hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    pub signature: Option<Signature>,
}

impl Block {
    /// A fresh pending block with no transactions.
    pub fn pending(prev_block: Option<BlockHash>, origin: PublicKey) -> Self {
        Self {
            header: BlockHeader {
                origin,
                prev_block,
                merkle_root: merkle_root(Vec::new()),
                timestamp: Timestamp::now(),
                nonce: 0,
            },
            transactions: Vec::new(),
            signature: None,
        }
    }

    /// Identity of the block: the hash of its header.
    pub fn hash(&self) -> BlockHash {
        self.header.hash()
    }

    pub fn is_sealed(&self) -> bool {
        self.signature.is_some()
    }

    pub fn prev_block(&self) -> Option<&BlockHash> {
        self.header.prev_block.as_ref()
    }

    /// Merkle root over the current transaction set.
    pub fn generate_merkle_root(&self) -> [u8; 32] {
        merkle_root(
            self.transactions
                .iter()
                .map(|tx| *tx.hash().as_bytes())
                .collect(),
        )
    }

    /// Whether a transaction with the same signature is already included.
    pub fn contains(&self, tx: &Transaction) -> bool {
        self.transactions
            .iter()
            .any(|t| t.signature == tx.signature)
    }

    /// Insert a transaction keeping the set ordered by signature.
    ///
    /// Returns `false` (and leaves the block untouched) for a duplicate
    /// signature. The header is not updated; the miner recomputes the
    /// Merkle root when it is reseeded.
    pub fn add_transaction(&mut self, tx: Transaction) -> bool {
        match self
            .transactions
            .binary_search_by(|t| t.signature.cmp(&tx.signature))
        {
            Ok(_) => false,
            Err(pos) => {
                self.transactions.insert(pos, tx);
                true
            }
        }
    }

    /// Sign the current header hash with the node key.
    pub fn seal(&mut self, keypair: &KeyPair) {
        self.signature = Some(sign_message(self.hash().as_bytes(), &keypair.private));
    }

    /// Check the seal: signature present, proof-of-work at `difficulty`,
    /// the origin's signature over the header hash, and a Merkle root that
    /// commits to the transactions actually carried.
    pub fn verify(&self, difficulty: u32) -> Result<(), LedgerError> {
        let signature = self.signature.as_ref().ok_or(LedgerError::NotSealed)?;
        let hash = self.hash();
        if !validate_work(hash.as_bytes(), difficulty) {
            return Err(LedgerError::InsufficientWork { difficulty });
        }
        if !verify_signature(hash.as_bytes(), signature, &self.header.origin) {
            return Err(LedgerError::InvalidSignature);
        }
        if self.header.merkle_root != self.generate_merkle_root() {
            return Err(LedgerError::MerkleMismatch);
        }
        Ok(())
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block {} prev={} txs={} nonce={}",
            self.hash().short(),
            self.prev_block()
                .map(|p| p.short())
                .unwrap_or_else(|| "genesis".into()),
            self.transactions.len(),
            self.header.nonce,
        )
    }
}
