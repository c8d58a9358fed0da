//! Messages the engine hands to the replication layer.

use serde::{Deserialize, Serialize};

use ringchain_ledger::{Block, Transaction};

use crate::NodeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Transaction,
    Block,
}

/// An item to replicate: its kind and its encoded form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn transaction(tx: &Transaction) -> Result<Self, NodeError> {
        Ok(Self {
            kind: MessageKind::Transaction,
            payload: serde_json::to_vec(tx)?,
        })
    }

    pub fn block(block: &Block) -> Result<Self, NodeError> {
        Ok(Self {
            kind: MessageKind::Block,
            payload: serde_json::to_vec(block)?,
        })
    }

    pub fn decode_transaction(&self) -> Result<Transaction, NodeError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }

    pub fn decode_block(&self) -> Result<Block, NodeError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringchain_crypto::keypair_from_seed;

    #[test]
    fn carries_the_encoded_item() {
        let kp = keypair_from_seed(&[3; 32]);
        let tx = Transaction::create(&kp, kp.public.clone(), b"x".to_vec(), 0).unwrap();
        let msg = Message::transaction(&tx).unwrap();
        assert_eq!(msg.kind, MessageKind::Transaction);
        assert_eq!(msg.decode_transaction().unwrap(), tx);
        assert!(msg.decode_block().is_err());
    }
}
