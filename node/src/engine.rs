//! The consensus engine.
//!
//! A single task owns the chain and the pending block. It takes one input
//! at a time from the transaction queue, the block queue and the miner's
//! result queue, so none of its state needs a lock.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use ringchain_ledger::{diff_transactions, Block, Chain, LedgerError, Transaction};
use ringchain_store::BlockStore;
use ringchain_types::{BlockHash, PublicKey};
use ringchain_work::WorkThresholds;

use crate::miner::MinerHandle;
use crate::Message;

/// What became of a submitted transaction.
#[derive(Debug)]
pub enum TxOutcome {
    /// Added to the pending block and relayed.
    Accepted,
    /// Already in the pending block.
    Duplicate,
    /// Failed proof-of-work, signature or payload checks.
    Invalid(LedgerError),
}

/// What became of a submitted block.
#[derive(Debug)]
pub enum BlockOutcome {
    /// Appended to the chain; `carried` transactions of the old pending
    /// block moved into the new one.
    Appended { carried: usize },
    /// Already in the chain.
    Known,
    /// Unsealed, or failed proof-of-work, signature or Merkle root checks.
    Invalid(LedgerError),
    /// Does not extend the current tip.
    Gap {
        tip: Option<BlockHash>,
        prev: Option<BlockHash>,
    },
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub thresholds: WorkThresholds,
    /// Pause between accepting a transaction and relaying it.
    pub tx_broadcast_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: WorkThresholds::default(),
            tx_broadcast_delay: Duration::from_millis(300),
        }
    }
}

/// Inputs the engine loop selects over.
pub struct EngineQueues {
    pub transactions: mpsc::Receiver<Transaction>,
    pub blocks: mpsc::Receiver<Block>,
    pub mined: mpsc::UnboundedReceiver<Block>,
}

pub struct ConsensusEngine {
    origin: PublicKey,
    config: EngineConfig,
    chain: Chain,
    pending: Block,
    store: Arc<dyn BlockStore>,
    miner: MinerHandle,
    outbound: mpsc::Sender<Message>,
}

impl ConsensusEngine {
    /// An engine with an empty chain. Appended blocks are written to
    /// `store`; accepted items are emitted on `outbound` for replication.
    pub fn new(
        origin: PublicKey,
        config: EngineConfig,
        store: Arc<dyn BlockStore>,
        miner: MinerHandle,
        outbound: mpsc::Sender<Message>,
    ) -> Self {
        let pending = Block::pending(None, origin.clone());
        Self {
            origin,
            config,
            chain: Chain::new(),
            pending,
            store,
            miner,
            outbound,
        }
    }

    /// A fresh pending block on top of the current tip.
    pub fn create_pending_block(&self) -> Block {
        Block::pending(self.tip(), self.origin.clone())
    }

    fn tip(&self) -> Option<BlockHash> {
        self.chain.previous_block().map(Block::hash)
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn pending(&self) -> &Block {
        &self.pending
    }

    async fn reseed_miner(&self) {
        if let Err(e) = self.miner.seed(self.pending.clone()).await {
            warn!(error = %e, "could not reseed miner");
        }
    }

    async fn emit(&self, message: Result<Message, crate::NodeError>) {
        match message {
            Ok(message) => {
                if self.outbound.send(message).await.is_err() {
                    debug!("replication relay gone, message dropped");
                }
            }
            Err(e) => warn!(error = %e, "could not encode outbound message"),
        }
    }

    /// Validate a transaction and add it to the pending block.
    pub async fn handle_transaction(&mut self, tx: Transaction) -> TxOutcome {
        let hash = tx.hash().short();
        if self.pending.contains(&tx) {
            debug!(tx = %hash, "duplicate transaction dropped");
            return TxOutcome::Duplicate;
        }
        if let Err(e) = tx.verify(self.config.thresholds.transaction) {
            warn!(tx = %hash, error = %e, "invalid transaction dropped");
            return TxOutcome::Invalid(e);
        }

        self.pending.add_transaction(tx.clone());
        debug!(tx = %hash, pending = self.pending.transactions.len(), "transaction accepted");
        self.reseed_miner().await;

        if !self.config.tx_broadcast_delay.is_zero() {
            tokio::time::sleep(self.config.tx_broadcast_delay).await;
        }
        self.emit(Message::transaction(&tx)).await;
        TxOutcome::Accepted
    }

    /// Validate a sealed block and, if it extends the tip, append it.
    pub async fn handle_block(&mut self, block: Block) -> BlockOutcome {
        let hash = block.hash();
        if self.chain.exists(&block) {
            debug!(block = %hash, "known block dropped");
            return BlockOutcome::Known;
        }
        if let Err(e) = block.verify(self.config.thresholds.block) {
            warn!(block = %hash, error = %e, "invalid block dropped");
            return BlockOutcome::Invalid(e);
        }
        let tip = self.tip();
        let prev = block.prev_block().copied();
        if prev != tip {
            // Repair would pull the missing ancestors; not done here.
            warn!(
                block = %hash,
                prev = ?prev.map(|h| h.short()),
                tip = ?tip.map(|h| h.short()),
                "gap in chain, block not appended"
            );
            return BlockOutcome::Gap { tip, prev };
        }

        let carried = if block.header.merkle_root != self.pending.generate_merkle_root() {
            diff_transactions(&self.pending.transactions, &block.transactions)
        } else {
            Vec::new()
        };

        self.chain.append(block.clone());
        if let Err(e) = self.store.put_block(&block) {
            warn!(block = %hash, error = %e, "could not store block");
        }
        info!(
            block = %hash,
            height = self.chain.len(),
            transactions = block.transactions.len(),
            carried = carried.len(),
            "block appended"
        );
        self.emit(Message::block(&block)).await;

        self.pending = self.create_pending_block();
        let carried_count = carried.len();
        for tx in carried {
            self.pending.add_transaction(tx);
        }
        self.reseed_miner().await;

        BlockOutcome::Appended {
            carried: carried_count,
        }
    }

    /// Process inputs until shutdown or until every input is closed.
    pub async fn run(mut self, mut queues: EngineQueues, mut shutdown: broadcast::Receiver<()>) {
        info!(origin = %hex::encode(self.origin.as_bytes()), "consensus engine started");
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                Some(block) = queues.mined.recv() => {
                    self.handle_block(block).await;
                }
                Some(block) = queues.blocks.recv() => {
                    self.handle_block(block).await;
                }
                Some(tx) = queues.transactions.recv() => {
                    self.handle_transaction(tx).await;
                }
                else => break,
            }
        }
        info!(height = self.chain.len(), "consensus engine stopped");
    }
}
