//! The block miner.
//!
//! One dedicated OS thread hashes the current seed block, bumping the nonce
//! until the header meets the block difficulty. A new seed replaces the
//! current work immediately: the thread checks for one before every hash.
//!
//! The handoff is a rendezvous. [`MinerHandle::seed`] resolves only once
//! the thread has taken the block, which holds the engine back while the
//! miner is between checks.

use std::thread;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace};

use ringchain_ledger::Block;
use ringchain_types::{KeyPair, Timestamp};
use ringchain_work::validate_work;

use crate::NodeError;

type Seed = (Block, oneshot::Sender<()>);

/// Engine-side end of the seed handoff. Dropping it stops the miner.
pub struct MinerHandle {
    seeds: mpsc::Sender<Seed>,
}

impl MinerHandle {
    /// Hand `block` to the miner, abandoning whatever it was working on.
    pub async fn seed(&self, block: Block) -> Result<(), NodeError> {
        let (taken_tx, taken_rx) = oneshot::channel();
        self.seeds
            .send((block, taken_tx))
            .await
            .map_err(|_| NodeError::MinerStopped)?;
        taken_rx.await.map_err(|_| NodeError::MinerStopped)
    }
}

#[cfg(test)]
impl MinerHandle {
    /// A handle with no thread behind it. Each seed is taken at once and
    /// handed to the returned receiver.
    pub(crate) fn recording() -> (Self, mpsc::UnboundedReceiver<Block>) {
        let (seeds_tx, mut seeds_rx) = mpsc::channel::<Seed>(1);
        let (seen_tx, seen_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some((block, taken)) = seeds_rx.recv().await {
                if seen_tx.send(block).is_err() {
                    break;
                }
                let _ = taken.send(());
            }
        });
        (Self { seeds: seeds_tx }, seen_rx)
    }
}

/// Proof-of-work miner for pending blocks.
pub struct Miner {
    keypair: KeyPair,
    difficulty: u32,
    results: mpsc::UnboundedSender<Block>,
}

impl Miner {
    /// Spawn the miner thread. Sealed blocks are sent on `results`.
    pub fn start(
        keypair: KeyPair,
        difficulty: u32,
        results: mpsc::UnboundedSender<Block>,
    ) -> Result<(MinerHandle, thread::JoinHandle<()>), NodeError> {
        let (seeds_tx, seeds_rx) = mpsc::channel(1);
        let miner = Self {
            keypair,
            difficulty,
            results,
        };
        let thread = thread::Builder::new()
            .name("ringchain-miner".into())
            .spawn(move || miner.run(seeds_rx))?;
        Ok((MinerHandle { seeds: seeds_tx }, thread))
    }

    fn run(self, mut seeds: mpsc::Receiver<Seed>) {
        info!(difficulty = self.difficulty, "miner started");
        let mut current: Option<Block> = None;

        loop {
            let Some(mut block) = current.take() else {
                // Idle: nothing worth mining until the next seed.
                match seeds.blocking_recv() {
                    Some((block, taken)) => {
                        let _ = taken.send(());
                        current = prepare_seed(block);
                        continue;
                    }
                    None => break,
                }
            };

            match seeds.try_recv() {
                Ok((next, taken)) => {
                    let _ = taken.send(());
                    trace!(abandoned_nonce = block.header.nonce, "miner reseeded");
                    current = prepare_seed(next);
                    continue;
                }
                Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            if validate_work(block.hash().as_bytes(), self.difficulty) {
                block.seal(&self.keypair);
                debug!(
                    hash = %block.hash(),
                    nonce = block.header.nonce,
                    transactions = block.transactions.len(),
                    "block mined"
                );
                if self.results.send(block).is_err() {
                    break;
                }
                continue;
            }

            match block.header.nonce.checked_add(1) {
                Some(next) => block.header.nonce = next,
                None => {
                    block.header.timestamp = Timestamp::now();
                    block.header.nonce = 0;
                }
            }
            current = Some(block);
        }
        info!("miner stopped");
    }
}

/// Reset a seed for a fresh search: Merkle root over its transactions,
/// nonce 0, current time, no signature. `None` for an empty block, which
/// is never mined.
pub fn prepare_seed(mut block: Block) -> Option<Block> {
    if block.transactions.is_empty() {
        trace!("empty seed, miner idle");
        return None;
    }
    block.header.merkle_root = block.generate_merkle_root();
    block.header.nonce = 0;
    block.header.timestamp = Timestamp::now();
    block.signature = None;
    Some(block)
}
