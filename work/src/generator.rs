//! Parallel nonce search (multi-threaded CPU).
//!
//! Used by transaction senders. Block mining lives in the node's miner,
//! which must stay interruptible and therefore hashes on a single thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use rayon::prelude::*;

use crate::{validate_work, WorkError, MAX_DIFFICULTY};

/// Nonces tried per thread between checks of the shared "found" flag.
const BATCH_SIZE: u64 = 4096;

/// Searches for a nonce whose header hash meets a difficulty.
pub struct WorkGenerator;

impl WorkGenerator {
    /// Find a nonce `n` such that `hash_at(n)` has `difficulty` leading zero
    /// bits.
    ///
    /// The nonce space is striped across rayon's threads; the first thread
    /// to succeed stops the others. The returned nonce is *a* solution, not
    /// necessarily the smallest one.
    pub fn generate<F>(&self, difficulty: u32, hash_at: F) -> Result<u64, WorkError>
    where
        F: Fn(u64) -> [u8; 32] + Sync,
    {
        if difficulty > MAX_DIFFICULTY {
            return Err(WorkError::DifficultyOutOfRange {
                difficulty,
                max: MAX_DIFFICULTY,
            });
        }
        if difficulty == 0 {
            return Ok(0);
        }

        let found = AtomicU64::new(0);
        let done = AtomicBool::new(false);
        let num_threads = rayon::current_num_threads().max(1) as u64;

        (0..num_threads).into_par_iter().for_each(|thread_id| {
            let mut nonce = thread_id;
            loop {
                if done.load(Ordering::Relaxed) {
                    return;
                }
                for _ in 0..BATCH_SIZE {
                    if validate_work(&hash_at(nonce), difficulty) {
                        if !done.swap(true, Ordering::AcqRel) {
                            found.store(nonce, Ordering::Release);
                        }
                        return;
                    }
                    nonce = match nonce.checked_add(num_threads) {
                        Some(next) => next,
                        None => return,
                    };
                }
            }
        });

        if done.load(Ordering::Acquire) {
            Ok(found.load(Ordering::Acquire))
        } else {
            Err(WorkError::Exhausted(difficulty))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringchain_crypto::blake2b_256_multi;

    fn header_hash(nonce: u64) -> [u8; 32] {
        blake2b_256_multi(&[b"tx header", &nonce.to_be_bytes()])
    }

    #[test]
    fn generated_nonce_validates() {
        let nonce = WorkGenerator.generate(10, header_hash).unwrap();
        assert!(validate_work(&header_hash(nonce), 10));
    }

    #[test]
    fn zero_difficulty_returns_zero() {
        assert_eq!(WorkGenerator.generate(0, header_hash).unwrap(), 0);
    }

    #[test]
    fn out_of_range_difficulty_is_rejected() {
        let err = WorkGenerator.generate(MAX_DIFFICULTY + 1, header_hash);
        assert!(matches!(err, Err(WorkError::DifficultyOutOfRange { .. })));
    }
}
