//! Merkle root over a block's transaction hashes.
//!
//! - An empty set yields the all-zero hash.
//! - Odd levels duplicate their last node before pairing.

use ringchain_crypto::blake2b_256_multi;

const EMPTY_ROOT: [u8; 32] = [0u8; 32];

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    blake2b_256_multi(&[left, right])
}

/// Reduce leaf hashes to a single root, in place.
pub fn merkle_root(mut nodes: Vec<[u8; 32]>) -> [u8; 32] {
    if nodes.is_empty() {
        return EMPTY_ROOT;
    }

    let mut len = nodes.len();
    while len > 1 {
        let mut write = 0;
        let mut read = 0;
        while read < len {
            let left = nodes[read];
            let right = if read + 1 < len { nodes[read + 1] } else { left };
            nodes[write] = hash_pair(&left, &right);
            write += 1;
            read += 2;
        }
        len = write;
    }

    nodes[0]
}
