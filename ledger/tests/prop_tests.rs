use std::collections::BTreeSet;

use proptest::prelude::*;

use ringchain_ledger::{diff_transactions, Chain, Block, Transaction, TransactionHeader};
use ringchain_types::{PublicKey, Signature, Timestamp};

fn tx(sig: u16) -> Transaction {
    let mut bytes = [0u8; 64];
    bytes[..2].copy_from_slice(&sig.to_be_bytes());
    Transaction {
        header: TransactionHeader {
            from: PublicKey([1u8; 32]),
            to: PublicKey([2u8; 32]),
            timestamp: Timestamp::EPOCH,
            payload_hash: [0u8; 32],
            payload_length: 0,
            nonce: sig as u64,
        },
        payload: Vec::new(),
        signature: Signature(bytes),
    }
}

fn sorted(set: &BTreeSet<u16>) -> Vec<Transaction> {
    set.iter().copied().map(tx).collect()
}

proptest! {
    /// diff(a, a) is empty for a slice sorted by signature.
    #[test]
    fn self_diff_is_empty(set in prop::collection::btree_set(any::<u16>(), 0..40)) {
        let a = sorted(&set);
        prop_assert!(diff_transactions(&a, &a).is_empty());
    }

    /// With both sides sorted the cursor walk equals the set difference.
    #[test]
    fn sorted_inputs_give_set_difference(
        left in prop::collection::btree_set(any::<u16>(), 0..40),
        right in prop::collection::btree_set(any::<u16>(), 0..40),
    ) {
        let diff = diff_transactions(&sorted(&left), &sorted(&right));
        let expected: Vec<u16> = left.difference(&right).copied().collect();
        let got: Vec<u16> = diff
            .iter()
            .map(|t| u16::from_be_bytes([t.signature.0[0], t.signature.0[1]]))
            .collect();
        prop_assert_eq!(got, expected);
    }

    /// Chain length never decreases while appending.
    #[test]
    fn chain_length_is_monotonic(count in 0usize..20) {
        let mut chain = Chain::new();
        let mut prev = None;
        let mut last_len = 0;
        for i in 0..count {
            let mut block = Block::pending(prev, PublicKey([3u8; 32]));
            block.header.nonce = i as u64;
            prev = Some(block.hash());
            chain.append(block);
            prop_assert!(chain.len() > last_len);
            last_len = chain.len();
        }
        prop_assert_eq!(chain.len(), count);
    }
}
