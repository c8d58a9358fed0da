//! Transactions of one block missing from another.

use crate::Transaction;

/// Transactions of `a` whose signature is not found in `b`.
///
/// Both slices must share the same relative ordering (blocks built by
/// [`Block::add_transaction`](crate::Block::add_transaction) are ordered by
/// signature). A single cursor walks `b` forward and never resets: for each
/// transaction of `a` the scan starts at the cursor, and a match moves the
/// cursor past the matched position. With diverging orders this under- or
/// over-reports; it is not a general set difference.
pub fn diff_transactions(a: &[Transaction], b: &[Transaction]) -> Vec<Transaction> {
    let mut diff = Vec::new();
    let mut cursor = 0;

    for tx in a {
        match b[cursor..]
            .iter()
            .position(|candidate| candidate.signature == tx.signature)
        {
            Some(offset) => cursor += offset + 1,
            None => diff.push(tx.clone()),
        }
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransactionHeader;
    use ringchain_types::{PublicKey, Signature, Timestamp};

    fn tx(sig: u8) -> Transaction {
        let mut bytes = [0u8; 64];
        bytes[0] = sig;
        Transaction {
            header: TransactionHeader {
                from: PublicKey([0u8; 32]),
                to: PublicKey([0u8; 32]),
                timestamp: Timestamp::EPOCH,
                payload_hash: [0u8; 32],
                payload_length: 0,
                nonce: 0,
            },
            payload: Vec::new(),
            signature: Signature(bytes),
        }
    }

    fn sigs(txs: &[Transaction]) -> Vec<u8> {
        txs.iter().map(|t| t.signature.0[0]).collect()
    }

    #[test]
    fn identical_sorted_slices_have_no_diff() {
        let a = vec![tx(1), tx(2), tx(3)];
        assert!(diff_transactions(&a, &a).is_empty());
    }

    #[test]
    fn missing_from_b_are_reported_in_order() {
        let a = vec![tx(1), tx(2), tx(3), tx(4)];
        let b = vec![tx(2), tx(4)];
        assert_eq!(sigs(&diff_transactions(&a, &b)), vec![1, 3]);
    }

    #[test]
    fn empty_b_returns_all_of_a() {
        let a = vec![tx(1), tx(2)];
        assert_eq!(sigs(&diff_transactions(&a, &[])), vec![1, 2]);
    }

    #[test]
    fn extra_in_b_are_ignored() {
        let a = vec![tx(2)];
        let b = vec![tx(1), tx(2), tx(3)];
        assert!(diff_transactions(&a, &b).is_empty());
    }

    #[test]
    fn diverging_order_over_reports() {
        // The cursor never moves back, so an out-of-order match is missed.
        let a = vec![tx(1), tx(2)];
        let b = vec![tx(2), tx(1)];
        assert_eq!(sigs(&diff_transactions(&a, &b)), vec![2]);
    }
}
