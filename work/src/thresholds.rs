//! Difficulty thresholds per kind of work.

/// Which object a proof-of-work was computed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkKind {
    /// A block header, sealed by the miner.
    Block,
    /// A transaction header, solved by the sender.
    Transaction,
}

/// Two leading zero bytes for blocks.
pub const DEFAULT_BLOCK_DIFFICULTY: u32 = 16;
/// One leading zero byte for transactions.
pub const DEFAULT_TRANSACTION_DIFFICULTY: u32 = 8;

/// Leading-zero-bit thresholds for blocks and transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkThresholds {
    pub block: u32,
    pub transaction: u32,
}

impl WorkThresholds {
    pub fn new() -> Self {
        Self {
            block: DEFAULT_BLOCK_DIFFICULTY,
            transaction: DEFAULT_TRANSACTION_DIFFICULTY,
        }
    }

    /// Custom thresholds (low-difficulty devnets and tests).
    pub fn with(block: u32, transaction: u32) -> Self {
        Self { block, transaction }
    }

    pub fn threshold_for(&self, kind: WorkKind) -> u32 {
        match kind {
            WorkKind::Block => self.block,
            WorkKind::Transaction => self.transaction,
        }
    }
}

impl Default for WorkThresholds {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transactions_easier_than_blocks_by_default() {
        let t = WorkThresholds::new();
        assert!(t.threshold_for(WorkKind::Transaction) < t.threshold_for(WorkKind::Block));
    }

    #[test]
    fn custom_thresholds_propagate() {
        let t = WorkThresholds::with(4, 1);
        assert_eq!(t.threshold_for(WorkKind::Block), 4);
        assert_eq!(t.threshold_for(WorkKind::Transaction), 1);
    }
}
