/// Counters of structural events performed by a [Tree](crate::Tree).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    /// Number of leaf splits performed
    pub leaf_splits: u64,
    /// Number of branch splits performed
    pub internal_splits: u64,
    /// Number of entries borrowed by an underflowing leaf from a sibling
    pub leaf_borrows: u64,
    /// Number of children borrowed by an underflowing branch from a sibling
    pub internal_borrows: u64,
    /// Number of leaf merges performed
    pub leaf_merges: u64,
    /// Number of branch merges performed
    pub internal_merges: u64,
    /// Number of times a new root was placed above the old one
    pub root_grows: u64,
    /// Number of times the root was replaced by its only child
    pub root_collapses: u64,
}

impl TreeStats {
    /// Emits current statistics to the tracing infrastructure.
    pub fn emit_tracing(&self) {
        tracing::info!(
            target: "dialog_merkle_tree::stats",
            leaf_splits = self.leaf_splits,
            internal_splits = self.internal_splits,
            leaf_borrows = self.leaf_borrows,
            internal_borrows = self.internal_borrows,
            leaf_merges = self.leaf_merges,
            internal_merges = self.internal_merges,
            root_grows = self.root_grows,
            root_collapses = self.root_collapses,
            "merkle tree stats snapshot"
        );
    }
}
