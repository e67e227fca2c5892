use thiserror::Error;

use crate::TreeConfig;

/// The common error type used by this crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DialogMerkleTreeError {
    /// An insert targeted a key that is already present
    #[error("Key is already present in the tree")]
    DuplicateKey,

    /// A lookup or removal targeted a key that is not present
    #[error("Key was not found in the tree")]
    NotFound,

    /// The requested order/entries are outside the supported bounds
    #[error("Invalid tree configuration: {0}")]
    InvalidConfiguration(String),

    /// Two trees with different configurations were compared
    #[error("Trees were built with different configurations ({ours} vs {theirs})")]
    ConfigurationMismatch {
        /// Configuration of the tree the comparison started from
        ours: TreeConfig,
        /// Configuration of the tree it was compared against
        theirs: TreeConfig,
    },

    /// The tree did not match the expected shape
    #[error("Tree did not match expected shape: {0}")]
    UnexpectedTreeShape(String),
}
