#![warn(missing_docs)]

//! This crate provides an in-memory, authenticated B+ tree: an ordered
//! key-value index in which every node carries a BLAKE3 digest of its
//! subtree. Digests are kept current after every mutation, so the root
//! digest summarizes the whole tree and two trees can be compared by
//! descending only into subtrees whose digests differ.
//!
//! Construct a [`Tree`] with a branch fanout and a leaf capacity:
//!
//! ```rust
//! use dialog_merkle_tree::Tree;
//!
//! let mut ours = Tree::<u32, Vec<u8>>::init(7, 10)?;
//! let mut theirs = Tree::<u32, Vec<u8>>::init(7, 10)?;
//!
//! for key in 0..100 {
//!     ours.insert(key, key.to_be_bytes().to_vec())?;
//!     theirs.insert(key, key.to_be_bytes().to_vec())?;
//! }
//! assert_eq!(ours.digest(), theirs.digest());
//!
//! theirs.replace(&42, b"changed".to_vec())?;
//!
//! // Only the leaf holding key 42 differs
//! let differences = ours.diff(&theirs)?;
//! assert_eq!(differences.len(), 1);
//!
//! println!("{}", ours.digest());
//! # Ok::<(), dialog_merkle_tree::DialogMerkleTreeError>(())
//! ```

mod key;
pub use key::*;

mod entry;
pub use entry::*;

mod digest;
pub use digest::*;

mod config;
pub use config::*;

mod error;
pub use error::*;

mod search;
pub use search::*;

mod node;
pub use node::*;

mod arena;

mod level;
pub use level::Level;

mod tree;
pub use tree::*;

mod split;

mod rebalance;

mod range;
pub use range::*;

/// Structural and entry-level comparison of trees.
///
/// This module provides functionality for:
/// - Finding the differing node pairs of two trees (`diff`)
/// - Computing the entry changes between two trees (`changes`)
/// - Applying changes to a tree (`integrate`) with deterministic conflict
///   resolution.
pub mod differential;
pub use differential::*;

mod stats;
pub use stats::*;

mod verify;
