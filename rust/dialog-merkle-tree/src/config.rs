use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::DialogMerkleTreeError;

/// The smallest supported branch fanout.
pub const MINIMUM_ORDER: usize = 3;

/// The smallest supported leaf capacity.
pub const MINIMUM_ENTRIES: usize = 1;

/// Which parts of a leaf feed its [`Digest`](crate::Digest).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestScheme {
    /// Only the stored values are hashed. Two leaves holding the same values
    /// under different keys share a digest.
    #[default]
    Values,
    /// Keys and values are both hashed.
    KeysAndValues,
}

/// Shape parameters of a [`Tree`](crate::Tree).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum number of children of a branch.
    pub order: usize,
    /// Maximum number of entries held by a leaf.
    pub entries: usize,
    /// How leaf digests are derived.
    #[serde(default)]
    pub digest: DigestScheme,
}

impl TreeConfig {
    /// Creates a validated configuration using [`DigestScheme::Values`].
    pub fn new(order: usize, entries: usize) -> Result<Self, DialogMerkleTreeError> {
        let config = TreeConfig {
            order,
            entries,
            digest: DigestScheme::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Returns a copy of this configuration using `scheme` for leaf digests.
    pub fn with_digest(self, scheme: DigestScheme) -> Self {
        TreeConfig {
            digest: scheme,
            ..self
        }
    }

    /// Checks that `order` and `entries` describe a buildable tree.
    pub fn validate(&self) -> Result<(), DialogMerkleTreeError> {
        if self.order < MINIMUM_ORDER {
            return Err(DialogMerkleTreeError::InvalidConfiguration(format!(
                "order must be at least {MINIMUM_ORDER} (got {})",
                self.order
            )));
        }
        if self.entries < MINIMUM_ENTRIES {
            return Err(DialogMerkleTreeError::InvalidConfiguration(format!(
                "entries must be at least {MINIMUM_ENTRIES} (got {})",
                self.entries
            )));
        }
        Ok(())
    }

    /// A leaf at or below this many entries rebalances when it loses one.
    pub(crate) fn leaf_threshold(&self) -> usize {
        self.entries.div_ceil(2)
    }

    /// A branch at or below this many children rebalances when it loses one.
    pub(crate) fn branch_threshold(&self) -> usize {
        self.order.div_ceil(2)
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            order: 7,
            entries: 10,
            digest: DigestScheme::default(),
        }
    }
}

impl Display for TreeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "order={}, entries={}, digest={:?}",
            self.order, self.entries, self.digest
        )
    }
}
