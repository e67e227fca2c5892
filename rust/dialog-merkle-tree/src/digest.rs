use std::fmt::Display;

use base58::ToBase58;
use serde::{Deserialize, Serialize};

use crate::{DigestScheme, Entry, KeyType, ValueType};

/// The size of a [`Digest`] in bytes.
pub const DIGEST_SIZE: usize = 32;

/// A BLAKE3 content digest of a node.
///
/// A leaf's digest covers its stored values (and, under
/// [`DigestScheme::KeysAndValues`], its keys). A branch's digest covers the
/// ordered digests of its children. Two subtrees with equal digests hold
/// equal content, which is what lets [`Tree::diff`](crate::Tree::diff) skip
/// them.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Digest([u8; DIGEST_SIZE]);

impl Digest {
    /// The digest reported by an empty tree.
    pub const NULL: Digest = Digest([0u8; DIGEST_SIZE]);

    /// Computes the digest of the given bytes.
    pub fn hash(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).into())
    }

    /// Computes the digest of the concatenation of `chunks`.
    pub fn hash_iter<'a, I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut hasher = blake3::Hasher::new();
        for chunk in chunks {
            hasher.update(chunk);
        }
        Self(hasher.finalize().into())
    }

    /// Computes the digest of a leaf holding `entries`.
    pub fn of_leaf<Key, Value>(entries: &[Entry<Key, Value>], scheme: DigestScheme) -> Self
    where
        Key: KeyType,
        Value: ValueType,
    {
        let mut hasher = blake3::Hasher::new();
        match scheme {
            DigestScheme::Values => {
                for entry in entries {
                    hasher.update(&entry.value.bytes());
                }
            }
            DigestScheme::KeysAndValues => {
                // Length prefixes keep ("ab", "c") and ("a", "bc") apart.
                for entry in entries {
                    let key = entry.key.bytes();
                    let value = entry.value.bytes();
                    hasher.update(&(key.len() as u64).to_le_bytes());
                    hasher.update(&key);
                    hasher.update(&(value.len() as u64).to_le_bytes());
                    hasher.update(&value);
                }
            }
        }
        Self(hasher.finalize().into())
    }

    /// Computes the digest of a branch from the digests of its children.
    pub fn of_children<'a, I>(children: I) -> Self
    where
        I: IntoIterator<Item = &'a Digest>,
    {
        Self::hash_iter(children.into_iter().map(|digest| digest.0.as_slice()))
    }

    /// The raw bytes of this [`Digest`].
    pub fn bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }

    /// Whether this is the empty-tree digest.
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

impl From<[u8; DIGEST_SIZE]> for Digest {
    fn from(value: [u8; DIGEST_SIZE]) -> Self {
        Digest(value)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0.to_base58())
    }
}
