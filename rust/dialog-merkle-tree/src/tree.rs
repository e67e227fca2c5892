use std::collections::{BTreeMap, BTreeSet};

use crate::{
    DialogMerkleTreeError, Digest, Entry, KeyType, Node, NodeBody, NodeId, TreeConfig, TreeStats,
    ValueType,
    arena::Arena,
    level::{Level, Levels},
    search::{binary_search, child_index, insertion_point, key_binary_search},
};

/// An in-memory B+ tree whose nodes carry content digests.
///
/// Leaves hold up to `entries` key/value pairs and are chained left to right
/// for range scans; branches hold up to `order` children. Every mutation
/// recomputes the digest of each node it changed and of every ancestor of
/// those nodes before returning, so [`Tree::digest`] and the per-node
/// digests used by [`Tree::diff`] are never stale.
///
/// ```rust
/// use dialog_merkle_tree::Tree;
///
/// let mut tree = Tree::<u32, u32>::init(7, 10)?;
/// for key in [24, 72, 1, 39, 53] {
///     tree.insert(key, key)?;
/// }
///
/// assert_eq!(tree.search(&24)?, &24);
/// assert!(tree.search(&100).is_err());
/// # Ok::<(), dialog_merkle_tree::DialogMerkleTreeError>(())
/// ```
#[derive(Clone, Debug)]
pub struct Tree<Key, Value>
where
    Key: KeyType,
{
    pub(crate) config: TreeConfig,
    pub(crate) arena: Arena<Key, Value>,
    pub(crate) levels: Levels,
    pub(crate) root: Option<NodeId>,
    pub(crate) len: usize,
    pub(crate) stats: TreeStats,
}

impl<Key, Value> Tree<Key, Value>
where
    Key: KeyType,
    Value: ValueType,
{
    /// Creates an empty [`Tree`] with the given shape.
    pub fn new(config: TreeConfig) -> Result<Self, DialogMerkleTreeError> {
        config.validate()?;
        Ok(Tree {
            config,
            arena: Arena::new(),
            levels: Levels::default(),
            root: None,
            len: 0,
            stats: TreeStats::default(),
        })
    }

    /// Creates an empty [`Tree`] whose branches hold at most `order`
    /// children and whose leaves hold at most `entries` entries.
    pub fn init(order: usize, entries: usize) -> Result<Self, DialogMerkleTreeError> {
        Self::new(TreeConfig::new(order, entries)?)
    }

    /// Create a new [`Tree`] from a [`BTreeMap`], inserting in ascending
    /// key order.
    pub fn from_collection(
        config: TreeConfig,
        collection: BTreeMap<Key, Value>,
    ) -> Result<Self, DialogMerkleTreeError> {
        let mut tree = Self::new(config)?;
        for (key, value) in collection {
            tree.insert(key, value)?;
        }
        Ok(tree)
    }

    /// The shape parameters of this tree.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Number of entries stored in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of branch levels above the leaves. A tree whose root is a
    /// leaf (or that is empty) has height `0`.
    pub fn height(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// Counters of the structural work performed so far.
    pub fn stats(&self) -> TreeStats {
        self.stats
    }

    /// Returns the [`Node`] representing the root of this tree.
    ///
    /// Returns `None` if the tree is empty.
    pub fn root(&self) -> Option<&Node<Key, Value>> {
        self.root.and_then(|id| self.arena.get(id).ok())
    }

    /// Looks up a node of this tree by identifier.
    pub fn node(&self, id: NodeId) -> Result<&Node<Key, Value>, DialogMerkleTreeError> {
        self.arena.get(id)
    }

    /// The ends of the sibling list at `level` (leaves are level `0`).
    pub fn level(&self, level: usize) -> Option<&Level> {
        self.levels.get(level)
    }

    /// Returns the digest of the root, or [`Digest::NULL`] for an empty tree.
    pub fn digest(&self) -> Digest {
        self.root()
            .map(|root| *root.digest())
            .unwrap_or(Digest::NULL)
    }

    /// Retrieves the value associated with `key` from the tree.
    pub fn get(&self, key: &Key) -> Result<Option<&Value>, DialogMerkleTreeError> {
        match self.search(key) {
            Ok(value) => Ok(Some(value)),
            Err(DialogMerkleTreeError::NotFound) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Retrieves the value associated with `key`, failing with
    /// [`DialogMerkleTreeError::NotFound`] if it is absent.
    pub fn search(&self, key: &Key) -> Result<&Value, DialogMerkleTreeError> {
        let Some(leaf) = self.find_leaf(key)? else {
            return Err(DialogMerkleTreeError::NotFound);
        };
        let entries = self.arena.get(leaf)?.entries()?;
        let position = binary_search(entries, key, |entry| &entry.key);
        if position < 0 {
            return Err(DialogMerkleTreeError::NotFound);
        }
        Ok(&entries[position as usize].value)
    }

    /// Whether `key` is present in the tree.
    pub fn contains_key(&self, key: &Key) -> Result<bool, DialogMerkleTreeError> {
        Ok(self.get(key)?.is_some())
    }

    /// Inserts a new `key`/`value` pair.
    ///
    /// Fails with [`DialogMerkleTreeError::DuplicateKey`], leaving the tree
    /// untouched, if `key` is already present.
    pub fn insert(&mut self, key: Key, value: Value) -> Result<(), DialogMerkleTreeError> {
        let entry = Entry::new(key, value);

        let Some(leaf) = self.find_leaf(&entry.key)? else {
            let root = self.arena.allocate(|id| Node::leaf(id, vec![entry]));
            self.levels.push(&mut self.arena, root)?;
            self.root = Some(root);
            self.len = 1;
            return self.refresh([root]);
        };

        let (position, count) = {
            let entries = self.arena.get(leaf)?.entries()?;
            (
                binary_search(entries, &entry.key, |entry| &entry.key),
                entries.len(),
            )
        };
        if position >= 0 {
            return Err(DialogMerkleTreeError::DuplicateKey);
        }
        let index = insertion_point(position);

        let touched = if count < self.config.entries {
            self.arena
                .get_mut(leaf)?
                .as_leaf_mut()?
                .entries
                .insert(index, entry);
            vec![leaf]
        } else {
            self.split_leaf(leaf, index, entry)?
        };

        self.len += 1;
        self.refresh(touched)
    }

    /// Replaces the value stored under an existing `key`, returning the
    /// previous value. The shape of the tree does not change.
    pub fn replace(&mut self, key: &Key, value: Value) -> Result<Value, DialogMerkleTreeError> {
        let Some(leaf) = self.find_leaf(key)? else {
            return Err(DialogMerkleTreeError::NotFound);
        };
        let entries = &mut self.arena.get_mut(leaf)?.as_leaf_mut()?.entries;
        let position = binary_search(entries.as_slice(), key, |entry| &entry.key);
        if position < 0 {
            return Err(DialogMerkleTreeError::NotFound);
        }
        let previous = std::mem::replace(&mut entries[position as usize].value, value);
        self.refresh([leaf])?;
        Ok(previous)
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.levels.clear();
        self.root = None;
        self.len = 0;
    }

    /// Descends from the root to the leaf that owns `key`.
    pub(crate) fn find_leaf(&self, key: &Key) -> Result<Option<NodeId>, DialogMerkleTreeError> {
        let Some(mut cursor) = self.root else {
            return Ok(None);
        };

        for _ in 0..self.levels.len() {
            match &self.arena.get(cursor)?.body {
                NodeBody::Leaf(_) => return Ok(Some(cursor)),
                NodeBody::Internal(internal) => {
                    let index = child_index(key_binary_search(&internal.keys, key));
                    cursor = *internal.children.get(index).ok_or_else(|| {
                        DialogMerkleTreeError::UnexpectedTreeShape(format!(
                            "Branch {cursor} has no child at {index}"
                        ))
                    })?;
                }
            }
        }

        Err(DialogMerkleTreeError::UnexpectedTreeShape(format!(
            "No leaf reached after descending {} levels",
            self.levels.len()
        )))
    }

    /// Points every child of `parent` back at it, recording each child's
    /// slot.
    pub(crate) fn adopt_children(&mut self, parent: NodeId) -> Result<(), DialogMerkleTreeError> {
        let children = self.arena.get(parent)?.children()?.to_vec();
        for (slot, child) in children.into_iter().enumerate() {
            let child = self.arena.get_mut(child)?;
            child.parent = Some(parent);
            child.slot = slot;
        }
        Ok(())
    }

    /// Recomputes the digest of a node from its current content.
    pub(crate) fn compute_digest(&self, id: NodeId) -> Result<Digest, DialogMerkleTreeError> {
        Ok(match &self.arena.get(id)?.body {
            NodeBody::Leaf(leaf) => Digest::of_leaf(&leaf.entries, self.config.digest),
            NodeBody::Internal(internal) => {
                let digests = internal
                    .children
                    .iter()
                    .map(|child| self.arena.get(*child).map(|child| child.digest))
                    .collect::<Result<Vec<_>, _>>()?;
                Digest::of_children(&digests)
            }
        })
    }

    /// Recomputes the digests of every `touched` node still in the tree and
    /// of all their ancestors, lower levels first.
    pub(crate) fn refresh<Touched>(&mut self, touched: Touched) -> Result<(), DialogMerkleTreeError>
    where
        Touched: IntoIterator<Item = NodeId>,
    {
        let mut pending = BTreeSet::new();
        for id in touched {
            // Nodes merged away during the operation no longer need a digest
            if !self.arena.contains(id) {
                continue;
            }
            let mut cursor = Some(id);
            while let Some(id) = cursor {
                let node = self.arena.get(id)?;
                if !pending.insert((node.level, id)) {
                    break;
                }
                cursor = node.parent;
            }
        }

        for (_, id) in pending {
            let digest = self.compute_digest(id)?;
            self.arena.get_mut(id)?.digest = digest;
        }
        Ok(())
    }
}
