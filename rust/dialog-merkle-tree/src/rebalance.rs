//! Removal and underflow repair.
//!
//! A node that would drop to its minimum fill borrows one element from an
//! adjacent sibling under the same parent, or merges with it when the
//! sibling cannot spare one. A merge removes a separator from the parent,
//! which may underflow in turn. When the root branch is left with a single
//! child, that child becomes the new root.

use crate::{DialogMerkleTreeError, KeyType, NodeId, Tree, ValueType, search::binary_search};

/// The sibling chosen to repair an underflowing node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Sibling {
    Left(NodeId),
    Right(NodeId),
}

impl<Key, Value> Tree<Key, Value>
where
    Key: KeyType,
    Value: ValueType,
{
    /// Removes `key` and returns the value that was stored under it.
    ///
    /// Fails with [`DialogMerkleTreeError::NotFound`], leaving the tree
    /// untouched, if `key` is absent.
    pub fn remove(&mut self, key: &Key) -> Result<Value, DialogMerkleTreeError> {
        let Some(leaf) = self.find_leaf(key)? else {
            return Err(DialogMerkleTreeError::NotFound);
        };

        let (index, count, parent) = {
            let node = self.arena.get(leaf)?;
            let entries = node.entries()?;
            let position = binary_search(entries, key, |entry| &entry.key);
            if position < 0 {
                return Err(DialogMerkleTreeError::NotFound);
            }
            (position as usize, entries.len(), node.parent)
        };

        if parent.is_none() && count == 1 {
            let mut root = self.arena.release(leaf)?;
            let entry = root.as_leaf_mut()?.entries.remove(index);
            self.clear();
            tracing::trace!(target: "dialog_merkle_tree::root", "removed last entry");
            return Ok(entry.value);
        }

        let (value, touched) = match parent {
            Some(parent) if count <= self.config.leaf_threshold() => {
                self.rebalance_leaf(leaf, parent, index)?
            }
            _ => {
                let entry = self.arena.get_mut(leaf)?.as_leaf_mut()?.entries.remove(index);
                (entry.value, vec![leaf])
            }
        };

        self.len -= 1;
        self.refresh(touched)?;
        Ok(value)
    }

    /// Removes the entry at `index` from an underflowing `leaf`, borrowing
    /// from or merging with a sibling.
    fn rebalance_leaf(
        &mut self,
        leaf: NodeId,
        parent: NodeId,
        index: usize,
    ) -> Result<(Value, Vec<NodeId>), DialogMerkleTreeError> {
        let threshold = self.config.leaf_threshold();
        let slot = self.arena.get(leaf)?.slot;

        match self.select_sibling(leaf)? {
            Sibling::Left(left) if self.arena.get(left)?.count() > threshold => {
                let borrowed = self
                    .arena
                    .get_mut(left)?
                    .as_leaf_mut()?
                    .entries
                    .pop()
                    .ok_or_else(|| empty(left))?;
                let boundary = borrowed.key.clone();

                let entries = &mut self.arena.get_mut(leaf)?.as_leaf_mut()?.entries;
                let removed = entries.remove(index);
                entries.insert(0, borrowed);

                self.arena.get_mut(parent)?.as_internal_mut()?.keys[slot - 1] = boundary;

                self.stats.leaf_borrows += 1;
                tracing::trace!(
                    target: "dialog_merkle_tree::rebalance",
                    node = leaf.index(),
                    sibling = left.index(),
                    "leaf borrowed from left"
                );
                Ok((removed.value, vec![left, leaf]))
            }
            Sibling::Left(left) => {
                let mut entries =
                    std::mem::take(&mut self.arena.get_mut(leaf)?.as_leaf_mut()?.entries);
                let removed = entries.remove(index);
                self.arena
                    .get_mut(left)?
                    .as_leaf_mut()?
                    .entries
                    .extend(entries);

                self.levels.unlink(&mut self.arena, leaf)?;
                self.arena.release(leaf)?;

                self.stats.leaf_merges += 1;
                tracing::trace!(
                    target: "dialog_merkle_tree::rebalance",
                    node = leaf.index(),
                    sibling = left.index(),
                    "leaf merged into left"
                );

                let mut touched = vec![left];
                self.remove_separator(parent, slot - 1, &mut touched)?;
                Ok((removed.value, touched))
            }
            Sibling::Right(right) => {
                let removed = self.arena.get_mut(leaf)?.as_leaf_mut()?.entries.remove(index);

                if self.arena.get(right)?.count() > threshold {
                    let (borrowed, boundary) = {
                        let entries = &mut self.arena.get_mut(right)?.as_leaf_mut()?.entries;
                        let borrowed = entries.remove(0);
                        let boundary = entries
                            .first()
                            .map(|entry| entry.key.clone())
                            .ok_or_else(|| empty(right))?;
                        (borrowed, boundary)
                    };
                    self.arena
                        .get_mut(leaf)?
                        .as_leaf_mut()?
                        .entries
                        .push(borrowed);
                    self.arena.get_mut(parent)?.as_internal_mut()?.keys[slot] = boundary;

                    self.stats.leaf_borrows += 1;
                    tracing::trace!(
                        target: "dialog_merkle_tree::rebalance",
                        node = leaf.index(),
                        sibling = right.index(),
                        "leaf borrowed from right"
                    );
                    return Ok((removed.value, vec![leaf, right]));
                }

                let entries =
                    std::mem::take(&mut self.arena.get_mut(right)?.as_leaf_mut()?.entries);
                self.arena
                    .get_mut(leaf)?
                    .as_leaf_mut()?
                    .entries
                    .extend(entries);

                self.levels.unlink(&mut self.arena, right)?;
                self.arena.release(right)?;

                self.stats.leaf_merges += 1;
                tracing::trace!(
                    target: "dialog_merkle_tree::rebalance",
                    node = leaf.index(),
                    sibling = right.index(),
                    "leaf absorbed right"
                );

                let mut touched = vec![leaf];
                self.remove_separator(parent, slot, &mut touched)?;
                Ok((removed.value, touched))
            }
        }
    }

    /// Removes separator `index` (and the child to its right) from the
    /// branch `node`, repairing underflow upward until a branch can absorb
    /// the loss or the root shrinks.
    fn remove_separator(
        &mut self,
        mut node: NodeId,
        mut index: usize,
        touched: &mut Vec<NodeId>,
    ) -> Result<(), DialogMerkleTreeError> {
        let threshold = self.config.branch_threshold();

        loop {
            let (count, parent, slot) = {
                let entry = self.arena.get(node)?;
                (entry.count(), entry.parent, entry.slot)
            };
            touched.push(node);

            let Some(parent) = parent else {
                self.drop_separator(node, index)?;
                if count == 2 {
                    self.collapse_root(node, touched)?;
                }
                return Ok(());
            };

            if count > threshold {
                return self.drop_separator(node, index);
            }

            match self.select_sibling(node)? {
                Sibling::Left(left) if self.arena.get(left)?.count() > threshold => {
                    self.drop_separator(node, index)?;

                    let (key, child) = {
                        let internal = self.arena.get_mut(left)?.as_internal_mut()?;
                        let key = internal.keys.pop().ok_or_else(|| empty(left))?;
                        let child = internal.children.pop().ok_or_else(|| empty(left))?;
                        (key, child)
                    };
                    let separator = std::mem::replace(
                        &mut self.arena.get_mut(parent)?.as_internal_mut()?.keys[slot - 1],
                        key,
                    );
                    {
                        let internal = self.arena.get_mut(node)?.as_internal_mut()?;
                        internal.keys.insert(0, separator);
                        internal.children.insert(0, child);
                    }
                    self.adopt_children(node)?;

                    self.stats.internal_borrows += 1;
                    tracing::trace!(
                        target: "dialog_merkle_tree::rebalance",
                        node = node.index(),
                        sibling = left.index(),
                        "branch borrowed from left"
                    );
                    touched.push(left);
                    return Ok(());
                }
                Sibling::Left(left) => {
                    self.drop_separator(node, index)?;

                    let separator =
                        self.arena.get(parent)?.as_internal()?.keys[slot - 1].clone();
                    let (keys, children) = {
                        let internal = self.arena.get_mut(node)?.as_internal_mut()?;
                        (
                            std::mem::take(&mut internal.keys),
                            std::mem::take(&mut internal.children),
                        )
                    };
                    {
                        let internal = self.arena.get_mut(left)?.as_internal_mut()?;
                        internal.keys.push(separator);
                        internal.keys.extend(keys);
                        internal.children.extend(children);
                    }
                    self.adopt_children(left)?;

                    self.levels.unlink(&mut self.arena, node)?;
                    self.arena.release(node)?;

                    self.stats.internal_merges += 1;
                    tracing::trace!(
                        target: "dialog_merkle_tree::rebalance",
                        node = node.index(),
                        sibling = left.index(),
                        "branch merged into left"
                    );
                    touched.push(left);

                    node = parent;
                    index = slot - 1;
                }
                Sibling::Right(right) => {
                    self.drop_separator(node, index)?;

                    if self.arena.get(right)?.count() > threshold {
                        let (key, child) = {
                            let internal = self.arena.get_mut(right)?.as_internal_mut()?;
                            (internal.keys.remove(0), internal.children.remove(0))
                        };
                        let separator = std::mem::replace(
                            &mut self.arena.get_mut(parent)?.as_internal_mut()?.keys[slot],
                            key,
                        );
                        {
                            let internal = self.arena.get_mut(node)?.as_internal_mut()?;
                            internal.keys.push(separator);
                            internal.children.push(child);
                        }
                        self.adopt_children(node)?;
                        self.adopt_children(right)?;

                        self.stats.internal_borrows += 1;
                        tracing::trace!(
                            target: "dialog_merkle_tree::rebalance",
                            node = node.index(),
                            sibling = right.index(),
                            "branch borrowed from right"
                        );
                        touched.push(right);
                        return Ok(());
                    }

                    let separator = self.arena.get(parent)?.as_internal()?.keys[slot].clone();
                    let (keys, children) = {
                        let internal = self.arena.get_mut(right)?.as_internal_mut()?;
                        (
                            std::mem::take(&mut internal.keys),
                            std::mem::take(&mut internal.children),
                        )
                    };
                    {
                        let internal = self.arena.get_mut(node)?.as_internal_mut()?;
                        internal.keys.push(separator);
                        internal.keys.extend(keys);
                        internal.children.extend(children);
                    }
                    self.adopt_children(node)?;

                    self.levels.unlink(&mut self.arena, right)?;
                    self.arena.release(right)?;

                    self.stats.internal_merges += 1;
                    tracing::trace!(
                        target: "dialog_merkle_tree::rebalance",
                        node = node.index(),
                        sibling = right.index(),
                        "branch absorbed right"
                    );

                    node = parent;
                    index = slot;
                }
            }
        }
    }

    /// Removes separator `index` and child `index + 1` from a branch
    /// without any repair.
    fn drop_separator(&mut self, node: NodeId, index: usize) -> Result<(), DialogMerkleTreeError> {
        let internal = self.arena.get_mut(node)?.as_internal_mut()?;
        if index >= internal.keys.len() {
            return Err(DialogMerkleTreeError::UnexpectedTreeShape(format!(
                "Branch {node} has no separator at {index}"
            )));
        }
        internal.keys.remove(index);
        internal.children.remove(index + 1);
        self.adopt_children(node)
    }

    /// Replaces a root branch that has a single child left with that child.
    fn collapse_root(
        &mut self,
        root: NodeId,
        touched: &mut Vec<NodeId>,
    ) -> Result<(), DialogMerkleTreeError> {
        let child = match self.arena.get(root)?.children()? {
            [child] => *child,
            children => {
                return Err(DialogMerkleTreeError::UnexpectedTreeShape(format!(
                    "Root {root} still has {} children",
                    children.len()
                )));
            }
        };

        self.levels.pop(&mut self.arena, root)?;
        self.arena.release(root)?;
        {
            let entry = self.arena.get_mut(child)?;
            entry.parent = None;
            entry.slot = 0;
        }
        self.root = Some(child);

        self.stats.root_collapses += 1;
        tracing::trace!(
            target: "dialog_merkle_tree::root",
            root = child.index(),
            height = self.height(),
            "collapsed root"
        );
        touched.push(child);
        Ok(())
    }

    /// Picks the sibling used to repair `node`: the right one for a
    /// leftmost child, the left one for a rightmost child, and otherwise
    /// the left one unless the right one holds strictly more.
    fn select_sibling(&self, node: NodeId) -> Result<Sibling, DialogMerkleTreeError> {
        let entry = self.arena.get(node)?;
        let parent = entry.parent.ok_or_else(|| {
            DialogMerkleTreeError::UnexpectedTreeShape(format!("Node {node} has no parent"))
        })?;
        let siblings = self.arena.get(parent)?.count();

        let neighbour = |link: Option<NodeId>| -> Result<NodeId, DialogMerkleTreeError> {
            let sibling = link.ok_or_else(|| {
                DialogMerkleTreeError::UnexpectedTreeShape(format!(
                    "Node {node} is missing a sibling under {parent}"
                ))
            })?;
            match self.arena.get(sibling)?.parent {
                Some(owner) if owner == parent => Ok(sibling),
                _ => Err(DialogMerkleTreeError::UnexpectedTreeShape(format!(
                    "Sibling {sibling} of {node} belongs to another parent"
                ))),
            }
        };

        if entry.slot == 0 {
            return Ok(Sibling::Right(neighbour(entry.next)?));
        }
        let left = neighbour(entry.previous)?;
        if entry.slot + 1 == siblings {
            return Ok(Sibling::Left(left));
        }
        let right = neighbour(entry.next)?;

        if self.arena.get(left)?.count() >= self.arena.get(right)?.count() {
            Ok(Sibling::Left(left))
        } else {
            Ok(Sibling::Right(right))
        }
    }
}

fn empty(node: NodeId) -> DialogMerkleTreeError {
    DialogMerkleTreeError::UnexpectedTreeShape(format!("Sibling {node} has nothing to lend"))
}

#[cfg(test)]
mod tests {
    use crate::{DialogMerkleTreeError, Digest, Tree};
    use anyhow::{Result, anyhow};

    fn keys_of(tree: &Tree<u32, u32>, leaf: crate::NodeId) -> Result<Vec<u32>> {
        Ok(tree
            .node(leaf)?
            .entries()?
            .iter()
            .map(|entry| entry.key)
            .collect())
    }

    #[test]
    fn it_reports_missing_keys() -> Result<()> {
        let mut tree = Tree::<u32, u32>::init(4, 4)?;
        assert_eq!(tree.remove(&1), Err(DialogMerkleTreeError::NotFound));

        tree.insert(1, 1)?;
        let digest = tree.digest();
        assert_eq!(tree.remove(&2), Err(DialogMerkleTreeError::NotFound));
        assert_eq!(tree.digest(), digest);
        assert_eq!(tree.len(), 1);
        Ok(())
    }

    #[test]
    fn it_empties_the_tree_when_the_last_entry_goes() -> Result<()> {
        let mut tree = Tree::<u32, u32>::init(4, 4)?;
        tree.insert(1, 10)?;
        assert_eq!(tree.remove(&1)?, 10);
        assert!(tree.is_empty());
        assert_eq!(tree.digest(), Digest::NULL);
        assert_eq!(tree.level(0), None);
        Ok(())
    }

    #[test]
    fn it_borrows_from_the_right_sibling() -> Result<()> {
        let mut tree = Tree::<u32, u32>::init(4, 4)?;
        for key in 1..=6 {
            tree.insert(key, key)?;
        }
        // Leaves are [1, 2] and [3, 4, 5, 6]
        let root = tree.root().ok_or_else(|| anyhow!("missing root"))?;
        let children = root.children()?.to_vec();

        tree.remove(&1)?;

        assert_eq!(keys_of(&tree, children[0])?, vec![2, 3]);
        assert_eq!(keys_of(&tree, children[1])?, vec![4, 5, 6]);
        let root = tree.root().ok_or_else(|| anyhow!("missing root"))?;
        assert_eq!(root.separators()?, &[4]);
        assert_eq!(tree.stats().leaf_borrows, 1);
        tree.verify()?;
        Ok(())
    }

    #[test]
    fn it_borrows_from_the_left_sibling() -> Result<()> {
        let mut tree = Tree::<u32, u32>::init(4, 4)?;
        for key in [1, 2, 3, 4, 5, 0] {
            tree.insert(key, key)?;
        }
        tree.remove(&5)?;
        // Leaves are [0, 1, 2] and [3, 4]
        let root = tree.root().ok_or_else(|| anyhow!("missing root"))?;
        let children = root.children()?.to_vec();
        assert_eq!(keys_of(&tree, children[1])?, vec![3, 4]);

        tree.remove(&4)?;

        assert_eq!(keys_of(&tree, children[0])?, vec![0, 1]);
        assert_eq!(keys_of(&tree, children[1])?, vec![2, 3]);
        let root = tree.root().ok_or_else(|| anyhow!("missing root"))?;
        assert_eq!(root.separators()?, &[2]);
        assert_eq!(tree.stats().leaf_borrows, 1);
        tree.verify()?;
        Ok(())
    }

    #[test]
    fn it_prefers_the_left_sibling_of_a_middle_leaf_unless_the_right_holds_more() -> Result<()> {
        let leaves = |tree: &Tree<u32, u32>| -> Result<Vec<Vec<u32>>> {
            let root = tree.root().ok_or_else(|| anyhow!("missing root"))?;
            root.children()?.iter().map(|child| keys_of(tree, *child)).collect()
        };

        // Equal siblings: [0, 1, 2], [3, 4], [5, 6, 7]
        let mut tree = Tree::<u32, u32>::init(4, 4)?;
        for key in [0, 1, 3, 4, 5, 6, 7, 2] {
            tree.insert(key, key)?;
        }
        assert_eq!(leaves(&tree)?, vec![vec![0, 1, 2], vec![3, 4], vec![5, 6, 7]]);

        tree.remove(&3)?;

        assert_eq!(leaves(&tree)?, vec![vec![0, 1], vec![2, 4], vec![5, 6, 7]]);
        let root = tree.root().ok_or_else(|| anyhow!("missing root"))?;
        assert_eq!(root.separators()?, &[2, 5]);
        tree.verify()?;

        // The right sibling holds strictly more: [1, 2], [3, 4], [5, 6, 7]
        let mut tree = Tree::<u32, u32>::init(4, 4)?;
        for key in 1..=7 {
            tree.insert(key, key)?;
        }
        assert_eq!(leaves(&tree)?, vec![vec![1, 2], vec![3, 4], vec![5, 6, 7]]);

        tree.remove(&3)?;

        assert_eq!(leaves(&tree)?, vec![vec![1, 2], vec![4, 5], vec![6, 7]]);
        let root = tree.root().ok_or_else(|| anyhow!("missing root"))?;
        assert_eq!(root.separators()?, &[3, 6]);
        assert_eq!(tree.stats().leaf_borrows, 1);
        tree.verify()?;
        Ok(())
    }

    #[test]
    fn it_merges_and_collapses_the_root() -> Result<()> {
        let mut tree = Tree::<u32, u32>::init(4, 4)?;
        for key in 1..=5 {
            tree.insert(key, key)?;
        }
        assert_eq!(tree.height(), 1);

        tree.remove(&5)?;
        tree.remove(&4)?;

        // [1, 2] cannot spare an entry, so both leaves merge into the root
        assert_eq!(tree.height(), 0);
        let root = tree.root().ok_or_else(|| anyhow!("missing root"))?;
        assert!(root.is_leaf());
        assert_eq!(root.parent(), None);
        assert_eq!(tree.stats().leaf_merges, 1);
        assert_eq!(tree.stats().root_collapses, 1);
        assert_eq!(tree.len(), 3);
        tree.verify()?;
        Ok(())
    }

    #[test]
    fn it_repairs_branches_while_draining() -> Result<()> {
        let mut tree = Tree::<u32, u32>::init(3, 2)?;
        for key in 0..64 {
            tree.insert(key, key * 2)?;
        }
        assert!(tree.height() >= 3);

        for key in (0..64).step_by(3) {
            assert_eq!(tree.remove(&key)?, key * 2);
            tree.verify()?;
        }
        for key in 0..64u32 {
            assert_eq!(tree.get(&key)?.is_some(), key % 3 != 0);
        }

        for key in (0..64).filter(|key| key % 3 != 0).rev() {
            tree.remove(&key)?;
            tree.verify()?;
        }
        assert!(tree.is_empty());
        assert_eq!(tree.digest(), Digest::NULL);

        let stats = tree.stats();
        assert!(stats.internal_merges > 0);
        assert!(stats.root_collapses > 0);
        Ok(())
    }
}
