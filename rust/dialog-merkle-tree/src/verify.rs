use crate::{DialogMerkleTreeError, KeyType, NodeBody, NodeId, Tree, ValueType};

struct Frame<'a, Key> {
    id: NodeId,
    level: usize,
    parent: Option<NodeId>,
    slot: usize,
    /// Inclusive lower fence inherited from the separator left of this subtree
    lower: Option<&'a Key>,
    /// Exclusive upper fence inherited from the separator right of this subtree
    upper: Option<&'a Key>,
}

impl<Key, Value> Tree<Key, Value>
where
    Key: KeyType,
    Value: ValueType,
{
    /// Checks the structural integrity of the whole tree.
    ///
    /// This verifies key ordering within and across nodes, node occupancy
    /// bounds, parent and slot links, the sibling list of every level,
    /// level numbering, the entry count, and that every stored digest
    /// matches the node's current content. The first violation found is
    /// reported as [`DialogMerkleTreeError::UnexpectedTreeShape`].
    pub fn verify(&self) -> Result<(), DialogMerkleTreeError> {
        let Some(root) = self.root else {
            check(
                self.len == 0 && self.levels.len() == 0 && self.arena.len() == 0,
                || "Empty tree still holds nodes or entries".into(),
            )?;
            return Ok(());
        };

        let top = self
            .levels
            .len()
            .checked_sub(1)
            .ok_or_else(|| broken("Tree has a root but no levels".into()))?;

        let leaf_minimum = self.config.entries.div_ceil(2);
        // An odd fanout splits a full branch into ceil/floor halves, e.g. 5 and 3 at order 7
        let branch_minimum = (self.config.order / 2).max(2);

        let mut by_level: Vec<Vec<NodeId>> = vec![Vec::new(); self.levels.len()];
        let mut entries = 0;
        let mut stack = vec![Frame {
            id: root,
            level: top,
            parent: None,
            slot: 0,
            lower: None,
            upper: None,
        }];

        while let Some(frame) = stack.pop() {
            let id = frame.id;
            let node = self.arena.get(id)?;
            let is_root = frame.parent.is_none();

            check(node.id == id, || format!("Node {id} records id {}", node.id))?;
            check(node.level == frame.level, || {
                format!("Node {id} is at level {} but expected {}", node.level, frame.level)
            })?;
            check(node.parent == frame.parent && node.slot == frame.slot, || {
                format!("Node {id} has stale parent or slot links")
            })?;

            let within = |key: &Key| {
                frame.lower.is_none_or(|lower| key >= lower)
                    && frame.upper.is_none_or(|upper| key < upper)
            };

            match &node.body {
                NodeBody::Leaf(leaf) => {
                    let count = leaf.entries.len();
                    check(node.level == 0, || format!("Leaf {id} is not on level 0"))?;
                    check(count >= 1 && count <= self.config.entries, || {
                        format!("Leaf {id} holds {count} entries")
                    })?;
                    check(is_root || count >= leaf_minimum, || {
                        format!("Leaf {id} is underfull with {count} entries")
                    })?;
                    check(
                        leaf.entries.windows(2).all(|pair| pair[0].key < pair[1].key),
                        || format!("Leaf {id} is not strictly ascending"),
                    )?;
                    check(leaf.entries.iter().all(|entry| within(&entry.key)), || {
                        format!("Leaf {id} holds a key outside its parent's fences")
                    })?;
                    entries += count;
                }
                NodeBody::Internal(internal) => {
                    let count = internal.children.len();
                    check(node.level > 0, || format!("Branch {id} is on the leaf level"))?;
                    check(internal.keys.len() + 1 == count, || {
                        format!(
                            "Branch {id} has {} separators for {count} children",
                            internal.keys.len()
                        )
                    })?;
                    check(count >= 2 && count <= self.config.order, || {
                        format!("Branch {id} holds {count} children")
                    })?;
                    check(is_root || count >= branch_minimum, || {
                        format!("Branch {id} is underfull with {count} children")
                    })?;
                    check(
                        internal.keys.windows(2).all(|pair| pair[0] < pair[1]),
                        || format!("Branch {id} separators are not strictly ascending"),
                    )?;
                    check(internal.keys.iter().all(within), || {
                        format!("Branch {id} holds a separator outside its parent's fences")
                    })?;

                    for (slot, child) in internal.children.iter().enumerate().rev() {
                        stack.push(Frame {
                            id: *child,
                            level: node.level - 1,
                            parent: Some(id),
                            slot,
                            lower: slot
                                .checked_sub(1)
                                .map(|index| &internal.keys[index])
                                .or(frame.lower),
                            upper: internal.keys.get(slot).or(frame.upper),
                        });
                    }
                }
            }

            let digest = self.compute_digest(id)?;
            check(node.digest == digest, || format!("Node {id} has a stale digest"))?;

            by_level
                .get_mut(node.level)
                .ok_or_else(|| broken(format!("Node {id} is above the top level")))?
                .push(id);
        }

        check(entries == self.len, || {
            format!("Tree counts {} entries but holds {entries}", self.len)
        })?;
        let reachable: usize = by_level.iter().map(Vec::len).sum();
        check(reachable == self.arena.len(), || {
            format!("{} nodes are allocated but {reachable} are reachable", self.arena.len())
        })?;

        for (level, (ends, expected)) in self.levels.iter().zip(by_level).enumerate() {
            let mut chain = Vec::with_capacity(expected.len());
            let mut previous = None;
            let mut cursor = ends.first;
            while let Some(id) = cursor {
                let node = self.arena.get(id)?;
                check(node.previous == previous, || {
                    format!("Node {id} has a stale previous link")
                })?;
                chain.push(id);
                check(chain.len() <= expected.len(), || {
                    format!("Sibling list of level {level} does not terminate")
                })?;
                previous = Some(id);
                cursor = node.next;
            }
            check(ends.last == previous, || {
                format!("Level {level} records the wrong last node")
            })?;
            check(chain == expected, || {
                format!("Sibling list of level {level} is out of key order")
            })?;
        }

        Ok(())
    }
}

fn broken(message: String) -> DialogMerkleTreeError {
    DialogMerkleTreeError::UnexpectedTreeShape(message)
}

fn check(condition: bool, message: impl FnOnce() -> String) -> Result<(), DialogMerkleTreeError> {
    if condition {
        Ok(())
    } else {
        Err(broken(message()))
    }
}

#[cfg(test)]
mod tests {
    use crate::{DialogMerkleTreeError, Digest, NodeBody, Tree};
    use anyhow::Result;

    fn tree() -> Result<Tree<u32, u32>> {
        let mut tree = Tree::init(3, 2)?;
        for key in 0..20 {
            tree.insert(key, key)?;
        }
        Ok(tree)
    }

    #[test]
    fn it_accepts_a_healthy_tree() -> Result<()> {
        tree()?.verify()?;
        Tree::<u32, u32>::init(3, 2)?.verify()?;
        Ok(())
    }

    #[test]
    fn it_detects_a_stale_digest() -> Result<()> {
        let mut tree = tree()?;
        let leaf = tree
            .level(0)
            .and_then(|level| level.last)
            .ok_or_else(|| anyhow::anyhow!("no leaves"))?;
        tree.arena.get_mut(leaf)?.digest = Digest::hash(b"stale");

        assert!(matches!(
            tree.verify(),
            Err(DialogMerkleTreeError::UnexpectedTreeShape(_))
        ));
        Ok(())
    }

    #[test]
    fn it_detects_misordered_keys() -> Result<()> {
        let mut tree = tree()?;
        let leaf = tree
            .level(0)
            .and_then(|level| level.first)
            .ok_or_else(|| anyhow::anyhow!("no leaves"))?;
        if let NodeBody::Leaf(leaf) = &mut tree.arena.get_mut(leaf)?.body {
            leaf.entries[0].key = 1000;
        }

        assert!(tree.verify().is_err());
        Ok(())
    }

    #[test]
    fn it_detects_a_wrong_entry_count() -> Result<()> {
        let mut tree = tree()?;
        tree.len += 1;
        assert!(tree.verify().is_err());
        Ok(())
    }
}
