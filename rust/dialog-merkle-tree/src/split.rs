//! Node splitting on insert.
//!
//! A full node that receives one more element is cut in two. The half that
//! does not contain the insertion point stays in the existing node, so the
//! new sibling is linked to the left when the element lands in the lower
//! half and to the right otherwise. The separator for the pair is then
//! pushed into the parent, which may split in turn, up to a new root.

use crate::{
    DialogMerkleTreeError, Entry, KeyType, Node, NodeId, Tree, ValueType,
    search::{insertion_point, key_binary_search},
};

impl<Key, Value> Tree<Key, Value>
where
    Key: KeyType,
    Value: ValueType,
{
    /// Splits the full `leaf` around `entry`, which belongs at `index`, and
    /// returns every node whose content changed.
    pub(crate) fn split_leaf(
        &mut self,
        leaf: NodeId,
        index: usize,
        entry: Entry<Key, Value>,
    ) -> Result<Vec<NodeId>, DialogMerkleTreeError> {
        let split = self.config.entries.div_ceil(2);

        let mut lower = std::mem::take(&mut self.arena.get_mut(leaf)?.as_leaf_mut()?.entries);
        lower.insert(index, entry);
        let upper = lower.split_off(split);

        let (left, right) = if index < split {
            self.arena.get_mut(leaf)?.as_leaf_mut()?.entries = upper;
            let sibling = self.arena.allocate(|id| Node::leaf(id, lower));
            self.levels.insert_before(&mut self.arena, leaf, sibling)?;
            (sibling, leaf)
        } else {
            self.arena.get_mut(leaf)?.as_leaf_mut()?.entries = lower;
            let sibling = self.arena.allocate(|id| Node::leaf(id, upper));
            self.levels.insert_after(&mut self.arena, leaf, sibling)?;
            (leaf, sibling)
        };

        let separator = self
            .arena
            .get(right)?
            .first_key()
            .cloned()
            .ok_or_else(|| {
                DialogMerkleTreeError::UnexpectedTreeShape(format!(
                    "Leaf {right} is empty after a split"
                ))
            })?;

        self.stats.leaf_splits += 1;
        tracing::trace!(
            target: "dialog_merkle_tree::split",
            left = left.index(),
            right = right.index(),
            "split leaf"
        );

        let mut touched = vec![left, right];
        self.promote(leaf, left, right, separator, &mut touched)?;
        Ok(touched)
    }

    /// Installs `separator` between `left` and `right` in the parent of
    /// `anchor` (one of the pair), splitting branches as far up as needed.
    fn promote(
        &mut self,
        mut anchor: NodeId,
        mut left: NodeId,
        mut right: NodeId,
        mut separator: Key,
        touched: &mut Vec<NodeId>,
    ) -> Result<(), DialogMerkleTreeError> {
        loop {
            let Some(parent) = self.arena.get(anchor)?.parent else {
                let level = self.arena.get(anchor)?.level + 1;
                let root = self
                    .arena
                    .allocate(|id| Node::internal(id, level, vec![separator], vec![left, right]));
                self.levels.push(&mut self.arena, root)?;
                self.adopt_children(root)?;
                self.root = Some(root);
                self.stats.root_grows += 1;
                tracing::trace!(
                    target: "dialog_merkle_tree::root",
                    root = root.index(),
                    height = level,
                    "grew root"
                );
                touched.push(root);
                return Ok(());
            };

            let (count, position) = {
                let internal = self.arena.get(parent)?.as_internal()?;
                (
                    internal.children.len(),
                    key_binary_search(&internal.keys, &separator),
                )
            };
            if position >= 0 {
                return Err(DialogMerkleTreeError::UnexpectedTreeShape(format!(
                    "Branch {parent} already holds the promoted separator"
                )));
            }
            let index = insertion_point(position);
            touched.push(parent);

            if count < self.config.order {
                let internal = self.arena.get_mut(parent)?.as_internal_mut()?;
                internal.keys.insert(index, separator);
                internal.children[index] = left;
                internal.children.insert(index + 1, right);
                return self.adopt_children(parent);
            }

            let (lower, upper, promoted) =
                self.split_internal(parent, index, separator, left, right)?;
            touched.push(lower);
            touched.push(upper);

            anchor = parent;
            left = lower;
            right = upper;
            separator = promoted;
        }
    }

    /// Splits the full branch `node` while inserting `separator` at `index`
    /// with `left`/`right` replacing the child that split below it.
    ///
    /// Returns the two halves in key order together with the separator that
    /// moves up to their parent.
    fn split_internal(
        &mut self,
        node: NodeId,
        index: usize,
        separator: Key,
        left: NodeId,
        right: NodeId,
    ) -> Result<(NodeId, NodeId, Key), DialogMerkleTreeError> {
        let split = self.config.order.div_ceil(2);

        let (level, mut keys, mut children) = {
            let entry = self.arena.get_mut(node)?;
            let level = entry.level;
            let internal = entry.as_internal_mut()?;
            (
                level,
                std::mem::take(&mut internal.keys),
                std::mem::take(&mut internal.children),
            )
        };

        keys.insert(index, separator);
        let slot = children.get_mut(index).ok_or_else(|| {
            DialogMerkleTreeError::UnexpectedTreeShape(format!(
                "Branch {node} has no child at {index}"
            ))
        })?;
        *slot = left;
        children.insert(index + 1, right);

        let cut = if index > split { split + 1 } else { split };
        let upper_children = children.split_off(cut);
        let upper_keys = keys.split_off(cut);
        let promoted = keys.pop().ok_or_else(|| {
            DialogMerkleTreeError::UnexpectedTreeShape(format!(
                "Branch {node} has no separator to promote"
            ))
        })?;

        let (lower, upper) = if index < split {
            {
                let internal = self.arena.get_mut(node)?.as_internal_mut()?;
                internal.keys = upper_keys;
                internal.children = upper_children;
            }
            let sibling = self
                .arena
                .allocate(|id| Node::internal(id, level, keys, children));
            self.levels.insert_before(&mut self.arena, node, sibling)?;
            (sibling, node)
        } else {
            {
                let internal = self.arena.get_mut(node)?.as_internal_mut()?;
                internal.keys = keys;
                internal.children = children;
            }
            let sibling = self
                .arena
                .allocate(|id| Node::internal(id, level, upper_keys, upper_children));
            self.levels.insert_after(&mut self.arena, node, sibling)?;
            (node, sibling)
        };

        self.adopt_children(lower)?;
        self.adopt_children(upper)?;

        self.stats.internal_splits += 1;
        tracing::trace!(
            target: "dialog_merkle_tree::split",
            left = lower.index(),
            right = upper.index(),
            level,
            "split branch"
        );

        Ok((lower, upper, promoted))
    }
}
