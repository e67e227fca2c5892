use std::{
    iter::FusedIterator,
    ops::{Bound, RangeBounds},
};

use crate::{
    KeyType, Node, Tree, ValueType,
    search::{binary_search, insertion_point},
};

/// An ordered scan over a contiguous run of entries, produced by
/// [`Tree::range`] and [`Tree::iter`].
///
/// The scan starts in the leaf that owns the lower bound and follows the
/// leaf chain rightward until a key passes the upper bound.
pub struct Range<'a, Key, Value>
where
    Key: KeyType,
{
    tree: &'a Tree<Key, Value>,
    leaf: Option<&'a Node<Key, Value>>,
    index: usize,
    end: Bound<Key>,
}

impl<'a, Key, Value> Range<'a, Key, Value>
where
    Key: KeyType,
    Value: ValueType,
{
    fn new<R>(tree: &'a Tree<Key, Value>, range: R) -> Self
    where
        R: RangeBounds<Key>,
    {
        let end = range.end_bound().cloned();
        let start = match range.start_bound() {
            Bound::Unbounded => tree
                .levels
                .get(0)
                .and_then(|level| level.first)
                .map(|first| (first, 0)),
            Bound::Included(key) | Bound::Excluded(key) => {
                let excluded = matches!(range.start_bound(), Bound::Excluded(_));
                tree.find_leaf(key).ok().flatten().and_then(|leaf| {
                    let entries = tree.arena.get(leaf).ok()?.entries().ok()?;
                    let position = binary_search(entries, key, |entry| &entry.key);
                    let index = match position {
                        found if found >= 0 && excluded => found as usize + 1,
                        found if found >= 0 => found as usize,
                        absent => insertion_point(absent),
                    };
                    Some((leaf, index))
                })
            }
        };

        let (leaf, index) = match start {
            Some((leaf, index)) => (tree.arena.get(leaf).ok(), index),
            None => (None, 0),
        };

        Range {
            tree,
            leaf,
            index,
            end,
        }
    }

    fn within_end(&self, key: &Key) -> bool {
        match &self.end {
            Bound::Unbounded => true,
            Bound::Included(end) => key <= end,
            Bound::Excluded(end) => key < end,
        }
    }
}

impl<'a, Key, Value> Iterator for Range<'a, Key, Value>
where
    Key: KeyType,
    Value: ValueType,
{
    type Item = (&'a Key, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let leaf = self.leaf?;
            let entries = leaf.entries().ok()?;

            if let Some(entry) = entries.get(self.index) {
                if !self.within_end(&entry.key) {
                    self.leaf = None;
                    return None;
                }
                self.index += 1;
                return Some((&entry.key, &entry.value));
            }

            self.leaf = leaf.next().and_then(|next| self.tree.arena.get(next).ok());
            self.index = 0;
        }
    }
}

impl<Key, Value> FusedIterator for Range<'_, Key, Value>
where
    Key: KeyType,
    Value: ValueType,
{
}

impl<Key, Value> Tree<Key, Value>
where
    Key: KeyType,
    Value: ValueType,
{
    /// Returns the entries whose keys fall within `range`, in ascending key
    /// order.
    ///
    /// An inverted range yields nothing.
    ///
    /// ```rust
    /// use dialog_merkle_tree::Tree;
    ///
    /// let mut tree = Tree::<u32, u32>::init(4, 4)?;
    /// for key in 0..20 {
    ///     tree.insert(key, key * 10)?;
    /// }
    ///
    /// let keys: Vec<_> = tree.range(5..=8).map(|(key, _)| *key).collect();
    /// assert_eq!(keys, vec![5, 6, 7, 8]);
    /// # Ok::<(), dialog_merkle_tree::DialogMerkleTreeError>(())
    /// ```
    pub fn range<R>(&self, range: R) -> Range<'_, Key, Value>
    where
        R: RangeBounds<Key>,
    {
        Range::new(self, range)
    }

    /// Returns every entry in ascending key order.
    pub fn iter(&self) -> Range<'_, Key, Value> {
        self.range(..)
    }
}
