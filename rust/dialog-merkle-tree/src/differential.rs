//! Comparing and reconciling trees.
//!
//! Two views are offered:
//!
//! - [`Tree::diff`] walks both trees in lockstep from the roots and reports
//!   the smallest pairs of positionally corresponding nodes whose digests
//!   differ. Subtrees with equal digests are skipped without being visited,
//!   so the walk only costs as much as the differing structure.
//! - [`Tree::changes`] reports the entry-level [`Change`]s that turn one
//!   tree's contents into the other's, regardless of how either tree is
//!   shaped. [`Tree::integrate`] applies such changes.
//!
//! # Conflict Resolution
//!
//! When integrating changes, conflicts are resolved deterministically:
//! - For additions with conflicting values, the value with the higher digest wins
//! - For removals, only exact matches (same key and value) are removed

use std::cmp::Ordering;

use crate::{DialogMerkleTreeError, Digest, Entry, KeyType, Node, Tree, ValueType};

/// Represents a change in the key-value store.
#[derive(Clone, Debug, PartialEq)]
pub enum Change<Key, Value>
where
    Key: KeyType,
{
    /// Adds an entry to the key-value store.
    Add(Entry<Key, Value>),
    /// Removes an entry from the key-value store.
    Remove(Entry<Key, Value>),
}

/// A pair of positionally corresponding nodes whose digests differ.
///
/// One side is `None` when the other tree has no node at that position.
#[derive(Clone, Debug)]
pub struct Difference<'a, Key, Value>
where
    Key: KeyType,
{
    /// The node from the tree [`Tree::diff`] was called on.
    pub ours: Option<&'a Node<Key, Value>>,
    /// The node from the tree it was compared against.
    pub theirs: Option<&'a Node<Key, Value>>,
}

impl<Key, Value> Tree<Key, Value>
where
    Key: KeyType,
    Value: ValueType,
{
    /// Compares this tree with `other` and returns the differing node
    /// pairs, in left-to-right order.
    ///
    /// Descent stops as soon as either side of a pair is a leaf. When one
    /// node has more children than its counterpart, each surplus child is
    /// reported against `None`. Identical trees produce no pairs.
    ///
    /// Fails with [`DialogMerkleTreeError::ConfigurationMismatch`] if the
    /// trees were built with different configurations.
    pub fn diff<'a>(
        &'a self,
        other: &'a Self,
    ) -> Result<Vec<Difference<'a, Key, Value>>, DialogMerkleTreeError> {
        if self.config != other.config {
            return Err(DialogMerkleTreeError::ConfigurationMismatch {
                ours: self.config,
                theirs: other.config,
            });
        }

        let mut differences = vec![];
        match (self.root(), other.root()) {
            (None, None) => {}
            (Some(ours), Some(theirs)) => {
                diff_nodes(self, other, ours, theirs, &mut differences)?;
            }
            (ours, theirs) => differences.push(Difference { ours, theirs }),
        }

        tracing::trace!(
            target: "dialog_merkle_tree::diff",
            differences = differences.len(),
            "compared trees"
        );
        Ok(differences)
    }

    /// Computes the entry-level changes that, applied to `other` through
    /// [`Tree::integrate`], give it the same entries as this tree.
    ///
    /// A key whose value differs is reported as a removal of `other`'s
    /// entry followed by an addition of ours. The result is empty exactly
    /// when both trees hold the same entries.
    pub fn changes(&self, other: &Self) -> Vec<Change<Key, Value>> {
        let mut ours = self.iter().peekable();
        let mut theirs = other.iter().peekable();
        let mut changes = vec![];

        loop {
            let order = match (ours.peek(), theirs.peek()) {
                (None, None) => break,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some((left, _)), Some((right, _))) => left.cmp(right),
            };

            match order {
                Ordering::Less => {
                    if let Some((key, value)) = ours.next() {
                        changes.push(Change::Add(Entry::new(key.clone(), value.clone())));
                    }
                }
                Ordering::Greater => {
                    if let Some((key, value)) = theirs.next() {
                        changes.push(Change::Remove(Entry::new(key.clone(), value.clone())));
                    }
                }
                Ordering::Equal => {
                    if let (Some((key, value)), Some((_, previous))) = (ours.next(), theirs.next())
                    {
                        if value != previous {
                            changes.push(Change::Remove(Entry::new(key.clone(), previous.clone())));
                            changes.push(Change::Add(Entry::new(key.clone(), value.clone())));
                        }
                    }
                }
            }
        }

        changes
    }

    /// Integrates a set of changes into the tree.
    ///
    /// Applying the same changes in any order converges on the same tree
    /// contents. If any change fails, the tree is restored to the state it
    /// held before the call.
    pub fn integrate<Changes>(&mut self, changes: Changes) -> Result<(), DialogMerkleTreeError>
    where
        Changes: IntoIterator<Item = Change<Key, Value>>,
    {
        let snapshot = self.clone();

        let result = self.apply(changes);

        if result.is_err() {
            *self = snapshot;
        }

        result
    }

    fn apply<Changes>(&mut self, changes: Changes) -> Result<(), DialogMerkleTreeError>
    where
        Changes: IntoIterator<Item = Change<Key, Value>>,
    {
        for change in changes {
            match change {
                Change::Add(entry) => match self.get(&entry.key)?.cloned() {
                    None => self.insert(entry.key, entry.value)?,
                    // Same value, nothing to do
                    Some(existing) if existing == entry.value => {}
                    Some(existing) => {
                        if value_digest(&entry.value) > value_digest(&existing) {
                            self.replace(&entry.key, entry.value)?;
                        }
                    }
                },
                Change::Remove(entry) => {
                    // A different value means a concurrent update won
                    if self.get(&entry.key)? == Some(&entry.value) {
                        self.remove(&entry.key)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn value_digest<Value>(value: &Value) -> Digest
where
    Value: ValueType,
{
    Digest::hash(&value.bytes())
}

fn diff_nodes<'a, Key, Value>(
    ours_tree: &'a Tree<Key, Value>,
    theirs_tree: &'a Tree<Key, Value>,
    ours: &'a Node<Key, Value>,
    theirs: &'a Node<Key, Value>,
    differences: &mut Vec<Difference<'a, Key, Value>>,
) -> Result<(), DialogMerkleTreeError>
where
    Key: KeyType,
    Value: ValueType,
{
    if ours.digest() == theirs.digest() {
        return Ok(());
    }

    if ours.is_leaf() || theirs.is_leaf() {
        differences.push(Difference {
            ours: Some(ours),
            theirs: Some(theirs),
        });
        return Ok(());
    }

    let ours_children = ours.children()?;
    let theirs_children = theirs.children()?;
    let shared = ours_children.len().min(theirs_children.len());

    for (left, right) in ours_children.iter().zip(theirs_children) {
        diff_nodes(
            ours_tree,
            theirs_tree,
            ours_tree.node(*left)?,
            theirs_tree.node(*right)?,
            differences,
        )?;
    }
    for child in &ours_children[shared..] {
        differences.push(Difference {
            ours: Some(ours_tree.node(*child)?),
            theirs: None,
        });
    }
    for child in &theirs_children[shared..] {
        differences.push(Difference {
            ours: None,
            theirs: Some(theirs_tree.node(*child)?),
        });
    }

    Ok(())
}
