use std::fmt::Display;

use crate::{DialogMerkleTreeError, Digest, Entry, KeyType, ValueType};

/// Identifies a [`Node`] within the arena of the [Tree](crate::Tree) that
/// owns it. Identifiers are only meaningful for that tree, and may be reused
/// once the node they named has been merged away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The arena slot this identifier points to.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// The entries of a leaf node, in ascending key order.
#[derive(Clone, Debug, PartialEq)]
pub struct Leaf<Key, Value>
where
    Key: KeyType,
{
    pub(crate) entries: Vec<Entry<Key, Value>>,
}

/// The separator keys and children of a branch node.
///
/// There is always exactly one more child than there are separators.
/// Separator `i` is greater than every key below child `i` and no greater
/// than any key below child `i + 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct Internal<Key> {
    pub(crate) keys: Vec<Key>,
    pub(crate) children: Vec<NodeId>,
}

/// The variant part of a [`Node`].
#[derive(Clone, Debug, PartialEq)]
pub enum NodeBody<Key, Value>
where
    Key: KeyType,
{
    /// A leaf holding key/value entries.
    Leaf(Leaf<Key, Value>),
    /// A branch holding separators and child links.
    Internal(Internal<Key>),
}

/// A node of a [Tree](crate::Tree).
///
/// Besides its body, every node records where it sits: its height above
/// the leaves, its parent and its slot among the parent's children, and
/// its neighbours in the sibling list of its level. Parent and sibling
/// links do not own the nodes they name.
#[derive(Clone, Debug)]
pub struct Node<Key, Value>
where
    Key: KeyType,
{
    pub(crate) id: NodeId,
    pub(crate) level: usize,
    pub(crate) digest: Digest,
    pub(crate) parent: Option<NodeId>,
    pub(crate) slot: usize,
    pub(crate) previous: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
    pub(crate) body: NodeBody<Key, Value>,
}

impl<Key, Value> Node<Key, Value>
where
    Key: KeyType,
    Value: ValueType,
{
    pub(crate) fn leaf(id: NodeId, entries: Vec<Entry<Key, Value>>) -> Self {
        Node {
            id,
            level: 0,
            digest: Digest::NULL,
            parent: None,
            slot: 0,
            previous: None,
            next: None,
            body: NodeBody::Leaf(Leaf { entries }),
        }
    }

    pub(crate) fn internal(
        id: NodeId,
        level: usize,
        keys: Vec<Key>,
        children: Vec<NodeId>,
    ) -> Self {
        Node {
            id,
            level,
            digest: Digest::NULL,
            parent: None,
            slot: 0,
            previous: None,
            next: None,
            body: NodeBody::Internal(Internal { keys, children }),
        }
    }

    /// The identifier of this node within its tree.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Height above the leaves; leaves are at level `0`.
    pub fn level(&self) -> usize {
        self.level
    }

    /// The content digest of this node.
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// The branch holding this node, or `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Position of this node among its parent's children.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Index of the parent separator directly left of this node, or `None`
    /// when this node is its parent's leftmost child (or the root).
    pub fn parent_key_index(&self) -> Option<usize> {
        match self.parent {
            Some(_) => self.slot.checked_sub(1),
            None => None,
        }
    }

    /// The previous node on the same level.
    pub fn previous(&self) -> Option<NodeId> {
        self.previous
    }

    /// The next node on the same level.
    pub fn next(&self) -> Option<NodeId> {
        self.next
    }

    /// The variant part of this node.
    pub fn body(&self) -> &NodeBody<Key, Value> {
        &self.body
    }

    /// Whether this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self.body, NodeBody::Leaf(_))
    }

    /// Whether this node is a branch.
    pub fn is_internal(&self) -> bool {
        !self.is_leaf()
    }

    /// Number of entries of a leaf, or number of children of a branch.
    pub fn count(&self) -> usize {
        match &self.body {
            NodeBody::Leaf(leaf) => leaf.entries.len(),
            NodeBody::Internal(internal) => internal.children.len(),
        }
    }

    /// Get the entries of a leaf.
    ///
    /// The result is an error if this [`Node`] is a branch.
    pub fn entries(&self) -> Result<&[Entry<Key, Value>], DialogMerkleTreeError> {
        self.as_leaf().map(|leaf| leaf.entries.as_slice())
    }

    /// Get the separator keys of a branch.
    ///
    /// The result is an error if this [`Node`] is a leaf.
    pub fn separators(&self) -> Result<&[Key], DialogMerkleTreeError> {
        self.as_internal().map(|internal| internal.keys.as_slice())
    }

    /// Get the children of a branch.
    ///
    /// The result is an error if this [`Node`] is a leaf.
    pub fn children(&self) -> Result<&[NodeId], DialogMerkleTreeError> {
        self.as_internal().map(|internal| internal.children.as_slice())
    }

    /// The smallest key held directly by this node.
    pub fn first_key(&self) -> Option<&Key> {
        match &self.body {
            NodeBody::Leaf(leaf) => leaf.entries.first().map(|entry| &entry.key),
            NodeBody::Internal(internal) => internal.keys.first(),
        }
    }

    pub(crate) fn as_leaf(&self) -> Result<&Leaf<Key, Value>, DialogMerkleTreeError> {
        match &self.body {
            NodeBody::Leaf(leaf) => Ok(leaf),
            NodeBody::Internal(_) => Err(DialogMerkleTreeError::UnexpectedTreeShape(format!(
                "Expected {} to be a leaf",
                self.id
            ))),
        }
    }

    pub(crate) fn as_leaf_mut(&mut self) -> Result<&mut Leaf<Key, Value>, DialogMerkleTreeError> {
        let id = self.id;
        match &mut self.body {
            NodeBody::Leaf(leaf) => Ok(leaf),
            NodeBody::Internal(_) => Err(DialogMerkleTreeError::UnexpectedTreeShape(format!(
                "Expected {id} to be a leaf"
            ))),
        }
    }

    pub(crate) fn as_internal(&self) -> Result<&Internal<Key>, DialogMerkleTreeError> {
        match &self.body {
            NodeBody::Internal(internal) => Ok(internal),
            NodeBody::Leaf(_) => Err(DialogMerkleTreeError::UnexpectedTreeShape(format!(
                "Expected {} to be a branch",
                self.id
            ))),
        }
    }

    pub(crate) fn as_internal_mut(&mut self) -> Result<&mut Internal<Key>, DialogMerkleTreeError> {
        let id = self.id;
        match &mut self.body {
            NodeBody::Internal(internal) => Ok(internal),
            NodeBody::Leaf(_) => Err(DialogMerkleTreeError::UnexpectedTreeShape(format!(
                "Expected {id} to be a branch"
            ))),
        }
    }
}

impl<Key, Value> Leaf<Key, Value>
where
    Key: KeyType,
{
    /// The entries of this leaf.
    pub fn entries(&self) -> &[Entry<Key, Value>] {
        &self.entries
    }
}

impl<Key> Internal<Key> {
    /// The separator keys of this branch.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// The children of this branch.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}
