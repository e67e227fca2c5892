use crate::{DialogMerkleTreeError, KeyType, Node, NodeId, ValueType};

/// Slot storage owning every node of a tree.
///
/// Vacated slots are recycled by later allocations, so a [`NodeId`] stays
/// valid only while the node it names is alive.
#[derive(Clone, Debug)]
pub(crate) struct Arena<Key, Value>
where
    Key: KeyType,
{
    slots: Vec<Option<Node<Key, Value>>>,
    vacant: Vec<usize>,
}

impl<Key, Value> Arena<Key, Value>
where
    Key: KeyType,
    Value: ValueType,
{
    pub fn new() -> Self {
        Arena {
            slots: Vec::new(),
            vacant: Vec::new(),
        }
    }

    /// Reserves a slot and stores the node built for it.
    pub fn allocate(&mut self, build: impl FnOnce(NodeId) -> Node<Key, Value>) -> NodeId {
        match self.vacant.pop() {
            Some(index) => {
                let id = NodeId(index);
                self.slots[index] = Some(build(id));
                id
            }
            None => {
                let id = NodeId(self.slots.len());
                self.slots.push(Some(build(id)));
                id
            }
        }
    }

    /// Drops the node stored at `id` and returns it.
    pub fn release(&mut self, id: NodeId) -> Result<Node<Key, Value>, DialogMerkleTreeError> {
        let node = self
            .slots
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or_else(|| dangling(id))?;
        self.vacant.push(id.0);
        Ok(node)
    }

    pub fn get(&self, id: NodeId) -> Result<&Node<Key, Value>, DialogMerkleTreeError> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| dangling(id))
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut Node<Key, Value>, DialogMerkleTreeError> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| dangling(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.0), Some(Some(_)))
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.vacant.len()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.vacant.clear();
    }
}

fn dangling(id: NodeId) -> DialogMerkleTreeError {
    DialogMerkleTreeError::UnexpectedTreeShape(format!("Node {id} is not allocated"))
}
