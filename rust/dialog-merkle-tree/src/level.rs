use crate::{DialogMerkleTreeError, KeyType, NodeId, ValueType, arena::Arena};

/// The two ends of the sibling list of one level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Level {
    /// The leftmost node of the level.
    pub first: Option<NodeId>,
    /// The rightmost node of the level.
    pub last: Option<NodeId>,
}

/// One doubly-linked sibling list per tree level, leaves at index `0`.
///
/// The links themselves live in each node's `previous`/`next` fields; this
/// type only tracks the ends and keeps both directions consistent.
#[derive(Clone, Debug, Default)]
pub(crate) struct Levels {
    lists: Vec<Level>,
}

impl Levels {
    pub fn get(&self, level: usize) -> Option<&Level> {
        self.lists.get(level)
    }

    /// Number of levels, which is the height of the tree plus one.
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.lists.iter()
    }

    pub fn clear(&mut self) {
        self.lists.clear();
    }

    /// Opens a new topmost level containing only `node`.
    pub fn push<Key, Value>(
        &mut self,
        arena: &mut Arena<Key, Value>,
        node: NodeId,
    ) -> Result<(), DialogMerkleTreeError>
    where
        Key: KeyType,
        Value: ValueType,
    {
        let entry = arena.get_mut(node)?;
        entry.previous = None;
        entry.next = None;
        self.lists.push(Level {
            first: Some(node),
            last: Some(node),
        });
        Ok(())
    }

    /// Removes the topmost level, which must hold only `node`.
    pub fn pop<Key, Value>(
        &mut self,
        arena: &mut Arena<Key, Value>,
        node: NodeId,
    ) -> Result<(), DialogMerkleTreeError>
    where
        Key: KeyType,
        Value: ValueType,
    {
        match self.lists.last() {
            Some(level) if level.first == Some(node) && level.last == Some(node) => {
                self.lists.pop();
                let entry = arena.get_mut(node)?;
                entry.previous = None;
                entry.next = None;
                Ok(())
            }
            _ => Err(DialogMerkleTreeError::UnexpectedTreeShape(format!(
                "Node {node} is not alone on the top level"
            ))),
        }
    }

    /// Links `node` directly after `anchor` on the anchor's level.
    pub fn insert_after<Key, Value>(
        &mut self,
        arena: &mut Arena<Key, Value>,
        anchor: NodeId,
        node: NodeId,
    ) -> Result<(), DialogMerkleTreeError>
    where
        Key: KeyType,
        Value: ValueType,
    {
        let (level, next) = {
            let anchor = arena.get_mut(anchor)?;
            let next = anchor.next.replace(node);
            (anchor.level, next)
        };
        {
            let entry = arena.get_mut(node)?;
            entry.previous = Some(anchor);
            entry.next = next;
        }
        match next {
            Some(next) => arena.get_mut(next)?.previous = Some(node),
            None => self.list_mut(level)?.last = Some(node),
        }
        Ok(())
    }

    /// Links `node` directly before `anchor` on the anchor's level.
    pub fn insert_before<Key, Value>(
        &mut self,
        arena: &mut Arena<Key, Value>,
        anchor: NodeId,
        node: NodeId,
    ) -> Result<(), DialogMerkleTreeError>
    where
        Key: KeyType,
        Value: ValueType,
    {
        let (level, previous) = {
            let anchor = arena.get_mut(anchor)?;
            let previous = anchor.previous.replace(node);
            (anchor.level, previous)
        };
        {
            let entry = arena.get_mut(node)?;
            entry.previous = previous;
            entry.next = Some(anchor);
        }
        match previous {
            Some(previous) => arena.get_mut(previous)?.next = Some(node),
            None => self.list_mut(level)?.first = Some(node),
        }
        Ok(())
    }

    /// Detaches `node` from its level, joining its neighbours.
    pub fn unlink<Key, Value>(
        &mut self,
        arena: &mut Arena<Key, Value>,
        node: NodeId,
    ) -> Result<(), DialogMerkleTreeError>
    where
        Key: KeyType,
        Value: ValueType,
    {
        let (level, previous, next) = {
            let entry = arena.get_mut(node)?;
            (entry.level, entry.previous.take(), entry.next.take())
        };
        match previous {
            Some(previous) => arena.get_mut(previous)?.next = next,
            None => self.list_mut(level)?.first = next,
        }
        match next {
            Some(next) => arena.get_mut(next)?.previous = previous,
            None => self.list_mut(level)?.last = previous,
        }
        Ok(())
    }

    fn list_mut(&mut self, level: usize) -> Result<&mut Level, DialogMerkleTreeError> {
        self.lists.get_mut(level).ok_or_else(|| {
            DialogMerkleTreeError::UnexpectedTreeShape(format!("Level {level} does not exist"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Entry, Node};
    use anyhow::Result;

    fn order(levels: &Levels, arena: &Arena<u32, u32>) -> Result<Vec<NodeId>> {
        let mut ids = vec![];
        let mut cursor = levels.get(0).and_then(|level| level.first);
        while let Some(id) = cursor {
            ids.push(id);
            cursor = arena.get(id)?.next();
        }
        Ok(ids)
    }

    #[test]
    fn it_links_and_unlinks_siblings() -> Result<()> {
        let mut arena = Arena::<u32, u32>::new();
        let mut levels = Levels::default();

        let a = arena.allocate(|id| Node::leaf(id, vec![Entry::new(1, 1)]));
        let b = arena.allocate(|id| Node::leaf(id, vec![Entry::new(2, 2)]));
        let c = arena.allocate(|id| Node::leaf(id, vec![Entry::new(3, 3)]));

        levels.push(&mut arena, b)?;
        levels.insert_after(&mut arena, b, c)?;
        levels.insert_before(&mut arena, b, a)?;
        assert_eq!(order(&levels, &arena)?, vec![a, b, c]);
        assert_eq!(levels.get(0).and_then(|level| level.last), Some(c));

        levels.unlink(&mut arena, b)?;
        assert_eq!(order(&levels, &arena)?, vec![a, c]);
        assert_eq!(arena.get(c)?.previous(), Some(a));

        levels.unlink(&mut arena, a)?;
        levels.unlink(&mut arena, c)?;
        assert_eq!(levels.get(0), Some(&Level::default()));
        Ok(())
    }

    #[test]
    fn it_only_pops_a_lone_top_level() -> Result<()> {
        let mut arena = Arena::<u32, u32>::new();
        let mut levels = Levels::default();

        let a = arena.allocate(|id| Node::leaf(id, vec![]));
        let b = arena.allocate(|id| Node::leaf(id, vec![]));
        levels.push(&mut arena, a)?;
        levels.insert_after(&mut arena, a, b)?;

        assert!(levels.pop(&mut arena, a).is_err());
        levels.unlink(&mut arena, b)?;
        levels.pop(&mut arena, a)?;
        assert_eq!(levels.len(), 0);
        Ok(())
    }
}
