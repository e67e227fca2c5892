use anyhow::Result;
use dialog_merkle_tree::Tree;
use pretty_assertions::assert_eq;
use std::ops::Bound;

fn populated(
    order: usize,
    entries: usize,
    keys: impl IntoIterator<Item = u32>,
) -> Result<Tree<u32, u32>> {
    let mut tree = Tree::init(order, entries)?;
    for key in keys {
        tree.insert(key, key * 10)?;
    }
    Ok(tree)
}

fn keys<'a>(range: impl Iterator<Item = (&'a u32, &'a u32)>) -> Vec<u32> {
    range.map(|(key, _)| *key).collect()
}

#[test]
fn range_is_inclusive_of_both_ends() -> Result<()> {
    let tree = populated(7, 10, [24, 72, 1, 39, 53, 63, 90, 88, 15, 10, 44, 68, 74])?;

    assert_eq!(keys(tree.range(15..=53)), vec![15, 24, 39, 44, 53]);
    assert_eq!(keys(tree.range(16..=52)), vec![24, 39, 44]);
    assert_eq!(keys(tree.range(0..=1)), vec![1]);
    assert_eq!(keys(tree.range(90..=1000)), vec![90]);
    Ok(())
}

#[test]
fn range_yields_values_alongside_keys() -> Result<()> {
    let tree = populated(4, 3, 0..30)?;
    let pairs: Vec<(u32, u32)> = tree
        .range(5..8)
        .map(|(key, value)| (*key, *value))
        .collect();
    assert_eq!(pairs, vec![(5, 50), (6, 60), (7, 70)]);
    Ok(())
}

#[test]
fn range_crosses_every_leaf() -> Result<()> {
    let tree = populated(3, 1, (0..64).rev())?;
    assert_eq!(keys(tree.range(..)), (0..64).collect::<Vec<_>>());
    assert_eq!(keys(tree.range(60..)), vec![60, 61, 62, 63]);
    assert_eq!(keys(tree.range(..=3)), vec![0, 1, 2, 3]);
    Ok(())
}

#[test]
fn range_on_an_empty_tree_is_empty() -> Result<()> {
    let tree = Tree::<u32, u32>::init(7, 10)?;
    assert_eq!(keys(tree.range(0..=100)), Vec::<u32>::new());
    assert_eq!(keys(tree.iter()), Vec::<u32>::new());
    Ok(())
}

#[test]
fn inverted_bounds_yield_nothing() -> Result<()> {
    let tree = populated(5, 4, 0..100)?;
    assert_eq!(
        keys(tree.range((Bound::Included(60), Bound::Included(40)))),
        Vec::<u32>::new()
    );
    Ok(())
}

#[test]
fn range_can_be_restarted_from_the_last_key_seen() -> Result<()> {
    let tree = populated(5, 4, (0..200).map(|key| key * 2))?;

    let mut seen = vec![];
    let mut start = Bound::Unbounded;
    loop {
        let page = keys(tree.range((start, Bound::Unbounded)).take(7));
        let Some(last) = page.last().copied() else {
            break;
        };
        seen.extend(page);
        start = Bound::Excluded(last);
    }

    assert_eq!(seen, (0..200).map(|key| key * 2).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn range_reflects_removals() -> Result<()> {
    let mut tree = populated(4, 4, 0..50)?;
    for key in (10..40).filter(|key| key % 2 == 1) {
        tree.remove(&key)?;
    }
    assert_eq!(keys(tree.range(8..=16)), vec![8, 9, 10, 12, 14, 16]);
    Ok(())
}
