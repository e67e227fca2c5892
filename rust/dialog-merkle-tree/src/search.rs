//! The binary search primitive shared by every descent through the tree.
//!
//! Results use a signed encoding: a non-negative result is the index of the
//! target, and a negative result `r` means the target is absent and would be
//! inserted at `-r - 1`.

/// Searches `keys` for `target` and returns its index, or the encoded
/// insertion point if it is absent.
pub fn binary_search<Key, Probe>(
    keys: &[Probe],
    target: &Key,
    key: impl Fn(&Probe) -> &Key,
) -> isize
where
    Key: Ord,
{
    // Invariant: keys[..=low] < target <= keys[high..]
    let mut low: isize = -1;
    let mut high: isize = keys.len() as isize;
    while low + 1 < high {
        let middle = low + (high - low) / 2;
        if target > key(&keys[middle as usize]) {
            low = middle;
        } else {
            high = middle;
        }
    }

    match keys.get(high as usize) {
        Some(probe) if key(probe) == target => high,
        _ => -high - 1,
    }
}

/// Searches a plain key slice; see [`binary_search`].
pub fn key_binary_search<Key>(keys: &[Key], target: &Key) -> isize
where
    Key: Ord,
{
    binary_search(keys, target, |key| key)
}

/// Decodes a negative search result into the index at which the target
/// would be inserted.
pub fn insertion_point(result: isize) -> usize {
    debug_assert!(result < 0);
    (-result - 1) as usize
}

/// The child to descend into when routing `result` through a branch's
/// separator keys: an exact hit on separator `i` routes right of it.
pub(crate) fn child_index(result: isize) -> usize {
    if result >= 0 {
        result as usize + 1
    } else {
        insertion_point(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_finds_present_keys() {
        let keys = [1, 10, 15, 24, 39];
        for (index, key) in keys.iter().enumerate() {
            assert_eq!(key_binary_search(&keys, key), index as isize);
        }
    }

    #[test]
    fn it_encodes_the_insertion_point_of_absent_keys() {
        let keys = [1, 10, 15, 24, 39];
        assert_eq!(key_binary_search(&keys, &0), -1);
        assert_eq!(insertion_point(key_binary_search(&keys, &0)), 0);
        assert_eq!(insertion_point(key_binary_search(&keys, &12)), 2);
        assert_eq!(insertion_point(key_binary_search(&keys, &40)), 5);
    }

    #[test]
    fn it_handles_an_empty_slice() {
        let keys: [u32; 0] = [];
        assert_eq!(key_binary_search(&keys, &3), -1);
    }

    #[test]
    fn it_routes_exact_separator_hits_to_the_right() {
        let separators = [10, 20];
        assert_eq!(child_index(key_binary_search(&separators, &5)), 0);
        assert_eq!(child_index(key_binary_search(&separators, &10)), 1);
        assert_eq!(child_index(key_binary_search(&separators, &15)), 1);
        assert_eq!(child_index(key_binary_search(&separators, &20)), 2);
        assert_eq!(child_index(key_binary_search(&separators, &99)), 2);
    }
}
