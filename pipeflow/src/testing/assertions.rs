//! Assertions for stream outputs.

use std::fmt::Debug;

/// Asserts that two collections hold the same elements, ignoring order.
///
/// Use this for merged outputs (mux, parallelize) where only the multiset
/// of elements is guaranteed.
pub fn assert_unordered_eq<T: Ord + Debug>(mut actual: Vec<T>, mut expected: Vec<T>) {
    actual.sort();
    expected.sort();
    assert_eq!(
        actual, expected,
        "Expected the same elements in any order"
    );
}

/// Asserts that `actual` is a prefix of `full`.
///
/// A cut-short run (cancellation, early close) delivers a prefix of what a
/// complete run would have.
pub fn assert_prefix_of<T: PartialEq + Debug>(actual: &[T], full: &[T]) {
    assert!(
        actual.len() <= full.len() && actual == &full[..actual.len()],
        "Expected {actual:?} to be a prefix of {full:?}"
    );
}

/// Asserts that `items` never goes backwards under `key`.
pub fn assert_non_decreasing_by<T, K, F>(items: &[T], key: F)
where
    T: Debug,
    K: PartialOrd,
    F: Fn(&T) -> K,
{
    if let Some(pos) = items.windows(2).position(|pair| key(&pair[0]) > key(&pair[1])) {
        panic!(
            "Expected non-decreasing order, but {:?} came before {:?}",
            items[pos],
            items[pos + 1]
        );
    }
}
