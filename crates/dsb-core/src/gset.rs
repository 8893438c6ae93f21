//! Grow-only set - the lattice behind the built-in reference document.

use crate::lattice::Lattice;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;

/// A set whose elements can be added but never removed. Join is set union.
///
/// Backed by a `BTreeSet` so serialized form is deterministic for a given
/// membership, independent of insertion order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GSet<T: Ord + Clone> {
    elements: BTreeSet<T>,
}

impl<T: Ord + Clone> GSet<T> {
    pub fn new() -> Self {
        Self {
            elements: BTreeSet::new(),
        }
    }

    /// A set holding one element. The natural shape of a single-mutation
    /// delta.
    pub fn singleton(value: T) -> Self {
        let mut set = Self::new();
        set.elements.insert(value);
        set
    }

    /// Add an element. Returns false if it was already present.
    pub fn insert(&mut self, value: T) -> bool {
        self.elements.insert(value)
    }

    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.elements.contains(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl<T: Ord + Clone> Default for GSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + Clone> FromIterator<T> for GSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl<T: Ord + Clone> Lattice for GSet<T> {
    fn bottom() -> Self {
        Self::new()
    }

    fn join(&self, other: &Self) -> Self {
        Self {
            elements: self.elements.union(&other.elements).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Lattice laws, checked over random memberships
    proptest! {
        #[test]
        fn join_is_commutative(
            a in prop::collection::vec(0i32..64, 0..16),
            b in prop::collection::vec(0i32..64, 0..16)
        ) {
            let set_a: GSet<i32> = a.into_iter().collect();
            let set_b: GSet<i32> = b.into_iter().collect();

            prop_assert_eq!(set_a.join(&set_b), set_b.join(&set_a));
        }

        #[test]
        fn join_is_associative(
            a in prop::collection::vec(0i32..64, 0..12),
            b in prop::collection::vec(0i32..64, 0..12),
            c in prop::collection::vec(0i32..64, 0..12)
        ) {
            let set_a: GSet<i32> = a.into_iter().collect();
            let set_b: GSet<i32> = b.into_iter().collect();
            let set_c: GSet<i32> = c.into_iter().collect();

            let left = set_a.join(&set_b).join(&set_c);
            let right = set_a.join(&set_b.join(&set_c));

            prop_assert_eq!(left, right);
        }

        #[test]
        fn join_is_idempotent(
            a in prop::collection::vec(0i32..64, 0..16)
        ) {
            let set_a: GSet<i32> = a.into_iter().collect();

            prop_assert_eq!(set_a.join(&set_a), set_a);
        }
    }

    #[test]
    fn insert_reports_novelty() {
        let mut set = GSet::new();
        assert!(set.insert("x"));
        assert!(!set.insert("x"));
        assert_eq!(set.len(), 1);
    }
}
