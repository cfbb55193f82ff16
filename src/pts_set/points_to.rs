// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::slice;

use crate::util::bit_vec::{BitIter, BitVec, Idx};

const SMALL_SET_CAPACITY: usize = 32;

/// Hybrid implementation of points to set,
/// which uses an explicit array for small sets, and a bit vector for large sets.
///
/// Points-to sets are append-only during solving: objects are added, never
/// removed.
#[derive(Clone)]
pub struct PointsToSet<T> {
    points_to: HybridSet<T>,
}

impl<T: Idx> fmt::Debug for PointsToSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.points_to.fmt(f)
    }
}

/// IntoIterator
impl<'a, T: Idx> IntoIterator for &'a PointsToSet<T> {
    type Item = T;
    type IntoIter = HybridIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Idx> Default for PointsToSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Idx> PointsToSet<T> {
    pub fn new() -> Self {
        PointsToSet {
            points_to: HybridSet::new(),
        }
    }

    /// Creates a singleton set.
    pub fn singleton(elem: T) -> Self {
        let mut set = Self::new();
        set.insert(elem);
        set
    }

    /// Count the number of elements in the set.
    pub fn count(&self) -> usize {
        self.points_to.count()
    }

    /// Returns `true` if `self` contains `elem`.
    pub fn contains(&self, elem: T) -> bool {
        self.points_to.contains(elem)
    }

    pub fn is_empty(&self) -> bool {
        self.points_to.is_empty()
    }

    /// Is `self` is a superset of `other`?
    pub fn superset(&self, other: &PointsToSet<T>) -> bool {
        self.points_to.superset(&other.points_to)
    }

    /// Adds `elem` to this set, returns true if n was not already in this set.
    pub fn insert(&mut self, elem: T) -> bool {
        self.points_to.insert(elem)
    }

    pub fn union(&mut self, other: &PointsToSet<T>) -> bool {
        self.points_to.union(&other.points_to)
    }

    pub fn subtract(&mut self, other: &PointsToSet<T>) -> bool {
        self.points_to.subtract(&other.points_to)
    }

    pub fn iter(&self) -> HybridIter<'_, T> {
        self.points_to.iter()
    }
}

#[derive(Clone)]
enum HybridSet<T> {
    SmallSet(Vec<T>),
    LargeSet(BitVec<T>),
}

impl<T: Idx> fmt::Debug for HybridSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SmallSet(s) => s.fmt(f),
            Self::LargeSet(s) => s.fmt(f),
        }
    }
}

impl<T: Idx> HybridSet<T> {
    fn new() -> Self {
        HybridSet::SmallSet(Vec::with_capacity(SMALL_SET_CAPACITY))
    }

    /// Count the number of elements in the set.
    fn count(&self) -> usize {
        match self {
            HybridSet::SmallSet(small) => small.len(),
            HybridSet::LargeSet(large) => large.count(),
        }
    }

    /// Returns `true` if `self` contains `elem`.
    fn contains(&self, elem: T) -> bool {
        match self {
            HybridSet::SmallSet(small) => small.contains(&elem),
            HybridSet::LargeSet(large) => large.contains(elem),
        }
    }

    /// Is `self` is a superset of `other`?
    fn superset(&self, other: &HybridSet<T>) -> bool {
        match (self, other) {
            (HybridSet::LargeSet(self_large), HybridSet::LargeSet(other_large)) => {
                self_large.superset(other_large)
            }
            _ => other.iter().all(|elem| self.contains(elem)),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            HybridSet::SmallSet(small) => small.is_empty(),
            HybridSet::LargeSet(large) => large.is_empty(),
        }
    }

    /// Adds `elem` to this set, returns true if n was not already in this set.
    fn insert(&mut self, elem: T) -> bool {
        match self {
            HybridSet::SmallSet(small) if small.contains(&elem) => false,
            HybridSet::SmallSet(small) if small.len() < SMALL_SET_CAPACITY => {
                // The set is small and has space for `elem`.
                small.push(elem);
                true
            }
            HybridSet::SmallSet(small) => {
                // The set is small and full. Convert to a large set.
                let mut large = BitVec::new_empty();
                for elem in small {
                    large.insert(*elem);
                }
                let changed = large.insert(elem);
                *self = HybridSet::LargeSet(large);
                changed
            }
            HybridSet::LargeSet(large) => large.insert(elem),
        }
    }

    fn iter(&self) -> HybridIter<'_, T> {
        match self {
            HybridSet::SmallSet(small) => HybridIter::SmallIter(small.iter()),
            HybridSet::LargeSet(large) => HybridIter::LargeIter(large.iter()),
        }
    }

    fn union(&mut self, other: &HybridSet<T>) -> bool {
        match self {
            HybridSet::LargeSet(self_large) => match other {
                HybridSet::LargeSet(other_large) => self_large.union(other_large),
                HybridSet::SmallSet(other_small) => {
                    let mut changed = false;
                    for elem in other_small.iter() {
                        changed |= self_large.insert(*elem);
                    }
                    changed
                }
            },
            HybridSet::SmallSet(self_small) => {
                match other {
                    HybridSet::LargeSet(other_large) => {
                        // convert self set to a large set
                        let mut self_large = BitVec::new_empty();
                        for elem in self_small.iter() {
                            self_large.insert(*elem);
                        }
                        let changed = self_large.union(other_large);
                        *self = HybridSet::LargeSet(self_large);
                        changed
                    }
                    HybridSet::SmallSet(other_small) => {
                        let mut changed = false;
                        for &elem in other_small.iter() {
                            changed |= self.insert(elem);
                        }
                        changed
                    }
                }
            }
        }
    }

    fn subtract(&mut self, other: &HybridSet<T>) -> bool {
        match self {
            HybridSet::LargeSet(self_large) => match other {
                HybridSet::LargeSet(other_large) => self_large.subtract(other_large),
                HybridSet::SmallSet(other_small) => {
                    let mut changed = false;
                    for &elem in other_small.iter() {
                        changed |= self_large.remove(elem);
                    }
                    changed
                }
            },
            HybridSet::SmallSet(self_small) => {
                let mut changed = false;
                self_small.retain(|&elem| {
                    let contains = other.contains(elem);
                    if contains {
                        changed = true;
                    }
                    !contains
                });
                changed
            }
        }
    }
}

pub enum HybridIter<'a, T: Idx> {
    SmallIter(slice::Iter<'a, T>),
    LargeIter(BitIter<'a, T>),
}

impl<'a, T: Idx> Iterator for HybridIter<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        match self {
            HybridIter::SmallIter(small) => small.next().copied(),
            HybridIter::LargeIter(large) => large.next(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    fn set_of(elems: &[u32]) -> PointsToSet<u32> {
        let mut set = PointsToSet::new();
        for &e in elems {
            set.insert(e);
        }
        set
    }

    #[test]
    fn small_set_membership() {
        let mut set = set_of(&[3, 1, 4, 1, 5, 9, 2, 6]);
        assert_eq!(set.count(), 7);
        assert!(set.contains(9));
        assert!(!set.contains(7));
        assert!(!set.insert(3));
        assert!(set.insert(7));
    }

    #[test]
    fn spills_to_large_set() {
        let elems: Vec<u32> = (0..SMALL_SET_CAPACITY as u32 + 3).collect();
        let set = set_of(&elems);
        assert_eq!(set.count(), elems.len());
        assert!(matches!(set.points_to, HybridSet::LargeSet(_)));
        assert_eq!(
            set.iter().collect::<HashSet<_>>(),
            elems.iter().copied().collect::<HashSet<_>>()
        );
    }

    #[test]
    fn union_across_representations() {
        let small = set_of(&[1, 2, 3]);
        let large_elems: Vec<u32> = (100..140).collect();
        let large = set_of(&large_elems);

        let mut union_set = small.clone();
        assert!(union_set.union(&large));
        assert!(union_set.superset(&small));
        assert!(union_set.superset(&large));
        assert!(!union_set.union(&large));

        let mut union_set2 = large.clone();
        assert!(union_set2.union(&small));
        assert_eq!(
            union_set.iter().collect::<HashSet<_>>(),
            union_set2.iter().collect::<HashSet<_>>()
        );
    }

    #[test]
    fn subtract_yields_delta() {
        let mut incoming = set_of(&[1, 2, 3, 4]);
        let known = set_of(&[2, 4]);
        assert!(incoming.subtract(&known));
        assert_eq!(incoming.iter().collect::<HashSet<_>>(), HashSet::from([1, 3]));
        assert!(!incoming.subtract(&known));
    }
}
