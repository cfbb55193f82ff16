// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use super::points_to::PointsToSet;
use crate::util::bit_vec::Idx;

/// Basic points-to data structure.
/// Given a key (a pointer-flow-graph node), returns its points-to set.
///
/// K (Key):  "owning" pointer of a points-to set.
/// D (Data): elements in points-to sets, i.e. abstract heap objects.
pub struct PTData<K, D> {
    pts_map: HashMap<K, PointsToSet<D>>,
}

impl<K, D> fmt::Debug for PTData<K, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "PTData".fmt(f)
    }
}

impl<K, D> Default for PTData<K, D>
where
    K: Hash + Eq + Copy,
    D: Idx,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, D> PTData<K, D>
where
    K: Hash + Eq + Copy,
    D: Idx,
{
    pub fn new() -> PTData<K, D> {
        PTData {
            pts_map: HashMap::new(),
        }
    }

    /// Get points-to set of a pointer.
    #[inline]
    pub fn get_pts(&self, key: K) -> Option<&PointsToSet<D>> {
        self.pts_map.get(&key)
    }

    /// Adds element to the points-to set associated with the pointer.
    /// Returns true if the element was not already in the set.
    pub fn add_pts(&mut self, key: K, elem: D) -> bool {
        self.pts_map.entry(key).or_default().insert(elem)
    }

    /// Performs pts(key) = pts(key) U data_set.
    pub fn union_pts_to(&mut self, key: K, data_set: &PointsToSet<D>) -> bool {
        self.pts_map.entry(key).or_default().union(data_set)
    }

    /// Returns the part of `incoming` not yet recorded for `key`.
    pub fn diff_pts(&self, key: K, incoming: &PointsToSet<D>) -> PointsToSet<D> {
        let mut delta = incoming.clone();
        if let Some(known) = self.pts_map.get(&key) {
            delta.subtract(known);
        }
        delta
    }

    /// Iterates over all keys with a non-empty points-to set.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &PointsToSet<D>)> {
        self.pts_map.iter().filter(|(_, pts)| !pts.is_empty())
    }
}
