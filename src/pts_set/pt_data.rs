// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use super::points_to::PointsToSet;
use crate::util::bit_vec::Idx;

/// Diff points-to data.
///
/// Every key owns two sets: `diff`, the elements not yet pushed along the
/// outgoing edges of the key, and `propa`, the elements already pushed. The
/// points-to set of a key is their union, and it only ever grows: `flush`
/// moves elements from `diff` to `propa` and nothing removes them from both.
///
/// K  (Key):     the node owning a points-to set.
/// D  (Data):    elements in points-to sets.
/// DS (DataSet): the points-to set itself.
pub struct DiffPTData<K, D, DS> {
    pub(crate) diff_pts_map: HashMap<K, DS>,
    pub(crate) propa_pts_map: HashMap<K, DS>,

    marker: PhantomData<D>,
}

impl<K, D, DS> fmt::Debug for DiffPTData<K, D, DS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "DiffPTData".fmt(f)
    }
}

impl<K, D, DS> Default for DiffPTData<K, D, DS>
where
    K: Hash + Eq + Copy,
    D: Idx,
    DS: PointsToSet<D> + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, D, DS> DiffPTData<K, D, DS>
where
    K: Hash + Eq + Copy,
    D: Idx,
    DS: PointsToSet<D> + Clone,
{
    pub fn new() -> DiffPTData<K, D, DS> {
        DiffPTData {
            diff_pts_map: HashMap::new(),
            propa_pts_map: HashMap::new(),
            marker: PhantomData,
        }
    }

    /// Adds element to the points-to set associated with var.
    /// Returns false if elem is already in this set.
    #[inline]
    pub fn add_pts(&mut self, var: K, elem: D) -> bool {
        if let Some(propa) = self.propa_pts_map.get(&var) {
            if propa.contains(elem) {
                return false;
            }
        }
        self.diff_pts_map.entry(var).or_insert_with(DS::new).insert(elem)
    }

    /// diff_pts(dst_var) = diff_pts(dst_var) U (diff_pts(src_var) - propa_pts(dst_var)).
    pub fn union_diff_pts(&mut self, dst_var: K, src_var: K) -> bool {
        if dst_var == src_var {
            return false;
        }
        match self.diff_pts_map.get(&src_var) {
            Some(diff) => {
                let src_ds = diff.clone();
                self.union_pts_to(dst_var, &src_ds)
            }
            None => false,
        }
    }

    /// diff_pts(dst_var) = diff_pts(dst_var) U (pts(src_var) - propa_pts(dst_var)).
    pub fn union_pts(&mut self, dst_var: K, src_var: K) -> bool {
        if dst_var == src_var {
            return false;
        }
        let mut changed = false;
        if let Some(diff) = self.diff_pts_map.get(&src_var) {
            let src_ds = diff.clone();
            changed |= self.union_pts_to(dst_var, &src_ds);
        }
        if let Some(propa) = self.propa_pts_map.get(&src_var) {
            let src_ds = propa.clone();
            changed |= self.union_pts_to(dst_var, &src_ds);
        }
        changed
    }

    /// diff_pts(dst_var) = diff_pts(dst_var) U (src_ds - propa_pts(dst_var)).
    pub fn union_pts_to(&mut self, dst_var: K, src_ds: &DS) -> bool {
        let mut new = src_ds.clone();
        if let Some(propa) = self.propa_pts_map.get(&dst_var) {
            new.subtract(propa);
        }
        if new.is_empty() {
            return false;
        }
        self.diff_pts_map.entry(dst_var).or_insert_with(DS::new).union(&new)
    }

    #[inline]
    pub fn get_diff_pts(&self, var: K) -> Option<&DS> {
        self.diff_pts_map.get(&var)
    }

    #[inline]
    pub fn get_propa_pts(&self, var: K) -> Option<&DS> {
        self.propa_pts_map.get(&var)
    }

    /// Size of the whole points-to set of var (diff and propagated parts are disjoint).
    pub fn get_pts_count(&self, var: K) -> usize {
        self.diff_pts_map.get(&var).map_or(0, |ds| ds.count())
            + self.propa_pts_map.get(&var).map_or(0, |ds| ds.count())
    }

    /// The whole points-to set of var.
    pub fn get_pts(&self, var: K) -> DS {
        let mut pts = self.propa_pts_map.get(&var).cloned().unwrap_or_else(DS::new);
        if let Some(diff) = self.diff_pts_map.get(&var) {
            pts.union(diff);
        }
        pts
    }

    /// Keys that own a non-empty points-to set.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.propa_pts_map
            .iter()
            .chain(self.diff_pts_map.iter())
            .filter(|(_, ds)| !ds.is_empty())
            .map(|(k, _)| *k)
    }

    /// Marks the diff elements of var as propagated.
    pub fn flush(&mut self, var: K) {
        let Some(diff) = self.diff_pts_map.get_mut(&var) else {
            return;
        };
        let diff = std::mem::replace(diff, DS::new());
        self.propa_pts_map.entry(var).or_insert_with(DS::new).union(&diff);
    }
}
