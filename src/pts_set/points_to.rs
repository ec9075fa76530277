// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::slice;

use crate::util::bit_vec::{BitIter, BitVec, Idx};

const SMALL_SET_CAPACITY: usize = 32;

/// A set of abstract locations. Stored points-to sets only grow; `subtract`
/// exists to compute differences into temporaries.
pub trait PointsToSet<T> {
    type Iter<'a>: Iterator<Item = T>
    where
        Self: 'a;

    fn new() -> Self;
    fn count(&self) -> usize;
    fn contains(&self, elem: T) -> bool;
    fn is_empty(&self) -> bool;
    fn superset(&self, other: &Self) -> bool;
    fn insert(&mut self, elem: T) -> bool;
    fn union(&mut self, other: &Self) -> bool;
    fn subtract(&mut self, other: &Self) -> bool;
    fn iter<'a>(&'a self) -> Self::Iter<'a>;
}

/// Keeps an explicit vector while the set is small and switches to a bit
/// vector once it outgrows `SMALL_SET_CAPACITY`.
#[derive(Clone)]
pub struct HybridPointsToSet<T> {
    points_to: HybridSet<T>,
}

impl<T: Idx> fmt::Debug for HybridPointsToSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.points_to.fmt(f)
    }
}

impl<T: Idx> Default for HybridPointsToSet<T> {
    fn default() -> Self {
        <Self as PointsToSet<T>>::new()
    }
}

impl<'a, T: Idx> IntoIterator for &'a HybridPointsToSet<T> {
    type Item = T;
    type IntoIter = HybridIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Idx> PointsToSet<T> for HybridPointsToSet<T> {
    type Iter<'a> = HybridIter<'a, T>;

    fn new() -> Self {
        HybridPointsToSet {
            points_to: HybridSet::SmallSet(Vec::new()),
        }
    }

    fn count(&self) -> usize {
        self.points_to.count()
    }

    fn contains(&self, elem: T) -> bool {
        self.points_to.contains(elem)
    }

    fn is_empty(&self) -> bool {
        self.points_to.count() == 0
    }

    fn superset(&self, other: &HybridPointsToSet<T>) -> bool {
        match (&self.points_to, &other.points_to) {
            (HybridSet::LargeSet(ours), HybridSet::LargeSet(theirs)) => ours.superset(theirs),
            _ => other.iter().all(|elem| self.contains(elem)),
        }
    }

    /// Adds `elem`, returning `true` if it was absent.
    fn insert(&mut self, elem: T) -> bool {
        self.points_to.insert(elem)
    }

    fn union(&mut self, other: &HybridPointsToSet<T>) -> bool {
        match (&mut self.points_to, &other.points_to) {
            (HybridSet::LargeSet(ours), HybridSet::LargeSet(theirs)) => ours.union(theirs),
            (HybridSet::SmallSet(ours), HybridSet::LargeSet(theirs)) => {
                let mut large = BitVec::from_elems(ours.iter().copied());
                let changed = large.union(theirs);
                self.points_to = HybridSet::LargeSet(large);
                changed
            }
            (_, HybridSet::SmallSet(theirs)) => {
                let mut changed = false;
                for &elem in theirs {
                    changed |= self.points_to.insert(elem);
                }
                changed
            }
        }
    }

    fn subtract(&mut self, other: &HybridPointsToSet<T>) -> bool {
        match (&mut self.points_to, &other.points_to) {
            (HybridSet::LargeSet(ours), HybridSet::LargeSet(theirs)) => ours.subtract(theirs),
            (HybridSet::LargeSet(ours), HybridSet::SmallSet(theirs)) => {
                ours.subtract(&BitVec::from_elems(theirs.iter().copied()))
            }
            (HybridSet::SmallSet(ours), theirs) => {
                let before = ours.len();
                ours.retain(|&elem| !theirs.contains(elem));
                ours.len() != before
            }
        }
    }

    fn iter(&self) -> HybridIter<'_, T> {
        match &self.points_to {
            HybridSet::SmallSet(small) => HybridIter::SmallIter(small.iter()),
            HybridSet::LargeSet(large) => HybridIter::LargeIter(large.iter()),
        }
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
            Self::SmallSet(s) => f.debug_set().entries(s.iter()).finish(),
            Self::LargeSet(s) => s.fmt(f),
        }
    }
}

impl<T: Idx> HybridSet<T> {
    fn count(&self) -> usize {
        match self {
            HybridSet::SmallSet(small) => small.len(),
            HybridSet::LargeSet(large) => large.count(),
        }
    }

    fn contains(&self, elem: T) -> bool {
        match self {
            HybridSet::SmallSet(small) => small.contains(&elem),
            HybridSet::LargeSet(large) => large.contains(elem),
        }
    }

    fn insert(&mut self, elem: T) -> bool {
        match self {
            HybridSet::SmallSet(small) if small.contains(&elem) => false,
            HybridSet::SmallSet(small) if small.len() < SMALL_SET_CAPACITY => {
                small.push(elem);
                true
            }
            HybridSet::SmallSet(small) => {
                // Full, promote to a bit vector.
                let mut large = BitVec::from_elems(small.iter().copied());
                large.insert(elem);
                *self = HybridSet::LargeSet(large);
                true
            }
            HybridSet::LargeSet(large) => large.insert(elem),
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
