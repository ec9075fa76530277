// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! A dense, growable bit vector keyed by newtyped indices.

use std::fmt;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

type Word = u64;
const WORD_BITS: usize = Word::BITS as usize;

/// A `usize`-convertible index. Keeps indices of different tables apart.
pub trait Idx: Copy + 'static + Eq + Debug + Hash {
    fn new(idx: usize) -> Self;

    fn index(self) -> usize;
}

impl Idx for usize {
    #[inline]
    fn new(idx: usize) -> Self {
        idx
    }
    #[inline]
    fn index(self) -> usize {
        self
    }
}

impl Idx for u32 {
    #[inline]
    fn new(idx: usize) -> Self {
        assert!(idx <= u32::MAX as usize);
        idx as u32
    }
    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// Bits are only ever added by the solver, so there is no removal API.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct BitVec<T> {
    words: Vec<Word>,
    marker: PhantomData<T>,
}

impl<T: Idx> Default for BitVec<T> {
    fn default() -> Self {
        Self::new_empty()
    }
}

impl<T: Idx> BitVec<T> {
    #[inline]
    pub fn new_empty() -> BitVec<T> {
        BitVec {
            words: Vec::new(),
            marker: PhantomData,
        }
    }

    pub fn from_elems(elems: impl IntoIterator<Item = T>) -> BitVec<T> {
        let mut ret = Self::new_empty();
        for elem in elems {
            ret.insert(elem);
        }
        ret
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[inline]
    pub fn contains(&self, elem: T) -> bool {
        let (word, mask) = word_index_and_mask(elem);
        self.words.get(word).map_or(false, |w| w & mask != 0)
    }

    /// Returns `true` if every element of `other` is in `self`.
    pub fn superset(&self, other: &BitVec<T>) -> bool {
        other.words.iter().enumerate().all(|(i, &theirs)| {
            let ours = self.words.get(i).copied().unwrap_or(0);
            theirs & !ours == 0
        })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Sets `elem`, returning `true` if it was not set before.
    pub fn insert(&mut self, elem: T) -> bool {
        let (word, mask) = word_index_and_mask(elem);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let old = self.words[word];
        self.words[word] = old | mask;
        old & mask == 0
    }

    pub fn iter(&self) -> BitIter<'_, T> {
        BitIter {
            words: &self.words,
            word_idx: 0,
            cur: self.words.first().copied().unwrap_or(0),
            marker: PhantomData,
        }
    }

    /// Adds all elements of `other`, returning `true` if `self` changed.
    pub fn union(&mut self, other: &BitVec<T>) -> bool {
        if self.words.len() < other.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        let mut changed = false;
        for (ours, theirs) in self.words.iter_mut().zip(other.words.iter()) {
            let new = *ours | *theirs;
            changed |= new != *ours;
            *ours = new;
        }
        changed
    }

    /// Removes the elements of `other`. Only used to compute set differences
    /// on temporaries, never on a stored points-to set.
    pub fn subtract(&mut self, other: &BitVec<T>) -> bool {
        let mut changed = false;
        for (ours, theirs) in self.words.iter_mut().zip(other.words.iter()) {
            let new = *ours & !*theirs;
            changed |= new != *ours;
            *ours = new;
        }
        changed
    }
}

impl<T: Idx> Debug for BitVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

pub struct BitIter<'a, T: Idx> {
    words: &'a [Word],
    word_idx: usize,
    /// Remaining bits of the current word.
    cur: Word,
    marker: PhantomData<T>,
}

impl<'a, T: Idx> Iterator for BitIter<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            if self.cur != 0 {
                let bit = self.cur.trailing_zeros() as usize;
                self.cur &= self.cur - 1;
                return Some(T::new(self.word_idx * WORD_BITS + bit));
            }
            self.word_idx += 1;
            self.cur = *self.words.get(self.word_idx)?;
        }
    }
}

#[inline]
fn word_index_and_mask<T: Idx>(elem: T) -> (usize, Word) {
    let elem = elem.index();
    (elem / WORD_BITS, 1 << (elem % WORD_BITS))
}
