// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use arrayvec::ArrayVec;
use std::fmt::{Debug, Formatter, Result};

// The maximum number of elements a chunk can hold.
const CHUNK_CAP: usize = 60;

/// An append-only queue stored as a list of fixed-size chunks.
///
/// Elements never move once pushed, so a `QueueCursor` can keep walking the
/// queue while new elements are appended behind it. This is how the solver
/// picks up reachable functions and address edges discovered on the fly.
pub struct ChunkedQueue<T> {
    chunks: Vec<ArrayVec<T, CHUNK_CAP>>,
    len: usize,
}

impl<T: Debug> Debug for ChunkedQueue<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> Default for ChunkedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChunkedQueue<T> {
    pub fn new() -> Self {
        ChunkedQueue {
            chunks: Vec::new(),
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, elem: T) {
        match self.chunks.last_mut() {
            Some(chunk) if !chunk.is_full() => chunk.push(elem),
            _ => {
                let mut chunk = ArrayVec::new();
                chunk.push(elem);
                self.chunks.push(chunk);
            }
        }
        self.len += 1;
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.chunks
            .get(index / CHUNK_CAP)
            .and_then(|chunk| chunk.get(index % CHUNK_CAP))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.chunks.iter().flat_map(|chunk| chunk.iter())
    }

    /// A cursor positioned at the current end of the queue.
    pub fn cursor_at_end(&self) -> QueueCursor {
        QueueCursor { pos: self.len }
    }
}

/// A position in a `ChunkedQueue`. It does not borrow the queue, so the
/// queue may grow between two calls to `next`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueCursor {
    pos: usize,
}

impl QueueCursor {
    pub fn new() -> Self {
        QueueCursor { pos: 0 }
    }

    /// Returns the element under the cursor and advances it.
    pub fn next<T: Copy>(&mut self, queue: &ChunkedQueue<T>) -> Option<T> {
        let elem = queue.get(self.pos).copied()?;
        self.pos += 1;
        Some(elem)
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }
}
