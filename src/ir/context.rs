// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result};
use std::hash::Hash;
use std::rc::Rc;

use super::call_site::BaseCallSite;
use crate::util::bit_vec::Idx;

crate::newtype_index! {
    /// The unique identifier for each context.
    pub struct ContextId { debug_format = "ContextId({})" }
}

/// The empty context. Globals live here, and so do the analysis roots.
pub const GLOBAL: ContextId = ContextId::from_u32(0);

pub trait ContextElement: Clone + Eq + PartialEq + Debug + Hash {}

impl ContextElement for BaseCallSite {}

/// A call string, most recent call site first.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Context<E: ContextElement> {
    pub(crate) context_elems: Vec<E>,
}

impl<E: ContextElement> Debug for Context<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.context_elems.fmt(f)
    }
}

impl<E: ContextElement> Context<E> {
    pub fn new_empty() -> Rc<Self> {
        Rc::new(Context {
            context_elems: Vec::new(),
        })
    }

    pub fn new(context_elems: Vec<E>) -> Rc<Self> {
        Rc::new(Context { context_elems })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.context_elems.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.context_elems.is_empty()
    }

    #[inline]
    pub fn elements(&self) -> &[E] {
        &self.context_elems
    }

    /// Pushes `elem` in front of `old_ctx`, dropping the oldest elements beyond depth `k`.
    pub fn new_k_limited_context(old_ctx: &Rc<Context<E>>, elem: E, k: usize) -> Rc<Self> {
        let mut elems = Vec::with_capacity(k);
        if k > 0 {
            elems.push(elem);
            let kept = old_ctx.len().min(k - 1);
            elems.extend_from_slice(&old_ctx.context_elems[..kept]);
        }
        Rc::new(Context { context_elems: elems })
    }
}

/// Interns contexts. Ids are dense and stable for the lifetime of the cache,
/// and the empty context is always `GLOBAL`.
#[derive(Debug)]
pub struct ContextCache<E: ContextElement> {
    context_list: Vec<Rc<Context<E>>>,
    context_to_index_map: HashMap<Rc<Context<E>>, ContextId>,
}

impl<E: ContextElement> Default for ContextCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ContextElement> ContextCache<E> {
    pub fn new() -> ContextCache<E> {
        let mut cache = ContextCache {
            context_list: Vec::new(),
            context_to_index_map: HashMap::new(),
        };
        let global = cache.get_context_id(&Context::new_empty());
        debug_assert_eq!(global, GLOBAL);
        cache
    }

    pub fn get_context_id(&mut self, context: &Rc<Context<E>>) -> ContextId {
        if let Some(id) = self.context_to_index_map.get(context) {
            *id
        } else {
            let id = ContextId::new(self.context_list.len());
            self.context_list.push(context.clone());
            self.context_to_index_map.insert(context.clone(), id);
            id
        }
    }

    pub fn get_context(&self, id: ContextId) -> Option<Rc<Context<E>>> {
        self.context_list.get(id.index()).cloned()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.context_list.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.context_list.is_empty()
    }

    pub fn contexts(&self) -> impl Iterator<Item = (ContextId, &Rc<Context<E>>)> {
        self.context_list
            .iter()
            .enumerate()
            .map(|(i, ctx)| (ContextId::new(i), ctx))
    }
}
