// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::rc::Rc;

use crate::ir::call_site::{BaseCallSite, CSCallSite};
use crate::ir::context::{Context, ContextCache, ContextElement, ContextId, GLOBAL};

/// Decides under which context a callee is analysed.
pub trait ContextStrategy {
    type E: ContextElement;

    #[inline]
    fn get_empty_context_id(&self) -> ContextId {
        GLOBAL
    }

    fn get_context_id(&mut self, context: &Rc<Context<Self::E>>) -> ContextId;

    fn get_context_by_id(&self, context_id: ContextId) -> Rc<Context<Self::E>>;

    /// The context of the callee reached through `callsite`.
    fn new_static_call_context(&mut self, callsite: &Rc<CSCallSite>) -> ContextId;

    /// The context identified by a call stack, innermost call site last.
    fn context_for(&mut self, call_stack: &[BaseCallSite]) -> ContextId;

    /// All contexts created so far, indexed by their id.
    fn contexts(&self) -> Vec<Rc<Context<Self::E>>>;
}

/// Analyses every function under the empty context.
#[derive(Debug, Default)]
pub struct ContextInsensitive {
    ctx_cache: ContextCache<BaseCallSite>,
}

impl ContextInsensitive {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextStrategy for ContextInsensitive {
    type E = BaseCallSite;

    fn get_context_id(&mut self, context: &Rc<Context<BaseCallSite>>) -> ContextId {
        self.ctx_cache.get_context_id(context)
    }

    fn get_context_by_id(&self, context_id: ContextId) -> Rc<Context<BaseCallSite>> {
        self.ctx_cache
            .get_context(context_id)
            .unwrap_or_else(Context::new_empty)
    }

    fn new_static_call_context(&mut self, _callsite: &Rc<CSCallSite>) -> ContextId {
        GLOBAL
    }

    fn context_for(&mut self, _call_stack: &[BaseCallSite]) -> ContextId {
        GLOBAL
    }

    fn contexts(&self) -> Vec<Rc<Context<BaseCallSite>>> {
        self.ctx_cache.contexts().map(|(_, ctx)| ctx.clone()).collect()
    }
}

/// k-limited call-site sensitivity: a context is the list of the `k` most
/// recent call sites, most recent first.
#[derive(Debug)]
pub struct KCallSiteSensitive {
    k: usize,
    ctx_cache: ContextCache<BaseCallSite>,
}

impl KCallSiteSensitive {
    pub fn new(k: usize) -> Self {
        KCallSiteSensitive {
            k,
            ctx_cache: ContextCache::new(),
        }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.k
    }
}

impl ContextStrategy for KCallSiteSensitive {
    type E = BaseCallSite;

    fn get_context_id(&mut self, context: &Rc<Context<BaseCallSite>>) -> ContextId {
        self.ctx_cache.get_context_id(context)
    }

    fn get_context_by_id(&self, context_id: ContextId) -> Rc<Context<BaseCallSite>> {
        self.ctx_cache
            .get_context(context_id)
            .unwrap_or_else(Context::new_empty)
    }

    fn new_static_call_context(&mut self, callsite: &Rc<CSCallSite>) -> ContextId {
        let caller_context = self.get_context_by_id(callsite.func.cid);
        let context = Context::new_k_limited_context(&caller_context, callsite.into(), self.k);
        self.get_context_id(&context)
    }

    fn context_for(&mut self, call_stack: &[BaseCallSite]) -> ContextId {
        let elems = call_stack.iter().rev().take(self.k).copied().collect();
        self.get_context_id(&Context::new(elems))
    }

    fn contexts(&self) -> Vec<Rc<Context<BaseCallSite>>> {
        self.ctx_cache.contexts().map(|(_, ctx)| ctx.clone()).collect()
    }
}
