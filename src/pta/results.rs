// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Read-only view of a finished analysis.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::ir::call_site::BaseCallSite;
use crate::ir::context::{ContextId, GLOBAL};
use crate::ir::function::FuncId;
use crate::ir::path::Path;
use crate::ir::program::{CallSiteId, Program, VarId};
use crate::util::bit_vec::Idx;

/// An abstract memory location, one per addressable variable.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Location {
    pub var: VarId,
}

impl Location {
    #[inline]
    pub fn new(var: VarId) -> Self {
        Location { var }
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loc({:?})", self.var)
    }
}

/// The size of one points-to set after one worklist step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TraceEntry {
    pub step: usize,
    pub path: Path,
    pub cid: ContextId,
    pub size: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PTAResults {
    pub(crate) pts: BTreeMap<(VarId, ContextId), BTreeSet<Location>>,
    pub(crate) globals: BTreeSet<VarId>,
    pub(crate) callee_contexts: BTreeMap<CallSiteId, BTreeSet<ContextId>>,
    pub(crate) func_contexts: BTreeMap<FuncId, BTreeSet<ContextId>>,
    /// Call strings indexed by context id, most recent call site first.
    pub(crate) contexts: Vec<Vec<BaseCallSite>>,
    pub(crate) iterations: usize,
    pub(crate) trace: Vec<TraceEntry>,
}

impl PTAResults {
    /// The locations `var` may point to under `cid`, or under any context
    /// when `cid` is `None`. Globals have a single, context-free set.
    pub fn points_to(&self, var: VarId, cid: Option<ContextId>) -> BTreeSet<Location> {
        let cid = if self.globals.contains(&var) {
            Some(GLOBAL)
        } else {
            cid
        };
        match cid {
            Some(cid) => self.pts.get(&(var, cid)).cloned().unwrap_or_default(),
            None => self
                .pts
                .range((var, GLOBAL)..=(var, ContextId::from_u32(u32::MAX)))
                .flat_map(|(_, locs)| locs.iter().copied())
                .collect(),
        }
    }

    /// Every (variable, context) pair with a non-empty points-to set.
    pub fn pointers(&self) -> impl Iterator<Item = (VarId, ContextId, &BTreeSet<Location>)> + '_ {
        self.pts.iter().map(|((var, cid), locs)| (*var, *cid, locs))
    }

    /// The contexts a call site induced on its callee.
    pub fn callee_contexts(&self, site: CallSiteId) -> BTreeSet<ContextId> {
        self.callee_contexts.get(&site).cloned().unwrap_or_default()
    }

    /// The contexts a function has been analysed under.
    pub fn contexts_of(&self, func: FuncId) -> BTreeSet<ContextId> {
        self.func_contexts.get(&func).cloned().unwrap_or_default()
    }

    /// The call string of a context, `None` for unknown ids.
    pub fn context_elements(&self, cid: ContextId) -> Option<&[BaseCallSite]> {
        self.contexts.get(cid.index()).map(|elems| elems.as_slice())
    }

    #[inline]
    pub fn num_contexts(&self) -> usize {
        self.contexts.len()
    }

    /// Number of worklist steps the solver took.
    #[inline]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Per-step set sizes, empty unless `record_trace` was set.
    #[inline]
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    pub fn location_name<'p>(&self, program: &'p Program, loc: Location) -> &'p str {
        &program.variable(loc.var).name
    }
}
