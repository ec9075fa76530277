// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::rc::Rc;

use super::pag::PAGEdgeEnum;
use crate::ir::call_site::CallSite;
use crate::ir::function::FuncId;
use crate::ir::path::Path;
use crate::util::chunked_queue::ChunkedQueue;

/// A points-to constraint over context-free paths.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// `dst = &src`
    Address { dst: Path, src: Path },
    /// `dst = src`
    Copy { dst: Path, src: Path },
    /// `dst = *src`
    Load { dst: Path, src: Path },
    /// `*dst = src`
    Store { dst: Path, src: Path },
}

impl Constraint {
    /// The PAG edge encoding of the constraint as `(src, dst, kind)`.
    ///
    /// Edges always run in the direction points-to facts flow, so a store
    /// `*p = q` becomes a store edge `q -> p`.
    pub fn as_edge(&self) -> (Path, Path, PAGEdgeEnum) {
        match *self {
            Constraint::Address { dst, src } => (src, dst, PAGEdgeEnum::AddrPAGEdge),
            Constraint::Copy { dst, src } => (src, dst, PAGEdgeEnum::DirectPAGEdge),
            Constraint::Load { dst, src } => (src, dst, PAGEdgeEnum::LoadPAGEdge),
            Constraint::Store { dst, src } => (src, dst, PAGEdgeEnum::StorePAGEdge),
        }
    }
}

/// The constraints of a single function, kept context-free so that they can
/// be instantiated under every context the function is reached in.
#[derive(Debug)]
pub struct FuncPAG {
    pub(crate) func_id: FuncId,
    pub(crate) internal_edges: ChunkedQueue<Constraint>,

    // Direct calls paired with the name of the called function. Names are
    // resolved to `CallEdge`s by the call graph builder.
    pub(crate) static_dispatch_callsites: Vec<(Rc<CallSite>, Rc<str>)>,
}

impl FuncPAG {
    pub fn new(func_id: FuncId) -> Self {
        FuncPAG {
            func_id,
            internal_edges: ChunkedQueue::new(),
            static_dispatch_callsites: Vec::new(),
        }
    }

    #[inline]
    pub fn func_id(&self) -> FuncId {
        self.func_id
    }

    pub fn add_internal_edge(&mut self, constraint: Constraint) {
        self.internal_edges.push(constraint);
    }

    pub fn internal_edges_iter(&self) -> impl Iterator<Item = &Constraint> + '_ {
        self.internal_edges.iter()
    }

    pub fn add_static_dispatch_callsite(&mut self, callsite: Rc<CallSite>, callee: &str) {
        self.static_dispatch_callsites.push((callsite, Rc::from(callee)));
    }

    pub fn static_dispatch_callsites(&self) -> impl Iterator<Item = (&Rc<CallSite>, &str)> + '_ {
        self.static_dispatch_callsites
            .iter()
            .map(|(callsite, callee)| (callsite, callee.as_ref()))
    }
}
