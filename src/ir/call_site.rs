// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::rc::Rc;

use crate::ir::function::{CSFuncId, FuncId};
use crate::ir::path::{CSPath, Path};
use crate::ir::program::CallSiteId;

pub type BaseCallSite = BaseCallSiteS<FuncId>;
pub type CSBaseCallSite = BaseCallSiteS<CSFuncId>;
pub type CallSite = CallSiteS<FuncId, Path>;
pub type CSCallSite = CallSiteS<CSFuncId, CSPath>;

/// A call site identified by its enclosing function and its program-wide id.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct BaseCallSiteS<F> {
    pub func: F,
    pub site: CallSiteId,
}

impl<F> BaseCallSiteS<F> {
    pub fn new(func: F, site: CallSiteId) -> Self {
        BaseCallSiteS { func, site }
    }
}

/// A call statement with its actual arguments and optional result variable.
/// `location` is the statement index inside the caller.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct CallSiteS<F, P> {
    pub func: F,
    pub site: CallSiteId,
    pub location: usize,
    pub args: Vec<P>,
    pub destination: Option<P>,
}

impl<F, P> CallSiteS<F, P> {
    pub fn new(func: F, site: CallSiteId, location: usize, args: Vec<P>, destination: Option<P>) -> Self {
        CallSiteS {
            func,
            site,
            location,
            args,
            destination,
        }
    }
}

impl<F: Copy + Into<FuncId>, P> From<&Rc<CallSiteS<F, P>>> for BaseCallSite {
    fn from(callsite: &Rc<CallSiteS<F, P>>) -> Self {
        BaseCallSiteS {
            func: callsite.func.into(),
            site: callsite.site,
        }
    }
}

impl From<CSBaseCallSite> for BaseCallSite {
    fn from(callsite: CSBaseCallSite) -> Self {
        BaseCallSiteS {
            func: callsite.func.into(),
            site: callsite.site,
        }
    }
}

impl From<&Rc<CSCallSite>> for CSBaseCallSite {
    fn from(callsite: &Rc<CSCallSite>) -> Self {
        BaseCallSiteS {
            func: callsite.func,
            site: callsite.site,
        }
    }
}

/// A resolved call: the call site, its callee and the implicit copies it induces.
///
/// Bindings are stored context-free. The solver instantiates them once per
/// (caller context, callee context) pair, so two call sites reaching the same
/// callee each contribute their own copies into the formal parameters.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CallEdge {
    pub callsite: Rc<CallSite>,
    pub callee: FuncId,
    /// `(actual, formal)` pairs in parameter order.
    pub arg_bindings: Vec<(Path, Path)>,
    /// `(callee return slot, result variable)` if the call binds a result.
    pub ret_binding: Option<(Path, Path)>,
}

impl CallEdge {
    #[inline]
    pub fn caller(&self) -> FuncId {
        self.callsite.func
    }

    #[inline]
    pub fn site(&self) -> CallSiteId {
        self.callsite.site
    }
}
