// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! This module provides essential functions for resolving call targets.

use std::rc::Rc;

use log::*;

use crate::builder::constraint_builder::ConstraintSet;
use crate::error::{PtaError, PtaResult};
use crate::ir::analysis_context::AnalysisContext;
use crate::ir::call_site::{CallEdge, CallSite};
use crate::ir::function::FuncId;
use crate::ir::path::Path;
use crate::ir::program::Program;

/// Maps a call site to the functions it may invoke.
pub trait CallResolver {
    fn resolve_callees(
        &self,
        program: &Program,
        callsite: &CallSite,
        callee: &str,
    ) -> PtaResult<Vec<FuncId>>;
}

/// Resolves direct calls by looking the callee name up in the program.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticCallResolver;

impl CallResolver for StaticCallResolver {
    fn resolve_callees(
        &self,
        program: &Program,
        callsite: &CallSite,
        callee: &str,
    ) -> PtaResult<Vec<FuncId>> {
        match program.function_by_name(callee) {
            Some(func) => Ok(vec![func]),
            None => Err(PtaError::UnresolvedCallee {
                callee: callee.to_string(),
                caller: program.function(callsite.func).name.clone(),
                index: callsite.location,
            }),
        }
    }
}

/// Resolves every call site with the `StaticCallResolver`.
pub fn resolve<'a>(
    program: &Program,
    callsites: impl IntoIterator<Item = (&'a Rc<CallSite>, &'a str)>,
) -> PtaResult<Vec<CallEdge>> {
    resolve_with(&StaticCallResolver, program, callsites)
}

/// Resolves the call sites of every function in `constraints`.
///
/// When `isolate_malformed_functions` is set, a caller with a call that
/// cannot be bound is rejected together with its call edges, the same way
/// as a function with a malformed statement.
pub fn resolve_constraints(
    acx: &AnalysisContext,
    constraints: &mut ConstraintSet,
) -> PtaResult<Vec<CallEdge>> {
    let mut call_edges = Vec::new();
    let mut rejected = Vec::new();
    for fpag in constraints.func_pags() {
        match resolve(acx.program, fpag.static_dispatch_callsites()) {
            Ok(edges) => call_edges.extend(edges),
            Err(err @ PtaError::MalformedStatement { .. })
                if acx.analysis_options.isolate_malformed_functions =>
            {
                warn!("Skipping function `{}`: {}", acx.func_name(fpag.func_id()), err);
                rejected.push((fpag.func_id(), err));
            }
            Err(err) => return Err(err),
        }
    }
    for (func, err) in rejected {
        constraints.reject(func, err);
    }
    Ok(call_edges)
}

/// Resolves every call site with `resolver` and builds the argument and
/// return bindings of each resulting call edge.
pub fn resolve_with<'a, R: CallResolver + ?Sized>(
    resolver: &R,
    program: &Program,
    callsites: impl IntoIterator<Item = (&'a Rc<CallSite>, &'a str)>,
) -> PtaResult<Vec<CallEdge>> {
    let mut call_edges = Vec::new();
    for (callsite, callee_name) in callsites {
        for callee in resolver.resolve_callees(program, callsite, callee_name)? {
            let call_edge = bind_call(program, callsite, callee)?;
            debug!(
                "Resolved {:?} in `{}` to `{}`",
                callsite.site,
                program.function(callsite.func).name,
                program.function(callee).name
            );
            call_edges.push(call_edge);
        }
    }
    Ok(call_edges)
}

/// Pairs actuals with formals, and the callee's return slot with the call's result.
fn bind_call(program: &Program, callsite: &Rc<CallSite>, callee: FuncId) -> PtaResult<CallEdge> {
    let caller = &program.function(callsite.func).name;
    let function = program.function(callee);
    let malformed = |reason: String| PtaError::malformed(caller, callsite.location, reason);

    if function.params.len() != callsite.args.len() {
        return Err(malformed(format!(
            "`{}` takes {} arguments but {} were supplied",
            function.name,
            function.params.len(),
            callsite.args.len()
        )));
    }

    let ty_of = |path: &Path| path.as_variable().map(|var| program.variable(var).ty);
    let mut arg_bindings = Vec::with_capacity(function.params.len());
    for (ordinal, (arg, param)) in callsite.args.iter().zip(function.params.iter()).enumerate() {
        let formal = Path::new_variable(*param);
        let (arg_ty, param_ty) = (ty_of(arg), ty_of(&formal));
        if arg_ty != param_ty {
            return Err(malformed(format!(
                "argument #{} of `{}` has type {:?} but the parameter expects {:?}",
                ordinal, function.name, arg_ty, param_ty
            )));
        }
        arg_bindings.push((*arg, formal));
    }

    let ret_binding = match (&callsite.destination, function.ret_ty) {
        (None, _) => None,
        (Some(dst), Some(ret_ty)) if ty_of(dst) == Some(ret_ty) => {
            Some((Path::new_return_value(callee), *dst))
        }
        (Some(_), Some(ret_ty)) => {
            return Err(malformed(format!(
                "the result of `{}` ({}) does not fit the destination",
                function.name, ret_ty
            )))
        }
        (Some(_), None) => {
            return Err(malformed(format!("`{}` does not return a value", function.name)));
        }
    };

    Ok(CallEdge {
        callsite: callsite.clone(),
        callee,
        arg_bindings,
        ret_binding,
    })
}
