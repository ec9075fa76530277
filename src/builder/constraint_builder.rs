// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Translates the statements of each function into points-to constraints.

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

use log::*;

use crate::error::{PtaError, PtaResult};
use crate::graph::func_pag::{Constraint, FuncPAG};
use crate::ir::analysis_context::AnalysisContext;
use crate::ir::call_site::CallSite;
use crate::ir::function::FuncId;
use crate::ir::path::Path;
use crate::ir::program::{CallSiteId, Function, Statement, VarId, VarType, Variable};

/// The constraints of a whole program, one `FuncPAG` per accepted function.
#[derive(Debug, Default)]
pub struct ConstraintSet {
    pub(crate) func_pags: BTreeMap<FuncId, FuncPAG>,
    /// Functions skipped because of a malformed statement, with the reason.
    pub(crate) rejected: Vec<(FuncId, PtaError)>,
}

impl ConstraintSet {
    #[inline]
    pub fn func_pag(&self, func: FuncId) -> Option<&FuncPAG> {
        self.func_pags.get(&func)
    }

    pub fn func_pags(&self) -> impl Iterator<Item = &FuncPAG> + '_ {
        self.func_pags.values()
    }

    /// All constraints with the function they were emitted for.
    pub fn constraints(&self) -> impl Iterator<Item = (FuncId, &Constraint)> + '_ {
        self.func_pags
            .iter()
            .flat_map(|(func, fpag)| fpag.internal_edges_iter().map(move |c| (*func, c)))
    }

    pub fn num_constraints(&self) -> usize {
        self.func_pags.values().map(|fpag| fpag.internal_edges.len()).sum()
    }

    /// All direct call sites with the name of the called function.
    pub fn call_sites(&self) -> impl Iterator<Item = (&Rc<CallSite>, &str)> + '_ {
        self.func_pags
            .values()
            .flat_map(|fpag| fpag.static_dispatch_callsites())
    }

    pub fn rejected_functions(&self) -> impl Iterator<Item = (FuncId, &PtaError)> + '_ {
        self.rejected.iter().map(|(func, err)| (*func, err))
    }

    /// Drops the constraints of `func` and records why.
    pub(crate) fn reject(&mut self, func: FuncId, err: PtaError) {
        self.func_pags.remove(&func);
        self.rejected.push((func, err));
    }
}

/// Builds the constraints of every function in the program.
///
/// A malformed statement fails the whole build, unless
/// `isolate_malformed_functions` is set, in which case only the enclosing
/// function is dropped.
pub fn build(acx: &AnalysisContext) -> PtaResult<ConstraintSet> {
    let mut constraints = ConstraintSet::default();
    for (func_id, function) in acx.program.functions() {
        let mut fpag = FuncPAG::new(func_id);
        let result = FuncPAGBuilder::new(acx, func_id, function, &mut fpag).build();
        match result {
            Ok(()) => {
                constraints.func_pags.insert(func_id, fpag);
            }
            Err(err @ PtaError::MalformedStatement { .. })
                if acx.analysis_options.isolate_malformed_functions =>
            {
                warn!("Skipping function `{}`: {}", function.name, err);
                constraints.reject(func_id, err);
            }
            Err(err) => return Err(err),
        }
    }
    info!(
        "Built {} constraints for {} functions ({} rejected)",
        constraints.num_constraints(),
        constraints.func_pags.len(),
        constraints.rejected.len()
    );
    Ok(constraints)
}

pub struct FuncPAGBuilder<'a, 'p> {
    acx: &'a AnalysisContext<'p>,
    func_id: FuncId,
    function: &'p Function,
    /// Constraint graph for this function.
    fpag: &'a mut FuncPAG,
}

impl<'a, 'p> Debug for FuncPAGBuilder<'a, 'p> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        "FuncPAGBuilder".fmt(f)
    }
}

impl<'a, 'p> FuncPAGBuilder<'a, 'p> {
    pub fn new(
        acx: &'a AnalysisContext<'p>,
        func_id: FuncId,
        function: &'p Function,
        fpag: &'a mut FuncPAG,
    ) -> Self {
        debug!("Building FuncPAG for {:?}: {}", func_id, function.name);
        FuncPAGBuilder {
            acx,
            func_id,
            function,
            fpag,
        }
    }

    pub fn build(&mut self) -> PtaResult<()> {
        for (index, stmt) in self.function.body.iter().enumerate() {
            self.visit_statement(index, stmt)?;
        }
        Ok(())
    }

    fn visit_statement(&mut self, index: usize, stmt: &Statement) -> PtaResult<()> {
        match stmt {
            Statement::AddrOf { dst, src } => self.visit_addr_of(index, *dst, *src),
            Statement::Copy { dst, src } => self.visit_copy(index, *dst, *src),
            Statement::Load { dst, src } => self.visit_load(index, *dst, *src),
            Statement::Store { dst, src } => self.visit_store(index, *dst, *src),
            Statement::Call {
                site,
                callee,
                args,
                dst,
            } => self.visit_call(index, *site, callee, args, *dst),
            Statement::Return { value } => self.visit_return(index, *value),
        }
    }

    /// `dst = &src`
    fn visit_addr_of(&mut self, index: usize, dst: VarId, src: VarId) -> PtaResult<()> {
        let dst_ty = self.operand(index, dst)?.ty;
        let src_ty = self.operand(index, src)?.ty;
        if dst_ty != src_ty.address_of() {
            return Err(self.mismatch(index, "address-of", dst, src));
        }
        self.add_internal_edge(Constraint::Address {
            dst: Path::new_variable(dst),
            src: Path::new_variable(src),
        });
        Ok(())
    }

    /// `dst = src`
    fn visit_copy(&mut self, index: usize, dst: VarId, src: VarId) -> PtaResult<()> {
        let dst_ty = self.operand(index, dst)?.ty;
        let src_ty = self.operand(index, src)?.ty;
        if dst_ty != src_ty {
            return Err(self.mismatch(index, "copy", dst, src));
        }
        self.add_internal_edge(Constraint::Copy {
            dst: Path::new_variable(dst),
            src: Path::new_variable(src),
        });
        Ok(())
    }

    /// `dst = *src`
    fn visit_load(&mut self, index: usize, dst: VarId, src: VarId) -> PtaResult<()> {
        let dst_ty = self.operand(index, dst)?.ty;
        let src_ty = self.operand(index, src)?.ty;
        if src_ty.deref() != Some(dst_ty) {
            return Err(self.mismatch(index, "load", dst, src));
        }
        self.add_internal_edge(Constraint::Load {
            dst: Path::new_variable(dst),
            src: Path::new_variable(src),
        });
        Ok(())
    }

    /// `*dst = src`
    fn visit_store(&mut self, index: usize, dst: VarId, src: VarId) -> PtaResult<()> {
        let dst_ty = self.operand(index, dst)?.ty;
        let src_ty = self.operand(index, src)?.ty;
        if dst_ty.deref() != Some(src_ty) {
            return Err(self.mismatch(index, "store", dst, src));
        }
        self.add_internal_edge(Constraint::Store {
            dst: Path::new_variable(dst),
            src: Path::new_variable(src),
        });
        Ok(())
    }

    /// Records the call site. Bindings are created once the callee is resolved.
    fn visit_call(
        &mut self,
        index: usize,
        site: CallSiteId,
        callee: &str,
        args: &[VarId],
        dst: Option<VarId>,
    ) -> PtaResult<()> {
        for arg in args.iter().chain(dst.iter()) {
            self.operand(index, *arg)?;
        }
        let args = args.iter().map(|arg| Path::new_variable(*arg)).collect();
        let destination = dst.map(Path::new_variable);
        let callsite = Rc::new(CallSite::new(self.func_id, site, index, args, destination));
        self.fpag.add_static_dispatch_callsite(callsite, callee);
        Ok(())
    }

    /// `return value` copies into the return slot of the function.
    fn visit_return(&mut self, index: usize, value: VarId) -> PtaResult<()> {
        let value_ty = self.operand(index, value)?.ty;
        match self.function.ret_ty {
            Some(ret_ty) if ret_ty == value_ty => {
                self.add_internal_edge(Constraint::Copy {
                    dst: Path::new_return_value(self.func_id),
                    src: Path::new_variable(value),
                });
                Ok(())
            }
            Some(ret_ty) => Err(self.malformed(
                index,
                format!(
                    "returns `{}` of type {} from a function returning {}",
                    self.acx.var_name(value),
                    value_ty,
                    ret_ty
                ),
            )),
            None => Err(self.malformed(
                index,
                format!("returns `{}` from a function without a return type", self.acx.var_name(value)),
            )),
        }
    }

    fn add_internal_edge(&mut self, constraint: Constraint) {
        trace!("{}: {:?}", self.function.name, constraint);
        self.fpag.add_internal_edge(constraint);
    }

    /// Returns the variable if the function can reference it.
    fn operand(&self, index: usize, var: VarId) -> PtaResult<&'p Variable> {
        let variable = self.acx.program.variable(var);
        match variable.scope.owner() {
            Some(owner) if owner != self.func_id => Err(self.malformed(
                index,
                format!(
                    "`{}` belongs to `{}` and is not visible here",
                    variable.name,
                    self.acx.func_name(owner)
                ),
            )),
            _ => Ok(variable),
        }
    }

    fn mismatch(&self, index: usize, kind: &str, dst: VarId, src: VarId) -> PtaError {
        let ty = |var: VarId| -> VarType { self.acx.program.variable(var).ty };
        self.malformed(
            index,
            format!(
                "{} from `{}` ({}) into `{}` ({}) has incompatible operand types",
                kind,
                self.acx.var_name(src),
                ty(src),
                self.acx.var_name(dst),
                ty(dst)
            ),
        )
    }

    fn malformed(&self, index: usize, reason: String) -> PtaError {
        PtaError::malformed(&self.function.name, index, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::ProgramBuilder;
    use crate::ir::program::Program;
    use crate::util::options::AnalysisOptions;

    fn build_with(program: &Program, isolate: bool) -> PtaResult<ConstraintSet> {
        let options = AnalysisOptions {
            isolate_malformed_functions: isolate,
            ..AnalysisOptions::default()
        };
        let acx = AnalysisContext::new(program, options)?;
        build(&acx)
    }

    #[test]
    fn emits_one_constraint_per_statement() {
        let mut pb = ProgramBuilder::new();
        let a = pb.global("a", VarType::Scalar);
        let p = pb.global("p", VarType::POINTER);
        let q = pb.global("q", VarType::POINTER);
        let pp = pb.global("pp", VarType::POINTER_TO_POINTER);
        let x = pb.global("x", VarType::Scalar);
        pb.function("f")
            .addr_of(p, a)
            .copy(q, p)
            .addr_of(pp, p)
            .load(q, pp)
            .store(pp, q)
            .load(x, p);
        let program = pb.build().unwrap();
        let constraints = build_with(&program, false).unwrap();
        let kinds: Vec<_> = constraints.constraints().map(|(_, c)| *c).collect();
        assert_eq!(kinds.len(), 6);
        assert_eq!(
            kinds[2],
            Constraint::Address {
                dst: Path::new_variable(pp),
                src: Path::new_variable(p)
            }
        );
        assert!(matches!(kinds[4], Constraint::Store { .. }));
    }

    #[test]
    fn return_becomes_copy_into_return_slot() {
        let mut pb = ProgramBuilder::new();
        let f = {
            let mut fb = pb.function("f");
            let r = fb.local("r", VarType::POINTER);
            fb.returns(VarType::POINTER).ret(r);
            fb.id()
        };
        let program = pb.build().unwrap();
        let constraints = build_with(&program, false).unwrap();
        let (_, constraint) = constraints.constraints().next().unwrap();
        assert!(matches!(
            constraint,
            Constraint::Copy { dst, .. } if *dst == Path::new_return_value(f)
        ));
    }

    #[test]
    fn address_of_with_wrong_shape_is_malformed() {
        let mut pb = ProgramBuilder::new();
        let a = pb.global("a", VarType::Scalar);
        let pp = pb.global("pp", VarType::POINTER_TO_POINTER);
        pb.function("g").addr_of(pp, a);
        let program = pb.build().unwrap();
        match build_with(&program, false) {
            Err(PtaError::MalformedStatement { function, index, reason }) => {
                assert_eq!(function, "g");
                assert_eq!(index, 0);
                assert!(reason.contains("`a`"), "{}", reason);
            }
            other => panic!("unexpected result: {:?}", other.map(|c| c.num_constraints())),
        }
    }

    #[test]
    fn foreign_locals_are_not_visible() {
        let mut pb = ProgramBuilder::new();
        let secret = pb.function("owner").local("secret", VarType::POINTER);
        let g = pb.global("g", VarType::POINTER);
        pb.function("thief").copy(g, secret);
        let program = pb.build().unwrap();
        let err = build_with(&program, false).unwrap_err();
        assert!(err.to_string().contains("not visible"), "{}", err);
    }

    #[test]
    fn isolation_rejects_only_the_bad_function() {
        let mut pb = ProgramBuilder::new();
        let a = pb.global("a", VarType::Scalar);
        let p = pb.global("p", VarType::POINTER);
        pb.function("bad").load(p, a);
        pb.function("good").addr_of(p, a);
        let program = pb.build().unwrap();
        let constraints = build_with(&program, true).unwrap();
        assert_eq!(constraints.func_pags().count(), 1);
        let rejected: Vec<_> = constraints.rejected_functions().collect();
        assert_eq!(rejected.len(), 1);
        assert_eq!(program.function(rejected[0].0).name, "bad");
    }

    #[test]
    fn calls_are_recorded_with_callee_name() {
        let mut pb = ProgramBuilder::new();
        let p = pb.global("p", VarType::POINTER);
        let site = pb.function("caller").call("callee", &[p], None);
        let program = pb.build().unwrap();
        let constraints = build_with(&program, false).unwrap();
        let (callsite, callee) = constraints.call_sites().next().unwrap();
        assert_eq!(callee, "callee");
        assert_eq!(callsite.site, site);
        assert_eq!(callsite.args, vec![Path::new_variable(p)]);
        assert_eq!(constraints.num_constraints(), 0);
    }
}
