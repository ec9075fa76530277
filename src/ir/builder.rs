// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::PtaResult;
use crate::ir::function::FuncId;
use crate::ir::program::*;
use crate::util::bit_vec::Idx;

/// Builds a `Program` in memory.
///
/// ```
/// use cspta::ir::builder::ProgramBuilder;
/// use cspta::ir::program::VarType;
///
/// let mut pb = ProgramBuilder::new();
/// let a = pb.global("a", VarType::Scalar);
/// let q = pb.global("q", VarType::POINTER);
/// pb.function("setup").addr_of(q, a);
/// let program = pb.build().unwrap();
/// assert_eq!(program.num_functions(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
    next_call_site: u32,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&mut self, name: &str, ty: VarType) -> VarId {
        self.new_variable(name, ty, Scope::Global)
    }

    /// Starts a new function. Statements are appended through the returned builder.
    pub fn function(&mut self, name: &str) -> FunctionBuilder<'_> {
        let func = FuncId::new(self.program.functions.len());
        self.program.functions.push(Function {
            name: name.to_string(),
            params: Vec::new(),
            locals: Vec::new(),
            ret_ty: None,
            body: Vec::new(),
        });
        FunctionBuilder { builder: self, func }
    }

    /// Finishes the program. Fails if two functions share a name or a
    /// statement references a variable that was never declared.
    pub fn build(mut self) -> PtaResult<Program> {
        self.program.rebuild_function_table()?;
        self.program.validate()?;
        Ok(self.program)
    }

    fn new_variable(&mut self, name: &str, ty: VarType, scope: Scope) -> VarId {
        let id = VarId::new(self.program.variables.len());
        self.program.variables.push(Variable {
            name: name.to_string(),
            ty,
            scope,
        });
        id
    }
}

pub struct FunctionBuilder<'b> {
    builder: &'b mut ProgramBuilder,
    func: FuncId,
}

impl<'b> FunctionBuilder<'b> {
    #[inline]
    pub fn id(&self) -> FuncId {
        self.func
    }

    pub fn param(&mut self, name: &str, ty: VarType) -> VarId {
        let ordinal = self.function().params.len();
        let var = self
            .builder
            .new_variable(name, ty, Scope::Parameter(self.func, ordinal));
        self.function().params.push(var);
        var
    }

    pub fn local(&mut self, name: &str, ty: VarType) -> VarId {
        let var = self.builder.new_variable(name, ty, Scope::Local(self.func));
        self.function().locals.push(var);
        var
    }

    pub fn returns(&mut self, ty: VarType) -> &mut Self {
        self.function().ret_ty = Some(ty);
        self
    }

    pub fn addr_of(&mut self, dst: VarId, src: VarId) -> &mut Self {
        self.push(Statement::AddrOf { dst, src })
    }

    pub fn copy(&mut self, dst: VarId, src: VarId) -> &mut Self {
        self.push(Statement::Copy { dst, src })
    }

    pub fn load(&mut self, dst: VarId, src: VarId) -> &mut Self {
        self.push(Statement::Load { dst, src })
    }

    pub fn store(&mut self, dst: VarId, src: VarId) -> &mut Self {
        self.push(Statement::Store { dst, src })
    }

    pub fn ret(&mut self, value: VarId) -> &mut Self {
        self.push(Statement::Return { value })
    }

    /// Appends a direct call and returns its freshly allocated call-site id.
    pub fn call(&mut self, callee: &str, args: &[VarId], dst: Option<VarId>) -> CallSiteId {
        let site = CallSiteId::from_u32(self.builder.next_call_site);
        self.builder.next_call_site += 1;
        self.push(Statement::Call {
            site,
            callee: callee.to_string(),
            args: args.to_vec(),
            dst,
        });
        site
    }

    fn push(&mut self, stmt: Statement) -> &mut Self {
        self.function().body.push(stmt);
        self
    }

    fn function(&mut self) -> &mut Function {
        &mut self.builder.program.functions[self.func.index()]
    }
}
