// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The lowered program the analysis consumes.
//!
//! A `Program` is a flat table of variables and functions. Each function
//! owns a statement list made of the four pointer assignment forms, direct
//! calls and returns. Programs are produced by `ProgramBuilder` or decoded
//! from JSON, and are never mutated by the analysis.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PtaError, PtaResult};
use crate::ir::function::FuncId;
use crate::util::bit_vec::Idx;

crate::newtype_index! {
    /// The unique identifier of a variable.
    pub struct VarId { debug_format = "v{}" }
}

crate::newtype_index! {
    /// The program-wide lexical id of a call statement.
    pub struct CallSiteId { debug_format = "cs{}" }
}

/// The declared shape of a variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarType {
    Scalar,
    /// A pointer with the given number of indirections, `Pointer(2)` being `int **`.
    Pointer(u8),
}

impl VarType {
    pub const POINTER: VarType = VarType::Pointer(1);
    pub const POINTER_TO_POINTER: VarType = VarType::Pointer(2);

    #[inline]
    pub fn indirection(self) -> u8 {
        match self {
            VarType::Scalar => 0,
            VarType::Pointer(depth) => depth,
        }
    }

    /// The type obtained by dereferencing a value of this type.
    pub fn deref(self) -> Option<VarType> {
        match self.indirection() {
            0 => None,
            1 => Some(VarType::Scalar),
            depth => Some(VarType::Pointer(depth - 1)),
        }
    }

    /// The type of `&x` for an `x` of this type.
    pub fn address_of(self) -> VarType {
        VarType::Pointer(self.indirection().saturating_add(1))
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "int{}", "*".repeat(self.indirection() as usize))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Global,
    Local(FuncId),
    /// A formal parameter and its position.
    Parameter(FuncId, usize),
}

impl Scope {
    /// The function owning the variable, `None` for globals.
    pub fn owner(self) -> Option<FuncId> {
        match self {
            Scope::Global => None,
            Scope::Local(func) | Scope::Parameter(func, _) => Some(func),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub ty: VarType,
    pub scope: Scope,
}

impl Variable {
    #[inline]
    pub fn is_global(&self) -> bool {
        self.scope == Scope::Global
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    /// `dst = &src`
    AddrOf { dst: VarId, src: VarId },
    /// `dst = src`
    Copy { dst: VarId, src: VarId },
    /// `dst = *src`
    Load { dst: VarId, src: VarId },
    /// `*dst = src`
    Store { dst: VarId, src: VarId },
    /// `dst = callee(args)`
    Call {
        site: CallSiteId,
        callee: String,
        args: Vec<VarId>,
        #[serde(default)]
        dst: Option<VarId>,
    },
    /// `return value`
    Return { value: VarId },
}

impl Statement {
    /// Variables referenced by the statement, in operand order.
    pub fn operands(&self) -> Vec<VarId> {
        match self {
            Statement::AddrOf { dst, src }
            | Statement::Copy { dst, src }
            | Statement::Load { dst, src }
            | Statement::Store { dst, src } => vec![*dst, *src],
            Statement::Call { args, dst, .. } => args.iter().copied().chain(*dst).collect(),
            Statement::Return { value } => vec![*value],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<VarId>,
    #[serde(default)]
    pub locals: Vec<VarId>,
    #[serde(default)]
    pub ret_ty: Option<VarType>,
    pub body: Vec<Statement>,
}

/// A statement together with the function it belongs to and its index there.
#[derive(Clone, Copy, Debug)]
pub struct StatementRef<'p> {
    pub func: FuncId,
    pub index: usize,
    pub stmt: &'p Statement,
}

impl<'p> StatementRef<'p> {
    /// The lexical call-site id when the statement is a call.
    pub fn call_site(&self) -> Option<CallSiteId> {
        match self.stmt {
            Statement::Call { site, .. } => Some(*site),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub(crate) variables: Vec<Variable>,
    pub(crate) functions: Vec<Function>,
    #[serde(skip)]
    pub(crate) function_table: HashMap<String, FuncId>,
}

impl Program {
    /// Decodes a program from JSON and checks that it is well formed.
    pub fn from_json(json: &str) -> PtaResult<Program> {
        let mut program: Program = serde_json::from_str(json)?;
        program.rebuild_function_table()?;
        program.validate()?;
        Ok(program)
    }

    pub fn to_json(&self) -> PtaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[inline]
    pub fn variable(&self, var: VarId) -> &Variable {
        &self.variables[var.index()]
    }

    pub fn variables(&self) -> impl Iterator<Item = (VarId, &Variable)> {
        self.variables
            .iter()
            .enumerate()
            .map(|(i, v)| (VarId::new(i), v))
    }

    #[inline]
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Looks a variable up by name. Locals are searched in `func` first, then globals.
    pub fn variable_by_name(&self, func: Option<FuncId>, name: &str) -> Option<VarId> {
        let scoped = func.and_then(|f| {
            self.variables()
                .find(|(_, v)| v.name == name && v.scope.owner() == Some(f))
        });
        scoped
            .or_else(|| self.variables().find(|(_, v)| v.name == name && v.is_global()))
            .map(|(id, _)| id)
    }

    pub fn globals(&self) -> impl Iterator<Item = VarId> + '_ {
        self.variables()
            .filter(|(_, v)| v.is_global())
            .map(|(id, _)| id)
    }

    #[inline]
    pub fn function(&self, func: FuncId) -> &Function {
        &self.functions[func.index()]
    }

    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, f)| (FuncId::new(i), f))
    }

    #[inline]
    pub fn num_functions(&self) -> usize {
        self.functions.len()
    }

    #[inline]
    pub fn function_by_name(&self, name: &str) -> Option<FuncId> {
        self.function_table.get(name).copied()
    }

    /// All statements of the program, function by function.
    pub fn statements(&self) -> impl Iterator<Item = StatementRef<'_>> {
        self.functions().flat_map(|(func, function)| {
            function
                .body
                .iter()
                .enumerate()
                .map(move |(index, stmt)| StatementRef { func, index, stmt })
        })
    }

    pub fn call_sites(&self) -> impl Iterator<Item = StatementRef<'_>> {
        self.statements().filter(|s| s.call_site().is_some())
    }

    pub(crate) fn rebuild_function_table(&mut self) -> PtaResult<()> {
        self.function_table.clear();
        for (i, function) in self.functions.iter().enumerate() {
            if self
                .function_table
                .insert(function.name.clone(), FuncId::new(i))
                .is_some()
            {
                return Err(PtaError::InvalidProgram(format!(
                    "function `{}` is defined more than once",
                    function.name
                )));
            }
        }
        Ok(())
    }

    /// Checks that every id refers to an existing entity and that variable
    /// scopes agree with the functions that declare them.
    pub(crate) fn validate(&self) -> PtaResult<()> {
        let invalid = |msg: String| Err(PtaError::InvalidProgram(msg));
        for (id, var) in self.variables() {
            if let Some(owner) = var.scope.owner() {
                if owner.index() >= self.functions.len() {
                    return invalid(format!(
                        "variable `{}` ({:?}) belongs to unknown {:?}",
                        var.name, id, owner
                    ));
                }
            }
        }
        let mut sites = HashSet::new();
        for (func, function) in self.functions() {
            let declared = function.params.iter().chain(function.locals.iter());
            for var in declared {
                if var.index() >= self.variables.len() {
                    return invalid(format!(
                        "function `{}` declares unknown {:?}",
                        function.name, var
                    ));
                }
            }
            for (ordinal, param) in function.params.iter().enumerate() {
                if self.variable(*param).scope != Scope::Parameter(func, ordinal) {
                    return invalid(format!(
                        "parameter #{} of `{}` is not scoped as that parameter",
                        ordinal, function.name
                    ));
                }
            }
            for local in &function.locals {
                if self.variable(*local).scope != Scope::Local(func) {
                    return invalid(format!(
                        "local `{}` of `{}` is not scoped to it",
                        self.variable(*local).name,
                        function.name
                    ));
                }
            }
            for (index, stmt) in function.body.iter().enumerate() {
                let dangling = stmt
                    .operands()
                    .into_iter()
                    .find(|v| v.index() >= self.variables.len());
                if let Some(var) = dangling {
                    return invalid(format!(
                        "statement #{} of `{}` references unknown {:?}",
                        index, function.name, var
                    ));
                }
                if let Statement::Call { site, .. } = stmt {
                    if !sites.insert(*site) {
                        return invalid(format!("call site {:?} appears more than once", site));
                    }
                }
            }
        }
        Ok(())
    }
}
