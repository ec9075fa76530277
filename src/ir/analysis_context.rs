// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use log::*;

use crate::error::{PtaError, PtaResult};
use crate::ir::function::FuncId;
use crate::ir::path::{Path, PathEnum};
use crate::ir::program::{Program, VarId};
use crate::util::options::AnalysisOptions;

/// Global information of the analysis: the program under analysis and the options.
#[derive(Debug)]
pub struct AnalysisContext<'p> {
    pub program: &'p Program,

    /// Options of the analysis.
    pub analysis_options: AnalysisOptions,

    /// The function named by `AnalysisOptions::entry_func`, if any.
    pub entry_point: Option<FuncId>,
}

impl<'p> AnalysisContext<'p> {
    pub fn new(program: &'p Program, analysis_options: AnalysisOptions) -> PtaResult<Self> {
        let entry_point = match &analysis_options.entry_func {
            Some(name) => match program.function_by_name(name) {
                Some(func) => Some(func),
                None => {
                    return Err(PtaError::InvalidProgram(format!(
                        "entry function `{}` is not defined",
                        name
                    )))
                }
            },
            None => None,
        };
        debug!(
            "Analysis context: {} functions, {} variables, entry {:?}",
            program.num_functions(),
            program.num_variables(),
            entry_point
        );
        Ok(AnalysisContext {
            program,
            analysis_options,
            entry_point,
        })
    }

    #[inline]
    pub fn func_name(&self, func: FuncId) -> &str {
        &self.program.function(func).name
    }

    #[inline]
    pub fn var_name(&self, var: VarId) -> &str {
        &self.program.variable(var).name
    }

    #[inline]
    pub fn is_global(&self, var: VarId) -> bool {
        self.program.variable(var).is_global()
    }

    /// A readable name for a path, `f::x` for locals and `f::ret` for return slots.
    pub fn path_name(&self, path: &Path) -> String {
        match path.value() {
            PathEnum::Variable { var } => match self.program.variable(*var).scope.owner() {
                Some(owner) => format!("{}::{}", self.func_name(owner), self.var_name(*var)),
                None => self.var_name(*var).to_string(),
            },
            PathEnum::ReturnValue { func_id } => format!("{}::ret", self.func_name(*func_id)),
        }
    }
}
