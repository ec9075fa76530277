// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt::{Debug, Formatter, Result};

use crate::ir::context::ContextId;
use crate::ir::function::FuncId;
use crate::ir::program::VarId;

/// A value slot the analysis tracks: a declared variable or the return slot of a function.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    pub value: PathEnum,
}

impl Debug for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.value.fmt(f)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathEnum {
    /// A global, local or parameter variable.
    Variable { var: VarId },

    /// The value returned by `return v` statements of a function.
    ReturnValue { func_id: FuncId },
}

impl Debug for PathEnum {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            PathEnum::Variable { var } => var.fmt(f),
            PathEnum::ReturnValue { func_id } => write!(f, "{:?}::ret", func_id),
        }
    }
}

impl Path {
    pub fn new_variable(var: VarId) -> Path {
        Path {
            value: PathEnum::Variable { var },
        }
    }

    pub fn new_return_value(func_id: FuncId) -> Path {
        Path {
            value: PathEnum::ReturnValue { func_id },
        }
    }

    #[inline]
    pub fn value(&self) -> &PathEnum {
        &self.value
    }

    /// The variable this path denotes, if any.
    pub fn as_variable(&self) -> Option<VarId> {
        match self.value {
            PathEnum::Variable { var } => Some(var),
            PathEnum::ReturnValue { .. } => None,
        }
    }
}

/// A path augmented with a context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CSPath {
    pub cid: ContextId,
    pub path: Path,
}

impl CSPath {
    pub fn new_cs_path(cid: ContextId, path: Path) -> CSPath {
        CSPath { cid, path }
    }
}
