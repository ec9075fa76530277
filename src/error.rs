// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt::Debug;

use thiserror::Error;

pub type PtaResult<T> = Result<T, PtaError>;

#[derive(Debug, Error)]
pub enum PtaError {
    /// A statement whose operands do not fit its constraint kind. `index` is
    /// the position of the statement in `function`.
    #[error("malformed statement #{index} in `{function}`: {reason}")]
    MalformedStatement {
        function: String,
        index: usize,
        reason: String,
    },

    #[error("unresolved callee `{callee}` called by statement #{index} in `{caller}`")]
    UnresolvedCallee {
        callee: String,
        caller: String,
        index: usize,
    },

    /// The solver broke one of its own guarantees. Never caused by the input.
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),

    #[error("invalid program: {0}")]
    InvalidProgram(String),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PtaError {
    pub(crate) fn malformed(function: &str, index: usize, reason: String) -> Self {
        PtaError::MalformedStatement {
            function: function.to_string(),
            index,
            reason,
        }
    }

    pub(crate) fn non_monotone(node: impl Debug, before: usize, after: usize) -> Self {
        PtaError::InternalInvariantViolation(format!(
            "points-to set of {:?} shrank from {} to {} elements",
            node, before, after
        ))
    }
}
