// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! A context-sensitive, inter-procedural points-to analysis over a small
//! lowered program representation.
//!
//! The pipeline is `ir` (program model) -> `builder` (constraints and call
//! edges) -> `pta` (context instantiation and worklist solving), with the
//! results queried through `pta::results::PTAResults`.

#![allow(
    clippy::single_match,
    clippy::needless_lifetimes,
    clippy::needless_return,
    clippy::len_zero
)]

pub mod builder;
pub mod error;
pub mod graph;
pub mod ir;
pub mod pta;
pub mod pts_set;
pub mod util;

pub use error::{PtaError, PtaResult};
pub use pta::analyze_program;
