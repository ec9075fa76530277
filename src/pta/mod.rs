// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use log::*;
use serde::{Deserialize, Serialize};

use self::context_sensitive::{AndersenPTA, CallSiteSensitivePTA};
use self::context_strategy::{ContextInsensitive, KCallSiteSensitive};
use self::results::PTAResults;
use crate::builder::{call_graph_builder, constraint_builder};
use crate::builder::constraint_builder::ConstraintSet;
use crate::error::PtaResult;
use crate::graph::pag::*;
use crate::ir::analysis_context::AnalysisContext;
use crate::ir::call_site::CallEdge;
use crate::ir::program::Program;
use crate::pts_set::points_to::HybridPointsToSet;
use crate::pts_set::pt_data::DiffPTData;
use crate::util::options::AnalysisOptions;

pub mod context_sensitive;
pub mod context_strategy;
pub mod propagator;
pub mod results;

pub type NodeId = PAGNodeId;
pub type EdgeId = PAGEdgeId;
pub type PointsTo<T> = HybridPointsToSet<T>;
pub type DiffPTDataTy = DiffPTData<NodeId, NodeId, PointsTo<NodeId>>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PTAType {
    Andersen,
    #[default]
    CallSiteSensitive,
}

pub trait PointerAnalysis {
    fn analyze(&mut self) -> PtaResult<()>;

    fn results(&self) -> PTAResults;
}

/// Solves already built constraints and call edges with the analysis
/// selected by `acx.analysis_options.pta_type`.
pub fn solve(
    acx: &AnalysisContext,
    constraints: &ConstraintSet,
    call_edges: &[CallEdge],
) -> PtaResult<PTAResults> {
    let options = &acx.analysis_options;
    let mut pta: Box<dyn PointerAnalysis + '_> = match options.pta_type {
        PTAType::CallSiteSensitive => Box::new(CallSiteSensitivePTA::new(
            acx,
            constraints,
            call_edges,
            KCallSiteSensitive::new(options.context_depth as usize),
        )),
        PTAType::Andersen => Box::new(AndersenPTA::new(
            acx,
            constraints,
            call_edges,
            ContextInsensitive::new(),
        )),
    };
    pta.analyze()?;
    Ok(pta.results())
}

/// Runs the whole pipeline on a program: constraint building, call
/// resolution and solving.
pub fn analyze_program(program: &Program, options: AnalysisOptions) -> PtaResult<PTAResults> {
    info!("Analyzing program with {:?}", options.pta_type);
    let acx = AnalysisContext::new(program, options)?;
    let mut constraints = constraint_builder::build(&acx)?;
    let call_edges = call_graph_builder::resolve_constraints(&acx, &mut constraints)?;
    debug!("Resolved {} call edges", call_edges.len());
    solve(&acx, &constraints, &call_edges)
}
