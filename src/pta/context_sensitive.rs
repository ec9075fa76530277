// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;
use std::time::Instant;

use itertools::Itertools;
use log::*;

use super::context_strategy::ContextStrategy;
use super::propagator::propagator::{Propagator, SolverMonitor};
use super::results::{Location, PTAResults};
use super::PointerAnalysis;
use crate::builder::constraint_builder::ConstraintSet;
use crate::error::PtaResult;
use crate::graph::call_graph::CSCallGraph;
use crate::graph::pag::*;
use crate::ir::analysis_context::AnalysisContext;
use crate::ir::call_site::{BaseCallSite, CSCallSite, CallEdge, CallSite};
use crate::ir::context::{Context, ContextId, GLOBAL};
use crate::ir::function::{CSFuncId, FuncId};
use crate::ir::path::{CSPath, Path, PathEnum};
use crate::ir::program::CallSiteId;
use crate::pta::context_strategy::{ContextInsensitive, KCallSiteSensitive};
use crate::pta::*;
use crate::util::chunked_queue::{ChunkedQueue, QueueCursor};
use crate::util::pta_statistics::ContextSensitiveStat;

pub type CallSiteSensitivePTA<'pta, 'p> = ContextSensitivePTA<'pta, 'p, KCallSiteSensitive>;
/// Andersen-style analysis: every function is analysed once, under `GLOBAL`.
pub type AndersenPTA<'pta, 'p> = ContextSensitivePTA<'pta, 'p, ContextInsensitive>;

pub struct ContextSensitivePTA<'pta, 'p, S: ContextStrategy> {
    /// The analysis context
    pub(crate) acx: &'pta AnalysisContext<'p>,
    /// Context-free constraints of every accepted function
    constraints: &'pta ConstraintSet,
    /// Resolved call edges keyed by their call site
    call_edges: HashMap<CallSiteId, Vec<&'pta CallEdge>>,
    /// Points-to data
    pub(crate) pt_data: DiffPTDataTy,
    /// Pointer Assignment Graph
    pub(crate) pag: PAG,
    /// Call graph
    pub call_graph: CSCallGraph,

    /// Records the functions that have been processed
    pub(crate) processed_funcs: HashSet<CSFuncId>,

    /// Iterator for reachable functions
    rf_iter: QueueCursor,

    /// Iterator for address_of edges in pag
    addr_edge_iter: QueueCursor,

    // Argument and return bindings instantiated per (caller, callee) context
    // pair. They are propagated as initial constraints by the propagator.
    pub(crate) inter_proc_edges_queue: ChunkedQueue<EdgeId>,
    inter_proc_edge_iter: QueueCursor,

    ctx_strategy: S,

    monitor: SolverMonitor,
}

impl<'pta, 'p, S: ContextStrategy> Debug for ContextSensitivePTA<'pta, 'p, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        "ContextSensitivePTA".fmt(f)
    }
}

/// Constructor
impl<'pta, 'p, S: ContextStrategy<E = BaseCallSite>> ContextSensitivePTA<'pta, 'p, S> {
    pub fn new(
        acx: &'pta AnalysisContext<'p>,
        constraints: &'pta ConstraintSet,
        call_edges: &'pta [CallEdge],
        ctx_strategy: S,
    ) -> Self {
        let call_graph = CSCallGraph::new();
        let rf_iter = call_graph.reach_funcs_iter();
        let pag = PAG::new();
        let addr_edge_iter = pag.addr_edge_iter();
        let mut edges_by_site: HashMap<CallSiteId, Vec<&'pta CallEdge>> = HashMap::new();
        for call_edge in call_edges {
            edges_by_site.entry(call_edge.site()).or_default().push(call_edge);
        }
        let options = &acx.analysis_options;
        ContextSensitivePTA {
            acx,
            constraints,
            call_edges: edges_by_site,
            pt_data: DiffPTDataTy::new(),
            pag,
            call_graph,
            processed_funcs: HashSet::new(),
            rf_iter,
            addr_edge_iter,
            inter_proc_edges_queue: ChunkedQueue::new(),
            inter_proc_edge_iter: QueueCursor::new(),
            ctx_strategy,
            monitor: SolverMonitor::new(
                options.max_iterations,
                options.check_invariants,
                options.record_trace,
            ),
        }
    }

    #[inline]
    pub fn get_context_id(&mut self, context: &Rc<Context<S::E>>) -> ContextId {
        self.ctx_strategy.get_context_id(context)
    }

    #[inline]
    pub fn get_context_by_id(&self, context_id: ContextId) -> Rc<Context<S::E>> {
        self.ctx_strategy.get_context_by_id(context_id)
    }

    #[inline]
    pub fn get_empty_context_id(&self) -> ContextId {
        self.ctx_strategy.get_empty_context_id()
    }

    /// Initialize the analysis.
    ///
    /// The entry function is the only root when one is configured. Otherwise
    /// every function that no call site resolves to becomes a root, followed
    /// by the functions that are still unreached, e.g. call cycles without
    /// an outside caller.
    pub fn initialize(&mut self) {
        let empty_context_id = self.get_empty_context_id();
        if let Some(entry_func_id) = self.acx.entry_point {
            self.call_graph
                .add_node(CSFuncId::new(empty_context_id, entry_func_id));
            self.process_reach_funcs();
            return;
        }

        let callees: HashSet<FuncId> = self
            .call_edges
            .values()
            .flatten()
            .map(|call_edge| call_edge.callee)
            .collect();
        let funcs = self.constraints.func_pags().map(|fpag| fpag.func_id()).collect_vec();
        for func_id in funcs.iter().filter(|func_id| !callees.contains(*func_id)) {
            self.call_graph
                .add_node(CSFuncId::new(empty_context_id, *func_id));
        }
        self.process_reach_funcs();

        for func_id in funcs {
            let reached = self.processed_funcs.iter().any(|func| func.func_id == func_id);
            if !reached {
                self.call_graph
                    .add_node(CSFuncId::new(empty_context_id, func_id));
                self.process_reach_funcs();
            }
        }
    }

    /// Solve the worklist problem using Propagator.
    pub fn propagate(&mut self) -> PtaResult<()> {
        let mut propagator = Propagator::new(
            &mut self.pt_data,
            &mut self.pag,
            &mut self.addr_edge_iter,
            &self.inter_proc_edges_queue,
            &mut self.inter_proc_edge_iter,
            &mut self.monitor,
        );
        propagator.solve_worklist()
    }

    /// Process statements in reachable functions.
    fn process_reach_funcs(&mut self) {
        while let Some(func) = self.rf_iter.next(self.call_graph.reach_funcs()) {
            if self.processed_funcs.contains(&func) {
                continue;
            }
            info!(
                "Processing function {:?} {}, context: {:?}",
                func.func_id,
                self.acx.func_name(func.func_id),
                self.get_context_by_id(func.cid),
            );
            self.add_fpag_edges(func);
            self.process_calls_in_fpag(func);
        }
    }

    /// Adds internal edges of a function pag to the whole program's pag,
    /// qualified with the context of `func`.
    pub fn add_fpag_edges(&mut self, func: CSFuncId) {
        if !self.processed_funcs.insert(func) {
            return;
        }
        let Some(fpag) = self.constraints.func_pag(func.func_id) else {
            return;
        };
        for constraint in fpag.internal_edges_iter() {
            let (src, dst, kind) = constraint.as_edge();
            trace!(
                "{:?} {:?}: {} -> {}",
                func,
                kind,
                self.acx.path_name(&src),
                self.acx.path_name(&dst)
            );
            let cs_src = self.mk_cs_path(&src, func.cid);
            let cs_dst = self.mk_cs_path(&dst, func.cid);
            self.pag.add_edge(&cs_src, &cs_dst, kind);
        }
    }

    fn process_calls_in_fpag(&mut self, func: CSFuncId) {
        let Some(fpag) = self.constraints.func_pag(func.func_id) else {
            return;
        };
        // For static dispatch callsites, the call target can be resolved directly.
        for (callsite, _callee_name) in fpag.static_dispatch_callsites() {
            let cs_callsite = self.mk_cs_callsite(callsite, func.cid);
            let call_edges = self.call_edges.get(&callsite.site).cloned().unwrap_or_default();
            for call_edge in call_edges {
                self.process_new_call(&cs_callsite, call_edge);
            }
        }
    }

    fn process_new_call(&mut self, callsite: &Rc<CSCallSite>, call_edge: &CallEdge) {
        let callee_cid = self.ctx_strategy.new_static_call_context(callsite);
        let cs_callee = CSFuncId::new(callee_cid, call_edge.callee);
        self.add_call_edge(callsite, call_edge, &cs_callee);
    }

    /// Adds the call to the call graph and instantiates its bindings between
    /// the caller's and the callee's contexts.
    fn add_call_edge(&mut self, callsite: &Rc<CSCallSite>, call_edge: &CallEdge, callee: &CSFuncId) {
        let caller = callsite.func;
        if !self.call_graph.add_edge(callsite.into(), caller, *callee) {
            return;
        }
        debug!(
            "Callsite: {} calls {} at {:?}, callee context: {:?}",
            self.acx.func_name(caller.func_id),
            self.acx.func_name(callee.func_id),
            callsite.site,
            self.get_context_by_id(callee.cid)
        );

        let acx = self.acx;
        let new_inter_proc_edges =
            self.pag
                .add_inter_procedural_edges(call_edge, caller.cid, callee.cid, |path, cid| {
                    qualify_path(acx, path, cid)
                });
        for edge in new_inter_proc_edges {
            self.inter_proc_edges_queue.push(edge);
        }
    }

    #[inline]
    fn mk_cs_path(&self, path: &Path, cid: ContextId) -> CSPath {
        qualify_path(self.acx, path, cid)
    }

    fn mk_cs_callsite(&self, callsite: &Rc<CallSite>, cid: ContextId) -> Rc<CSCallSite> {
        Rc::new(CSCallSite::new(
            CSFuncId::new(cid, callsite.func),
            callsite.site,
            callsite.location,
            callsite
                .args
                .iter()
                .map(|arg| self.mk_cs_path(arg, cid))
                .collect_vec(),
            callsite.destination.map(|dst| self.mk_cs_path(&dst, cid)),
        ))
    }

    #[inline]
    pub fn num_contexts(&self) -> usize {
        self.ctx_strategy.contexts().len()
    }

    /// Collapses the points-to data of PAG nodes into per-variable results.
    pub fn collect_results(&self) -> PTAResults {
        let mut results = PTAResults {
            globals: self.acx.program.globals().collect(),
            contexts: self
                .ctx_strategy
                .contexts()
                .iter()
                .map(|ctx| ctx.elements().to_vec())
                .collect(),
            iterations: self.monitor.iterations,
            trace: self.monitor.trace.clone(),
            ..PTAResults::default()
        };
        for node_id in self.pt_data.keys() {
            let cs_path = self.pag.node_path(node_id);
            let PathEnum::Variable { var } = cs_path.path.value() else {
                continue;
            };
            let pts = self.pt_data.get_pts(node_id);
            let locs = results.pts.entry((*var, cs_path.cid)).or_default();
            for pointee in &pts {
                if let Some(pointee_var) = self.pag.node_path(pointee).path.as_variable() {
                    locs.insert(Location::new(pointee_var));
                }
            }
        }
        for (callsite, _caller, callee) in self.call_graph.edges() {
            results
                .callee_contexts
                .entry(callsite.site)
                .or_insert_with(BTreeSet::new)
                .insert(callee.cid);
        }
        for func in self.call_graph.func_nodes.keys() {
            results
                .func_contexts
                .entry(func.func_id)
                .or_default()
                .insert(func.cid);
        }
        results
    }

    /// Finalize the analysis.
    pub fn finalize(&self) {
        if self.acx.analysis_options.dump_stats {
            let pta_stat = ContextSensitiveStat::new(self);
            if let Err(err) = pta_stat.dump_stats() {
                error!("Unable to dump pta statistics: {}", err);
            }
        }
    }
}

/// Locals, parameters and return slots live in the context of their
/// function, globals always in `GLOBAL`.
pub(crate) fn qualify_path(acx: &AnalysisContext, path: &Path, cid: ContextId) -> CSPath {
    match path.value() {
        PathEnum::Variable { var } if acx.is_global(*var) => CSPath::new_cs_path(GLOBAL, *path),
        PathEnum::Variable { .. } | PathEnum::ReturnValue { .. } => CSPath::new_cs_path(cid, *path),
    }
}

impl<'pta, 'p, S: ContextStrategy<E = BaseCallSite>> PointerAnalysis for ContextSensitivePTA<'pta, 'p, S> {
    /// Analyze the program, instantiating each function once per context it is reached in.
    fn analyze(&mut self) -> PtaResult<()> {
        let now = Instant::now();

        // Initialization for the analysis.
        self.initialize();

        // Solve the worklist problem.
        self.propagate()?;

        let elapsed = now.elapsed();
        info!("Context-sensitive PTA completed.");
        info!(
            "Analysis time: {}, {} iterations, {} contexts, {} PAG nodes",
            humantime::format_duration(elapsed),
            self.monitor.iterations,
            self.num_contexts(),
            self.pag.graph().node_count()
        );

        // Finalize the analysis.
        self.finalize();
        Ok(())
    }

    fn results(&self) -> PTAResults {
        self.collect_results()
    }
}
