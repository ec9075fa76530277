// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The key component of our pointer analysis.

use std::collections::{BTreeSet, HashMap, VecDeque};

use log::*;

use crate::error::{PtaError, PtaResult};
use crate::graph::pag::*;
use crate::pta::results::TraceEntry;
use crate::pta::*;
use crate::pts_set::points_to::PointsToSet;
use crate::util::chunked_queue::{ChunkedQueue, QueueCursor};

/// Bookkeeping shared by successive runs of the propagator: the iteration
/// budget, the last observed set sizes and the optional trace.
#[derive(Debug)]
pub struct SolverMonitor {
    /// Upper bound on worklist pops. `None` derives it from the graph size.
    max_iterations: Option<usize>,
    check_invariants: bool,
    record_trace: bool,
    pub(crate) iterations: usize,
    last_sizes: HashMap<NodeId, usize>,
    pub(crate) trace: Vec<TraceEntry>,
}

impl SolverMonitor {
    pub fn new(max_iterations: Option<usize>, check_invariants: bool, record_trace: bool) -> Self {
        SolverMonitor {
            max_iterations,
            check_invariants,
            record_trace,
            iterations: 0,
            last_sizes: HashMap::new(),
            trace: Vec::new(),
        }
    }

    /// Every pop follows a push that added a new (node, pointee) pair, so
    /// a graph with `n` nodes needs at most `n * n` pops.
    fn iteration_cap(&self, num_nodes: usize) -> usize {
        self.max_iterations
            .unwrap_or_else(|| num_nodes.saturating_mul(num_nodes).saturating_add(1))
    }

    fn observe(&mut self, pag: &PAG, node_id: NodeId, size: usize) -> PtaResult<()> {
        if self.check_invariants {
            let last = self.last_sizes.insert(node_id, size).unwrap_or(0);
            if size < last {
                return Err(PtaError::non_monotone(pag.node_path(node_id), last, size));
            }
        }
        if self.record_trace {
            let cs_path = pag.node_path(node_id);
            self.trace.push(TraceEntry {
                step: self.iterations,
                path: cs_path.path,
                cid: cs_path.cid,
                size,
            });
        }
        Ok(())
    }
}

/// Propagating the points-to information along the PAG edges.
pub struct Propagator<'pta> {
    /// Points-to data
    pub(crate) pt_data: &'pta mut DiffPTDataTy,
    /// Pointer Assignment Graph
    pub(crate) pag: &'pta mut PAG,

    /// Iterator for address_of edges in pag
    addr_edge_iter: &'pta mut QueueCursor,

    /// Call bindings instantiated since the last run
    inter_proc_edges: &'pta ChunkedQueue<EdgeId>,
    inter_proc_edge_iter: &'pta mut QueueCursor,

    /// Worklist for resolution
    worklist: VecDeque<NodeId>,

    monitor: &'pta mut SolverMonitor,
}

impl<'pta> Propagator<'pta> {
    /// Constructor
    pub fn new(
        pt_data: &'pta mut DiffPTDataTy,
        pag: &'pta mut PAG,
        addr_edge_iter: &'pta mut QueueCursor,
        inter_proc_edges: &'pta ChunkedQueue<EdgeId>,
        inter_proc_edge_iter: &'pta mut QueueCursor,
        monitor: &'pta mut SolverMonitor,
    ) -> Self {
        Propagator {
            pt_data,
            pag,
            addr_edge_iter,
            inter_proc_edges,
            inter_proc_edge_iter,
            worklist: VecDeque::new(),
            monitor,
        }
    }

    /// Propogate pts data until the worklist is empty.
    pub fn solve_worklist(&mut self) -> PtaResult<()> {
        self.init_constraints();
        // Solving never adds nodes: loads and stores only connect existing ones.
        let cap = self.monitor.iteration_cap(self.pag.graph().node_count());
        while let Some(node_id) = self.worklist.pop_front() {
            self.monitor.iterations += 1;
            if self.monitor.iterations > cap {
                return Err(PtaError::InternalInvariantViolation(format!(
                    "solver exceeded its budget of {} iterations",
                    cap
                )));
            }
            self.process_node(node_id)?;
        }
        Ok(())
    }

    /// Initialize the worklist, activate new constraints.
    pub fn init_constraints(&mut self) {
        self.process_all_addr_edges();
        self.process_all_inter_proc_edges();
    }

    /// Process address edges.
    fn process_all_addr_edges(&mut self) {
        while let Some(edge_id) = self.addr_edge_iter.next(&self.pag.addr_edges_queue) {
            self.process_addr(edge_id);
        }
    }

    /// Process arg-param and ret-dst edges.
    fn process_all_inter_proc_edges(&mut self) {
        while let Some(edge_id) = self.inter_proc_edge_iter.next(self.inter_proc_edges) {
            self.propagate(edge_id, false);
        }
    }

    fn process_node(&mut self, node_id: NodeId) -> PtaResult<()> {
        trace!(
            "Step {}: {:?}",
            self.monitor.iterations,
            self.pag.node_path(node_id)
        );
        self.handle_direct(node_id);
        self.handle_load_and_store(node_id);

        self.pt_data.flush(node_id);
        let size = self.pt_data.get_pts_count(node_id);
        self.monitor.observe(self.pag, node_id, size)
    }

    /// Process the given addr edge.
    fn process_addr(&mut self, addr_edge: EdgeId) {
        let (src, dst) = self.pag.edge_endpoints(addr_edge);
        if self.pt_data.add_pts(dst, src) {
            self.worklist.push_back(dst);
        }
    }

    /// process all outgoing direct edges of the node.
    fn handle_direct(&mut self, node_id: NodeId) {
        let Some(direct_out_edges) = self.pag.direct_out_edges.get_mut(&node_id) else {
            return;
        };
        let direct_out_edges = std::mem::take(direct_out_edges);
        for edge in &direct_out_edges {
            self.propagate(*edge, true);
        }
        self.restore_edges(node_id, direct_out_edges, |pag| &mut pag.direct_out_edges);
    }

    /// process all outgoing load edges and incoming store edges of the node.
    fn handle_load_and_store(&mut self, node_id: NodeId) {
        let diff_pts = match self.pt_data.get_diff_pts(node_id) {
            Some(diff_pts) if !diff_pts.is_empty() => diff_pts.clone(),
            _ => return,
        };
        if let Some(load_out_edges) = self.pag.load_out_edges.get_mut(&node_id) {
            let load_out_edges = std::mem::take(load_out_edges);
            for load_edge in &load_out_edges {
                self.process_load(*load_edge, &diff_pts);
            }
            self.restore_edges(node_id, load_out_edges, |pag| &mut pag.load_out_edges);
        }
        if let Some(store_in_edges) = self.pag.store_in_edges.get_mut(&node_id) {
            let store_in_edges = std::mem::take(store_in_edges);
            for store_edge in &store_in_edges {
                self.process_store(*store_edge, &diff_pts);
            }
            self.restore_edges(node_id, store_in_edges, |pag| &mut pag.store_in_edges);
        }
    }

    fn restore_edges(
        &mut self,
        node_id: NodeId,
        edges: BTreeSet<EdgeId>,
        edge_map: impl FnOnce(&mut PAG) -> &mut HashMap<NodeId, BTreeSet<EdgeId>>,
    ) {
        edge_map(&mut *self.pag).entry(node_id).or_default().extend(edges);
    }

    /// Process the given load edge.
    /// src --load--> dst:  node \in pts(src) ==> node --direct-->dst
    fn process_load(&mut self, load_edge: EdgeId, base_pts: &PointsTo<NodeId>) {
        let (_src, dst) = self.pag.edge_endpoints(load_edge);
        for pointee in base_pts {
            if let Some(edge_id) = self.add_direct_edge(pointee, dst) {
                self.propagate(edge_id, false);
            }
        }
    }

    /// Process the given store edge.
    /// src --store--> dst:  node \in pts(dst) ==> src --direct--> node
    fn process_store(&mut self, store_edge: EdgeId, base_pts: &PointsTo<NodeId>) {
        let (src, _dst) = self.pag.edge_endpoints(store_edge);
        for pointee in base_pts {
            if let Some(edge_id) = self.add_direct_edge(src, pointee) {
                self.propagate(edge_id, false);
            }
        }
    }

    fn add_direct_edge(&mut self, src: NodeId, dst: NodeId) -> Option<EdgeId> {
        self.pag
            .add_edge_between(src, dst, PAGEdgeEnum::DirectPAGEdge)
    }

    /// Process the given direct edge. Only the diff of the source is pushed
    /// along edges that were already active, the whole set along new ones.
    fn propagate(&mut self, direct_edge: EdgeId, propa_diff: bool) {
        let (src, dst) = self.pag.edge_endpoints(direct_edge);
        let changed = if propa_diff {
            self.pt_data.union_diff_pts(dst, src)
        } else {
            self.pt_data.union_pts(dst, src)
        };
        if changed {
            self.worklist.push_back(dst);
        }
    }
}
