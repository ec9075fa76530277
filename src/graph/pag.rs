// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use petgraph::graph::{DefaultIx, EdgeIndex, NodeIndex};
use petgraph::Graph;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use crate::ir::call_site::CallEdge;
use crate::ir::context::ContextId;
use crate::ir::path::{CSPath, Path};
use crate::util::bit_vec::Idx;
use crate::util::chunked_queue::{ChunkedQueue, QueueCursor};

// Unique identifiers for graph node and edges.
pub type PAGNodeId = NodeIndex<DefaultIx>;
pub type PAGEdgeId = EdgeIndex<DefaultIx>;

impl Idx for PAGNodeId {
    #[inline]
    fn new(idx: usize) -> Self {
        NodeIndex::new(idx)
    }

    #[inline]
    fn index(self) -> usize {
        NodeIndex::index(self)
    }
}

pub struct PAGNode {
    path: CSPath,
}

impl PAGNode {
    pub fn new(path: CSPath) -> Self {
        PAGNode { path }
    }

    /// Returns the path of the node.
    pub fn path(&self) -> &CSPath {
        &self.path
    }
}

pub struct PAGEdge {
    pub kind: PAGEdgeEnum,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PAGEdgeEnum {
    /// `dst = &src`: the source node is the pointee of the destination.
    AddrPAGEdge,
    /// `dst = src`, including argument and return bindings of calls.
    DirectPAGEdge,
    /// `dst = *src`
    LoadPAGEdge,
    /// `*dst = src`, stored as an edge from `src` to `dst`.
    StorePAGEdge,
}

type EdgeMap = HashMap<PAGNodeId, BTreeSet<PAGEdgeId>>;

/// The pointer assignment graph over context-qualified paths.
///
/// Nodes are never removed and an edge of a given kind between two nodes is
/// stored at most once, which makes adding constraints idempotent.
pub struct PAG {
    /// The graph structure capturing assignment relations between nodes.
    pub(crate) graph: Graph<PAGNode, PAGEdge>,
    /// A map from values to node id.
    pub(crate) values: HashMap<CSPath, PAGNodeId>,
    // Iterated in pointer analysis. When new function pags are instantiated, we
    // put the new addr_edges into this queue to help active new constraints.
    pub(crate) addr_edges_queue: ChunkedQueue<PAGEdgeId>,

    pub(crate) direct_out_edges: EdgeMap,
    pub(crate) load_out_edges: EdgeMap,
    pub(crate) store_in_edges: EdgeMap,
}

impl Default for PAG {
    fn default() -> Self {
        Self::new()
    }
}

impl PAG {
    pub fn new() -> Self {
        PAG {
            graph: Graph::<PAGNode, PAGEdge>::new(),
            values: HashMap::new(),
            addr_edges_queue: ChunkedQueue::new(),
            direct_out_edges: EdgeMap::new(),
            load_out_edges: EdgeMap::new(),
            store_in_edges: EdgeMap::new(),
        }
    }

    #[inline]
    pub fn graph(&self) -> &Graph<PAGNode, PAGEdge> {
        &self.graph
    }

    /// A cursor over the `address_of` edges, starting at the first one.
    pub fn addr_edge_iter(&self) -> QueueCursor {
        QueueCursor::new()
    }

    /// Returns the path for the given node_id.
    #[inline]
    pub fn node_path(&self, node_id: PAGNodeId) -> &CSPath {
        self.graph[node_id].path()
    }

    pub fn get_node_id(&self, path: &CSPath) -> Option<PAGNodeId> {
        self.values.get(path).copied()
    }

    /// Returns the `(src, dst)` node pair of an edge.
    #[inline]
    pub fn edge_endpoints(&self, edge_id: PAGEdgeId) -> (PAGNodeId, PAGNodeId) {
        let edge = self.graph.raw_edges();
        (edge[edge_id.index()].source(), edge[edge_id.index()].target())
    }

    /// Helper function to get a node or insert a new
    /// node if it does not exist in the map.
    pub fn get_or_insert_node(&mut self, path: &CSPath) -> PAGNodeId {
        match self.values.entry(*path) {
            Entry::Occupied(o) => *o.get(),
            Entry::Vacant(v) => {
                let node_id = self.graph.add_node(PAGNode::new(*path));
                *v.insert(node_id)
            }
        }
    }

    /// Returns true if the edge from `src` to `dst` of the `kind` exists.
    pub fn has_edge(&self, src: &CSPath, dst: &CSPath, kind: PAGEdgeEnum) -> bool {
        match (self.values.get(src), self.values.get(dst)) {
            (Some(src_id), Some(dst_id)) => self.contains_edge(*src_id, *dst_id, kind),
            _ => false,
        }
    }

    pub fn contains_edge(&self, src: PAGNodeId, dst: PAGNodeId, kind: PAGEdgeEnum) -> bool {
        self.graph
            .edges_connecting(src, dst)
            .any(|edge| edge.weight().kind == kind)
    }

    /// Adds an edge from `src` to `dst` according to the edge type.
    /// Returns the edge id if this edge is newly added to the graph.
    pub fn add_edge(&mut self, src: &CSPath, dst: &CSPath, kind: PAGEdgeEnum) -> Option<PAGEdgeId> {
        let src_id = self.get_or_insert_node(src);
        let dst_id = self.get_or_insert_node(dst);
        self.add_edge_between(src_id, dst_id, kind)
    }

    pub fn add_edge_between(
        &mut self,
        src_id: PAGNodeId,
        dst_id: PAGNodeId,
        kind: PAGEdgeEnum,
    ) -> Option<PAGEdgeId> {
        if self.contains_edge(src_id, dst_id, kind) {
            return None;
        }
        let edge_id = self.graph.add_edge(src_id, dst_id, PAGEdge { kind });
        match kind {
            PAGEdgeEnum::AddrPAGEdge => self.addr_edges_queue.push(edge_id),
            PAGEdgeEnum::DirectPAGEdge => {
                self.direct_out_edges.entry(src_id).or_default().insert(edge_id);
            }
            // Loads are triggered by the base pointer, stores by the stored-to pointer.
            PAGEdgeEnum::LoadPAGEdge => {
                self.load_out_edges.entry(src_id).or_default().insert(edge_id);
            }
            PAGEdgeEnum::StorePAGEdge => {
                self.store_in_edges.entry(dst_id).or_default().insert(edge_id);
            }
        }
        Some(edge_id)
    }

    #[inline]
    pub fn add_direct_edge(&mut self, src: &CSPath, dst: &CSPath) -> Option<PAGEdgeId> {
        self.add_edge(src, dst, PAGEdgeEnum::DirectPAGEdge)
    }

    /// Instantiates the argument and return bindings of `call_edge` between
    /// a caller context and a callee context. Returns the edges added.
    ///
    /// Every binding becomes its own copy edge into the callee's formal, so
    /// bindings from other call sites or contexts are never replaced.
    pub fn add_inter_procedural_edges(
        &mut self,
        call_edge: &CallEdge,
        caller_cid: ContextId,
        callee_cid: ContextId,
        mk_cs_path: impl Fn(&Path, ContextId) -> CSPath,
    ) -> Vec<PAGEdgeId> {
        let mut new_edges = Vec::new();
        for (arg, param) in &call_edge.arg_bindings {
            let src = mk_cs_path(arg, caller_cid);
            let dst = mk_cs_path(param, callee_cid);
            if let Some(edge_id) = self.add_direct_edge(&src, &dst) {
                new_edges.push(edge_id);
            }
        }
        if let Some((ret, dst)) = &call_edge.ret_binding {
            let src = mk_cs_path(ret, callee_cid);
            let dst = mk_cs_path(dst, caller_cid);
            if let Some(edge_id) = self.add_direct_edge(&src, &dst) {
                new_edges.push(edge_id);
            }
        }
        new_edges
    }
}
