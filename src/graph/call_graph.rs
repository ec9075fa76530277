// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use petgraph::graph::{DefaultIx, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Graph;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use crate::ir::call_site::CSBaseCallSite;
use crate::ir::function::CSFuncId;
use crate::util::chunked_queue::{ChunkedQueue, QueueCursor};

/// Unique identifiers for call graph nodes.
pub type CGNodeId = NodeIndex<DefaultIx>;
/// Unique identifiers for call graph edges.
pub type CGEdgeId = EdgeIndex<DefaultIx>;
// Context-sensitive call graph.
pub type CSCallGraph = CallGraph<CSFuncId, CSBaseCallSite>;

pub trait CGFunction: Copy + Clone + PartialEq + Eq + Hash + Debug {}

impl<T: Copy + Clone + PartialEq + Eq + Hash + Debug> CGFunction for T {}

pub trait CGCallSite: Copy + Clone + PartialEq + Eq + Hash + Debug {}

impl<T: Copy + Clone + PartialEq + Eq + Hash + Debug> CGCallSite for T {}

#[derive(Debug)]
pub struct CallGraphNode<F: CGFunction> {
    pub(crate) func: F,
}

#[derive(Debug)]
pub struct CallGraphEdge<S: CGCallSite> {
    pub(crate) callsite: S,
}

pub struct CallGraph<F: CGFunction, S: CGCallSite> {
    /// The graph structure capturing call relationships.
    pub graph: Graph<CallGraphNode<F>, CallGraphEdge<S>>,
    /// A map from functions to their corresponding call graph nodes.
    pub func_nodes: HashMap<F, CGNodeId>,
    /// A map from call sites to call graph edges.
    pub callsite_to_edges: HashMap<S, HashSet<CGEdgeId>>,
    /// A queue of reachable nodes, in discovery order.
    pub(crate) reach_funcs: ChunkedQueue<F>,
}

impl<F: CGFunction, S: CGCallSite> Default for CallGraph<F, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: CGFunction, S: CGCallSite> CallGraph<F, S> {
    pub fn new() -> Self {
        CallGraph {
            graph: Graph::new(),
            func_nodes: HashMap::new(),
            callsite_to_edges: HashMap::new(),
            reach_funcs: ChunkedQueue::new(),
        }
    }

    /// Add a new node to the call graph. New nodes are queued as reachable.
    pub fn add_node(&mut self, func: F) {
        self.get_or_insert_node(func);
    }

    fn get_or_insert_node(&mut self, func: F) -> CGNodeId {
        match self.func_nodes.entry(func) {
            Entry::Occupied(o) => *o.get(),
            Entry::Vacant(v) => {
                self.reach_funcs.push(func);
                let node_id = self.graph.add_node(CallGraphNode { func });
                *v.insert(node_id)
            }
        }
    }

    #[inline]
    pub fn contains_func(&self, func: &F) -> bool {
        self.func_nodes.contains_key(func)
    }

    /// All callees of a callsite.
    pub fn get_callees(&self, callsite: &S) -> HashSet<F> {
        match self.callsite_to_edges.get(callsite) {
            Some(edges) => edges
                .iter()
                .filter_map(|edge_id| self.graph.edge_endpoints(*edge_id))
                .map(|(_, target)| self.graph[target].func)
                .collect(),
            None => HashSet::new(),
        }
    }

    /// Returns true if an edge to the callee already existed for the callsite.
    pub fn has_edge(&self, callsite: &S, callee_id: F) -> bool {
        self.get_callees(callsite).contains(&callee_id)
    }

    /// Adds a new edge to the call graph.
    /// The edge is a call from `caller_id` to `callee_id` at `callsite`.
    /// Returns false if the edge already existed, and true otherwise.
    pub fn add_edge(&mut self, callsite: S, caller_id: F, callee_id: F) -> bool {
        let caller_node = self.get_or_insert_node(caller_id);
        let callee_node = self.get_or_insert_node(callee_id);
        if self.has_edge(&callsite, callee_id) {
            return false;
        }
        let edge_id = self
            .graph
            .add_edge(caller_node, callee_node, CallGraphEdge { callsite });
        self.callsite_to_edges
            .entry(callsite)
            .or_default()
            .insert(edge_id);
        true
    }

    /// Iterates over `(callsite, caller, callee)` triples.
    pub fn edges(&self) -> impl Iterator<Item = (S, F, F)> + '_ {
        self.graph.edge_references().map(|edge| {
            (
                edge.weight().callsite,
                self.graph[edge.source()].func,
                self.graph[edge.target()].func,
            )
        })
    }

    /// A cursor over the reachable functions, starting at the first one.
    pub fn reach_funcs_iter(&self) -> QueueCursor {
        QueueCursor::new()
    }

    #[inline]
    pub fn reach_funcs(&self) -> &ChunkedQueue<F> {
        &self.reach_funcs
    }

    #[inline]
    pub fn num_edges(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_edges_are_ignored() {
        let mut cg: CallGraph<u32, (u32, u32)> = CallGraph::new();
        assert!(cg.add_edge((0, 1), 0, 1));
        assert!(!cg.add_edge((0, 1), 0, 1));
        assert!(cg.add_edge((0, 1), 0, 2));
        assert_eq!(cg.num_edges(), 2);
        assert_eq!(cg.get_callees(&(0, 1)), [1, 2].into_iter().collect());
    }

    #[test]
    fn new_nodes_become_reachable_in_order() {
        let mut cg: CallGraph<u32, u32> = CallGraph::new();
        cg.add_node(7);
        cg.add_edge(0, 7, 3);
        cg.add_node(3);
        let mut cursor = cg.reach_funcs_iter();
        let mut reached = Vec::new();
        while let Some(func) = cursor.next(cg.reach_funcs()) {
            reached.push(func);
        }
        assert_eq!(reached, vec![7, 3]);
        assert!(cg.contains_func(&3));
    }
}
