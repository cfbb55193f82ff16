// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use petgraph::graph::{DefaultIx, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::{Direction, Graph};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::ir::call_site::{CSCallSite, CSMethodId, CallKind};
use crate::ir::{MethodId, StmtId};
use crate::util::chunked_queue::{self, ChunkedQueue};

/// Unique identifiers for call graph nodes.
pub type CGNodeId = NodeIndex<DefaultIx>;
/// Unique identifiers for call graph edges.
pub type CGEdgeId = EdgeIndex<DefaultIx>;
// Context-sensitive call graph.
pub type CSCallGraph = CallGraph<CSMethodId, CSCallSite>;

pub trait CGMethod: Copy + Clone + PartialEq + Eq + Hash + Debug {}

impl CGMethod for MethodId {}
impl CGMethod for CSMethodId {}

pub trait CGCallSite: Copy + Clone + PartialEq + Eq + Hash + Debug {}

impl CGCallSite for StmtId {}
impl CGCallSite for CSCallSite {}

#[derive(Debug)]
pub struct CallGraphNode<F: CGMethod> {
    pub(crate) method: F,
}

#[derive(Debug)]
pub struct CallGraphEdge<S: CGCallSite> {
    pub(crate) callsite: S,
    pub(crate) kind: CallKind,
}

/// The call graph: reachable methods plus `(kind, callsite, callee)` edges.
/// Grows monotonically during solving; `F` and `S` select the
/// context-insensitive or context-sensitive form.
pub struct CallGraph<F: CGMethod, S: CGCallSite> {
    /// The graph structure capturing call relationships.
    pub graph: Graph<CallGraphNode<F>, CallGraphEdge<S>>,
    /// A map from methods to their corresponding call graph nodes.
    pub method_nodes: HashMap<F, CGNodeId>,
    /// A map from call sites to call graph edges, in insertion order.
    pub callsite_to_edges: HashMap<S, Vec<CGEdgeId>>,
    /// A queue of reachable methods, iterable while it grows.
    pub(crate) reach_methods: ChunkedQueue<F>,
}

impl<F: CGMethod, S: CGCallSite> Default for CallGraph<F, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: CGMethod, S: CGCallSite> CallGraph<F, S> {
    pub fn new() -> Self {
        CallGraph {
            graph: Graph::new(),
            method_nodes: HashMap::new(),
            callsite_to_edges: HashMap::new(),
            reach_methods: ChunkedQueue::new(),
        }
    }

    /// Add a new node to the call graph, marking the method reachable.
    pub fn add_node(&mut self, method: F) {
        self.get_or_insert_node(method);
    }

    /// Helper function to get a node or insert a new
    /// node if it does not exist in the map.
    fn get_or_insert_node(&mut self, method: F) -> CGNodeId {
        match self.method_nodes.entry(method) {
            Entry::Occupied(o) => o.get().to_owned(),
            Entry::Vacant(v) => {
                // Newly discovered methods enter the reachable queue.
                self.reach_methods.push(method);
                let node_id = self.graph.add_node(CallGraphNode { method });
                *v.insert(node_id)
            }
        }
    }

    /// Returns true if the method has been discovered reachable.
    pub fn is_reachable(&self, method: F) -> bool {
        self.method_nodes.contains_key(&method)
    }

    pub fn num_reachable(&self) -> usize {
        self.method_nodes.len()
    }

    /// All callees invoked from the given callsite, in edge insertion order.
    pub fn get_callees(&self, callsite: &S) -> Vec<F> {
        if let Some(edges) = self.callsite_to_edges.get(callsite) {
            edges
                .iter()
                .filter_map(|edge_id| match self.graph.edge_endpoints(*edge_id) {
                    Some((_, target)) => Some(self.graph[target].method),
                    None => None,
                })
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Returns true if an edge to the callee already existed for the callsite.
    pub fn has_edge(&self, callsite: &S, callee: F) -> bool {
        self.get_callees(callsite).contains(&callee)
    }

    /// Adds a new edge to the call graph.
    /// The edge is a call from `caller` to `callee` at `callsite`.
    /// Returns false if the edge already existed, and true otherwise.
    pub fn add_edge(&mut self, callsite: S, caller: F, callee: F, kind: CallKind) -> bool {
        if self.has_edge(&callsite, callee) {
            return false;
        }
        let caller_node = self.get_or_insert_node(caller);
        let callee_node = self.get_or_insert_node(callee);
        let edge_id = self
            .graph
            .add_edge(caller_node, callee_node, CallGraphEdge { callsite, kind });
        self.callsite_to_edges.entry(callsite).or_default().push(edge_id);
        true
    }

    /// Return an iterator for the reachable methods.
    pub fn reach_methods_iter(&self) -> chunked_queue::IterCopied<F> {
        self.reach_methods.iter_copied()
    }

    /// All edges as `(kind, callsite, caller, callee)`, in insertion order.
    pub fn edges(&self) -> Vec<(CallKind, S, F, F)> {
        self.graph
            .edge_references()
            .map(|edge| {
                (
                    edge.weight().kind,
                    edge.weight().callsite,
                    self.graph[edge.source()].method,
                    self.graph[edge.target()].method,
                )
            })
            .collect()
    }

    /// All `(callsite, callee)` pairs called from the given method.
    pub fn callees_of(&self, caller: F) -> Vec<(S, F)> {
        match self.method_nodes.get(&caller) {
            Some(node) => self
                .graph
                .edges_directed(*node, Direction::Outgoing)
                .map(|edge| (edge.weight().callsite, self.graph[edge.target()].method))
                .collect(),
            None => Vec::new(),
        }
    }

    /// All `(callsite, caller)` pairs calling the given method.
    pub fn callers_of(&self, callee: F) -> Vec<(S, F)> {
        match self.method_nodes.get(&callee) {
            Some(node) => self
                .graph
                .edges_directed(*node, Direction::Incoming)
                .map(|edge| (edge.weight().callsite, self.graph[edge.source()].method))
                .collect(),
            None => Vec::new(),
        }
    }
}
