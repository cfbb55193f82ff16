// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The inter-procedural control-flow graph.
//!
//! Like the CFG, the ICFG is built by the host from the per-method CFGs and
//! a call graph; the inter-procedural solver only traverses it. `Call` and
//! `Return` edges connect call sites to callee entries and exits; `Return`
//! edges carry the returned variables of the callee.

use std::collections::HashMap;

use petgraph::graph::{DefaultIx, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::{Direction, Graph};

use crate::ir::{MethodId, StmtId, VarId};

pub type IcfgNodeId = NodeIndex<DefaultIx>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IcfgNode {
    Entry(MethodId),
    Exit(MethodId),
    Stmt(StmtId),
}

impl IcfgNode {
    pub fn as_stmt(self) -> Option<StmtId> {
        match self {
            IcfgNode::Stmt(stmt) => Some(stmt),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IcfgEdgeKind {
    Normal,
    /// Edge from a call site to its return site within the caller.
    CallToReturn { callsite: StmtId },
    /// Edge from a call site to a callee entry.
    Call { callsite: StmtId, callee: MethodId },
    /// Edge from a callee exit back to the return site, carrying the
    /// callee's returned variables.
    Return {
        callsite: StmtId,
        callee: MethodId,
        ret_vars: Vec<VarId>,
    },
}

pub struct Icfg {
    graph: Graph<IcfgNode, IcfgEdgeKind>,
    node_map: HashMap<IcfgNode, IcfgNodeId>,
}

impl Default for Icfg {
    fn default() -> Self {
        Self::new()
    }
}

impl Icfg {
    pub fn new() -> Self {
        Icfg {
            graph: Graph::new(),
            node_map: HashMap::new(),
        }
    }

    pub fn add_node(&mut self, node: IcfgNode) -> IcfgNodeId {
        if let Some(id) = self.node_map.get(&node) {
            return *id;
        }
        let id = self.graph.add_node(node);
        self.node_map.insert(node, id);
        id
    }

    pub fn add_edge(&mut self, from: IcfgNode, to: IcfgNode, kind: IcfgEdgeKind) {
        let from = self.add_node(from);
        let to = self.add_node(to);
        self.graph.add_edge(from, to, kind);
    }

    pub fn contains(&self, node: IcfgNode) -> bool {
        self.node_map.contains_key(&node)
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = IcfgNode> + '_ {
        self.graph.node_indices().map(|id| self.graph[id])
    }

    /// Incoming edges of a node as (source node, edge kind) pairs.
    pub fn in_edges(&self, node: IcfgNode) -> Vec<(IcfgNode, &IcfgEdgeKind)> {
        let id = self.node_id(node);
        self.graph
            .edges_directed(id, Direction::Incoming)
            .map(|edge| (self.graph[edge.source()], edge.weight()))
            .collect()
    }

    pub fn succs(&self, node: IcfgNode) -> Vec<IcfgNode> {
        let id = self.node_id(node);
        self.graph
            .neighbors_directed(id, Direction::Outgoing)
            .map(|n| self.graph[n])
            .collect()
    }

    fn node_id(&self, node: IcfgNode) -> IcfgNodeId {
        *self
            .node_map
            .get(&node)
            .unwrap_or_else(|| panic!("node {:?} is not in the icfg", node))
    }
}
