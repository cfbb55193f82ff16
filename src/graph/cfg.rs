// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The intra-procedural control-flow graph.
//!
//! CFG construction from the IR is a host concern; the analyses only
//! traverse the graph. Nodes are statements plus one distinguished entry and
//! exit per method.

use std::collections::HashMap;

use petgraph::graph::{DefaultIx, NodeIndex};
use petgraph::{Direction, Graph};

use crate::ir::{MethodId, Program, StmtId};

pub type CfgNodeId = NodeIndex<DefaultIx>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CfgNode {
    Entry,
    Exit,
    Stmt(StmtId),
}

impl CfgNode {
    pub fn as_stmt(self) -> Option<StmtId> {
        match self {
            CfgNode::Stmt(stmt) => Some(stmt),
            _ => None,
        }
    }
}

/// The kind of a CFG edge. Branch statements tag their outgoing edges so
/// that dead-code detection can prune constant-folded branches.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CfgEdgeKind {
    Fallthrough,
    Goto,
    IfTrue,
    IfFalse,
    SwitchCase(i32),
    SwitchDefault,
}

pub struct Cfg {
    pub method: MethodId,
    graph: Graph<CfgNode, CfgEdgeKind>,
    node_map: HashMap<CfgNode, CfgNodeId>,
}

impl Cfg {
    pub fn new(method: MethodId) -> Self {
        let mut cfg = Cfg {
            method,
            graph: Graph::new(),
            node_map: HashMap::new(),
        };
        cfg.get_or_insert_node(CfgNode::Entry);
        cfg.get_or_insert_node(CfgNode::Exit);
        cfg
    }

    /// Builds the CFG of a straight-line method body: entry, the statements
    /// in order, exit, connected by fallthrough edges.
    pub fn new_linear(program: &Program, method: MethodId) -> Self {
        let mut cfg = Cfg::new(method);
        let mut prev = CfgNode::Entry;
        for &stmt in &program.method(method).body {
            cfg.add_edge(prev, CfgNode::Stmt(stmt), CfgEdgeKind::Fallthrough);
            prev = CfgNode::Stmt(stmt);
        }
        cfg.add_edge(prev, CfgNode::Exit, CfgEdgeKind::Fallthrough);
        cfg
    }

    fn get_or_insert_node(&mut self, node: CfgNode) -> CfgNodeId {
        if let Some(id) = self.node_map.get(&node) {
            return *id;
        }
        let id = self.graph.add_node(node);
        self.node_map.insert(node, id);
        id
    }

    pub fn add_edge(&mut self, from: CfgNode, to: CfgNode, kind: CfgEdgeKind) {
        let from = self.get_or_insert_node(from);
        let to = self.get_or_insert_node(to);
        self.graph.add_edge(from, to, kind);
    }

    pub fn contains(&self, node: CfgNode) -> bool {
        self.node_map.contains_key(&node)
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = CfgNode> + '_ {
        self.graph.node_indices().map(|id| self.graph[id])
    }

    /// All statement nodes in insertion order.
    pub fn stmts(&self) -> impl Iterator<Item = StmtId> + '_ {
        self.nodes().filter_map(CfgNode::as_stmt)
    }

    pub fn preds(&self, node: CfgNode) -> Vec<CfgNode> {
        self.neighbors(node, Direction::Incoming)
    }

    pub fn succs(&self, node: CfgNode) -> Vec<CfgNode> {
        self.neighbors(node, Direction::Outgoing)
    }

    /// Outgoing edges of a node with their kinds.
    pub fn out_edges(&self, node: CfgNode) -> Vec<(CfgNode, CfgEdgeKind)> {
        let id = self.node_id(node);
        self.graph
            .edges_directed(id, Direction::Outgoing)
            .map(|edge| {
                use petgraph::visit::EdgeRef;
                (self.graph[edge.target()], *edge.weight())
            })
            .collect()
    }

    fn neighbors(&self, node: CfgNode, dir: Direction) -> Vec<CfgNode> {
        let id = self.node_id(node);
        self.graph
            .neighbors_directed(id, dir)
            .map(|n| self.graph[n])
            .collect()
    }

    fn node_id(&self, node: CfgNode) -> CfgNodeId {
        *self
            .node_map
            .get(&node)
            .unwrap_or_else(|| panic!("node {:?} is not in the cfg", node))
    }
}
