// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The pointer flow graph (PFG).
//!
//! Nodes are pointers; an edge `a -> b` means the points-to set of `b` must
//! include the points-to set of `a`. The graph is parameterized over the
//! pointer representation so that the context-insensitive and the
//! context-sensitive analyses share the same structure.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use petgraph::graph::{DefaultIx, NodeIndex};
use petgraph::{Direction, Graph};

use crate::heap::{CSObjId, ObjId};
use crate::ir::context::ContextId;
use crate::ir::{FieldId, VarId};

pub type PfgNodeId = NodeIndex<DefaultIx>;

pub trait PfgPointer: Copy + Clone + PartialEq + Eq + Hash + Debug {}

/// Context-insensitive pointers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Pointer {
    Var(VarId),
    StaticField(FieldId),
    InstanceField(ObjId, FieldId),
    ArrayIndex(ObjId),
}

impl PfgPointer for Pointer {}

/// Context-sensitive pointers. Static fields stay context-insensitive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CSPointer {
    Var(ContextId, VarId),
    StaticField(FieldId),
    InstanceField(CSObjId, FieldId),
    ArrayIndex(CSObjId),
}

impl PfgPointer for CSPointer {}

pub struct Pfg<P: PfgPointer> {
    /// The graph structure capturing subset relations between pointers.
    graph: Graph<P, ()>,
    /// A map from pointers to node ids.
    values: HashMap<P, PfgNodeId>,
}

impl<P: PfgPointer> Default for Pfg<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PfgPointer> Pfg<P> {
    pub fn new() -> Self {
        Pfg {
            graph: Graph::new(),
            values: HashMap::new(),
        }
    }

    /// Returns the node id for the pointer, inserting a fresh node if the
    /// pointer has not been seen before.
    pub fn get_or_insert_node(&mut self, pointer: P) -> PfgNodeId {
        if let Some(id) = self.values.get(&pointer) {
            return *id;
        }
        let id = self.graph.add_node(pointer);
        self.values.insert(pointer, id);
        id
    }

    pub fn get_node_id(&self, pointer: &P) -> Option<PfgNodeId> {
        self.values.get(pointer).copied()
    }

    /// Returns the pointer of the given node.
    #[inline]
    pub fn node_pointer(&self, node_id: PfgNodeId) -> P {
        self.graph[node_id]
    }

    /// Adds a subset edge. Returns true if the edge is new.
    pub fn add_edge(&mut self, src: PfgNodeId, dst: PfgNodeId) -> bool {
        if self.graph.find_edge(src, dst).is_some() {
            return false;
        }
        self.graph.add_edge(src, dst, ());
        true
    }

    /// Successors of a node, i.e. the pointers whose points-to sets must
    /// include this node's.
    pub fn succs(&self, node_id: PfgNodeId) -> Vec<PfgNodeId> {
        self.graph
            .neighbors_directed(node_id, Direction::Outgoing)
            .collect()
    }

    /// All interned pointers with their node ids.
    pub fn nodes(&self) -> impl Iterator<Item = (PfgNodeId, P)> + '_ {
        self.graph.node_indices().map(|id| (id, self.graph[id]))
    }
}
