// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The inter-procedural data-flow framework.
//!
//! The solver has the same shape as the intra-procedural forward worklist
//! solver, but `IN[n]` is the meet of `transfer_edge(e, OUT[source(e)])`
//! over the inbound ICFG edges, so facts flow along call and return edges
//! with edge-specific transfers.

use std::collections::VecDeque;

use log::*;

use super::solver::DataflowResult;
use crate::graph::icfg::{Icfg, IcfgEdgeKind, IcfgNode};
use crate::ir::MethodId;

pub trait InterDataflowAnalysis {
    type Fact: Clone + PartialEq;

    /// The fact at the entry of the program's entry method.
    fn new_boundary_fact(&mut self, entry: MethodId) -> Self::Fact;

    fn new_initial_fact(&self) -> Self::Fact;

    /// `target` becomes `target ⊓ fact`. Returns true iff `target` changed.
    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact) -> bool;

    /// Node transfer; call nodes are expected to transfer identically, the
    /// real inter-procedural handling happens on edges.
    fn transfer_node(
        &mut self,
        node: IcfgNode,
        input: &Self::Fact,
        output: &mut Self::Fact,
    ) -> bool;

    /// Edge transfer, producing the fact that flows along the edge from the
    /// source node's OUT fact.
    fn transfer_edge(&mut self, kind: &IcfgEdgeKind, src_out: &Self::Fact) -> Self::Fact;

    /// Nodes the analysis wants re-processed beyond normal successor
    /// propagation (e.g. heap loads affected by a store). Drained by the
    /// solver after every node transfer.
    fn pending_nodes(&mut self) -> Vec<IcfgNode> {
        Vec::new()
    }
}

pub struct InterSolver<'a, A: InterDataflowAnalysis> {
    icfg: &'a Icfg,
    analysis: A,
}

impl<'a, A: InterDataflowAnalysis> InterSolver<'a, A> {
    pub fn new(icfg: &'a Icfg, analysis: A) -> Self {
        InterSolver { icfg, analysis }
    }

    pub fn solve(&mut self, entry: MethodId) -> DataflowResult<IcfgNode, A::Fact> {
        let mut result = DataflowResult::new();
        let boundary = IcfgNode::Entry(entry);
        assert!(
            self.icfg.contains(boundary),
            "the icfg has no entry node for the entry method"
        );

        for node in self.icfg.nodes() {
            result.set_in(node, self.analysis.new_initial_fact());
            result.set_out(node, self.analysis.new_initial_fact());
        }
        let boundary_fact = self.analysis.new_boundary_fact(entry);
        result.set_out(boundary, boundary_fact);

        let mut worklist: VecDeque<IcfgNode> =
            self.icfg.nodes().filter(|n| *n != boundary).collect();
        let mut iterations = 0usize;
        while let Some(node) = worklist.pop_front() {
            iterations += 1;
            let mut in_fact = self.analysis.new_initial_fact();
            for (src, kind) in self.icfg.in_edges(node) {
                let edge_fact = self.analysis.transfer_edge(kind, result.out_fact(src));
                self.analysis.meet_into(&edge_fact, &mut in_fact);
            }
            let mut out_fact = result.out_fact(node).clone();
            let changed = self.analysis.transfer_node(node, &in_fact, &mut out_fact);
            result.set_in(node, in_fact);
            result.set_out(node, out_fact);
            if changed {
                for succ in self.icfg.succs(node) {
                    if succ != boundary && !worklist.contains(&succ) {
                        worklist.push_back(succ);
                    }
                }
            }
            for pending in self.analysis.pending_nodes() {
                if pending != boundary && !worklist.contains(&pending) {
                    worklist.push_back(pending);
                }
            }
        }
        trace!("inter-procedural solver finished after {} pops", iterations);
        result
    }
}
