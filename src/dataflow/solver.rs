// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Fixed-point solvers for the intra-procedural analyses.

use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

use log::*;

use super::analysis::DataflowAnalysis;
use crate::graph::cfg::{Cfg, CfgNode};

/// Per-node IN and OUT facts at the fixed point, shared between the
/// intra-procedural solvers (CFG nodes) and the inter-procedural solver
/// (ICFG nodes).
#[derive(Debug)]
pub struct DataflowResult<Node, Fact> {
    in_facts: HashMap<Node, Fact>,
    out_facts: HashMap<Node, Fact>,
}

impl<Node: Copy + Eq + Hash + Debug, Fact> DataflowResult<Node, Fact> {
    pub(crate) fn new() -> Self {
        DataflowResult {
            in_facts: HashMap::new(),
            out_facts: HashMap::new(),
        }
    }

    pub fn in_fact(&self, node: Node) -> &Fact {
        self.in_facts
            .get(&node)
            .unwrap_or_else(|| panic!("no in fact for {:?}", node))
    }

    pub fn out_fact(&self, node: Node) -> &Fact {
        self.out_facts
            .get(&node)
            .unwrap_or_else(|| panic!("no out fact for {:?}", node))
    }

    pub(crate) fn set_in(&mut self, node: Node, fact: Fact) {
        self.in_facts.insert(node, fact);
    }

    pub(crate) fn set_out(&mut self, node: Node, fact: Fact) {
        self.out_facts.insert(node, fact);
    }
}

/// Worklist solver for forward analyses.
///
/// Converges because the lattices have finite ascending chains and the
/// transfers are monotone.
pub struct WorklistSolver<A> {
    analysis: A,
}

impl<A: DataflowAnalysis> WorklistSolver<A> {
    /// Panics if handed a backward analysis; the mismatch is a bug in the
    /// caller, reported once at construction.
    pub fn new(analysis: A) -> Self {
        assert!(
            analysis.is_forward(),
            "the worklist solver only supports forward analyses"
        );
        WorklistSolver { analysis }
    }

    pub fn analysis(&self) -> &A {
        &self.analysis
    }

    pub fn solve(&self, cfg: &Cfg) -> DataflowResult<CfgNode, A::Fact> {
        let mut result = DataflowResult::new();

        // OUT[entry] is the boundary fact; all other facts start at the
        // initial (bottom) element.
        for node in cfg.nodes() {
            result.set_in(node, self.analysis.new_initial_fact());
            let out = if node == CfgNode::Entry {
                self.analysis.new_boundary_fact(cfg)
            } else {
                self.analysis.new_initial_fact()
            };
            result.set_out(node, out);
        }

        let mut worklist: VecDeque<CfgNode> =
            cfg.nodes().filter(|n| *n != CfgNode::Entry).collect();
        let mut iterations = 0usize;
        while let Some(node) = worklist.pop_front() {
            iterations += 1;
            // IN[n] is recomputed fresh as the meet over predecessors; an
            // empty meet yields the initial fact.
            let mut in_fact = self.analysis.new_initial_fact();
            for pred in cfg.preds(node) {
                self.analysis.meet_into(result.out_fact(pred), &mut in_fact);
            }
            let mut out_fact = result.out_fact(node).clone();
            let changed = self.analysis.transfer_node(node, &in_fact, &mut out_fact);
            result.set_in(node, in_fact);
            result.set_out(node, out_fact);
            if changed {
                for succ in cfg.succs(node) {
                    if succ != CfgNode::Entry && !worklist.contains(&succ) {
                        worklist.push_back(succ);
                    }
                }
            }
        }
        trace!("forward worklist solver finished after {} pops", iterations);
        result
    }
}

/// Iterative solver for backward analyses: repeats full passes over the
/// CFG until no transfer reports a change.
pub struct IterativeSolver<A> {
    analysis: A,
}

impl<A: DataflowAnalysis> IterativeSolver<A> {
    /// Panics if handed a forward analysis; the mismatch is a bug in the
    /// caller, reported once at construction.
    pub fn new(analysis: A) -> Self {
        assert!(
            !analysis.is_forward(),
            "the iterative solver only supports backward analyses"
        );
        IterativeSolver { analysis }
    }

    pub fn analysis(&self) -> &A {
        &self.analysis
    }

    pub fn solve(&self, cfg: &Cfg) -> DataflowResult<CfgNode, A::Fact> {
        let mut result = DataflowResult::new();

        // IN[exit] is the boundary fact of a backward analysis.
        for node in cfg.nodes() {
            result.set_out(node, self.analysis.new_initial_fact());
            let in_fact = if node == CfgNode::Exit {
                self.analysis.new_boundary_fact(cfg)
            } else {
                self.analysis.new_initial_fact()
            };
            result.set_in(node, in_fact);
        }

        let nodes: Vec<CfgNode> = cfg.nodes().filter(|n| *n != CfgNode::Exit).collect();
        let mut passes = 0usize;
        loop {
            passes += 1;
            let mut changed = false;
            for &node in &nodes {
                // OUT[n] = ⊓ IN[succs]
                let mut out_fact = self.analysis.new_initial_fact();
                for succ in cfg.succs(node) {
                    self.analysis.meet_into(result.in_fact(succ), &mut out_fact);
                }
                let mut in_fact = result.in_fact(node).clone();
                changed |= self.analysis.transfer_node(node, &out_fact, &mut in_fact);
                result.set_out(node, out_fact);
                result.set_in(node, in_fact);
            }
            if !changed {
                break;
            }
        }
        trace!("backward iterative solver finished after {} passes", passes);
        result
    }
}
