// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Dead-code detection: statements that are unreachable under
//! constant-folded branches, or assignments whose result is never used.

use std::collections::{BTreeSet, HashSet, VecDeque};

use super::const_prop::{evaluate, ConstProp};
use super::lattice::CpValue;
use super::live_vars::LiveVars;
use super::solver::{IterativeSolver, WorklistSolver};
use crate::graph::cfg::{Cfg, CfgEdgeKind, CfgNode};
use crate::ir::{Exp, Program, Stmt, StmtId};

pub struct DeadCodeDetection<'a> {
    program: &'a Program,
}

impl<'a> DeadCodeDetection<'a> {
    pub fn new(program: &'a Program) -> Self {
        DeadCodeDetection { program }
    }

    /// Returns the dead statements of the method, in statement-index order.
    pub fn analyze(&self, cfg: &Cfg) -> BTreeSet<StmtId> {
        let cp = WorklistSolver::new(ConstProp::new(self.program)).solve(cfg);
        let live = IterativeSolver::new(LiveVars::new(self.program)).solve(cfg);

        let mut live_stmts: HashSet<StmtId> = HashSet::new();
        let mut visited: HashSet<CfgNode> = HashSet::new();
        let mut queue: VecDeque<CfgNode> = VecDeque::new();
        queue.push_back(CfgNode::Entry);

        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            let stmt_id = match node {
                CfgNode::Entry => {
                    queue.extend(cfg.succs(node));
                    continue;
                }
                CfgNode::Exit => continue,
                CfgNode::Stmt(stmt) => stmt,
            };

            match &self.program.stmt(stmt_id).kind {
                Stmt::If { cond } => {
                    live_stmts.insert(stmt_id);
                    match evaluate(cond, cp.in_fact(node)) {
                        CpValue::Const(c) => {
                            let taken = if c == 0 {
                                CfgEdgeKind::IfFalse
                            } else {
                                CfgEdgeKind::IfTrue
                            };
                            for (succ, kind) in cfg.out_edges(node) {
                                if kind == taken {
                                    queue.push_back(succ);
                                }
                            }
                        }
                        // A non-constant condition keeps both branches.
                        _ => queue.extend(cfg.succs(node)),
                    }
                }
                Stmt::Switch { var } => {
                    live_stmts.insert(stmt_id);
                    match cp.in_fact(node).get(*var) {
                        CpValue::Const(c) => {
                            let edges = cfg.out_edges(node);
                            let case = edges
                                .iter()
                                .find(|(_, kind)| *kind == CfgEdgeKind::SwitchCase(c));
                            let target = case.or_else(|| {
                                edges
                                    .iter()
                                    .find(|(_, kind)| *kind == CfgEdgeKind::SwitchDefault)
                            });
                            if let Some((succ, _)) = target {
                                queue.push_back(*succ);
                            }
                        }
                        _ => queue.extend(cfg.succs(node)),
                    }
                }
                Stmt::Assign { lhs, rhs } => {
                    // An assignment to a variable that is not live afterwards
                    // is dead unless its right-hand side has an observable
                    // side effect.
                    if live.out_fact(node).contains(*lhs) || has_side_effect(rhs) {
                        live_stmts.insert(stmt_id);
                    }
                    queue.extend(cfg.succs(node));
                }
                _ => {
                    live_stmts.insert(stmt_id);
                    queue.extend(cfg.succs(node));
                }
            }
        }

        cfg.stmts().filter(|s| !live_stmts.contains(s)).collect()
    }
}

/// A pure expression has no observable side effect; casts may fail and
/// division/remainder may trap on zero.
fn has_side_effect(exp: &Exp) -> bool {
    match exp {
        Exp::Cast { .. } => true,
        Exp::Binary { op, .. } => op.may_trap(),
        Exp::Int(_) | Exp::Var(_) => false,
    }
}
