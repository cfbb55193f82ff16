// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Backward live-variable analysis.

use super::analysis::DataflowAnalysis;
use super::fact::SetFact;
use crate::graph::cfg::{Cfg, CfgNode};
use crate::ir::Program;

pub struct LiveVars<'a> {
    program: &'a Program,
}

impl<'a> LiveVars<'a> {
    pub fn new(program: &'a Program) -> Self {
        LiveVars { program }
    }
}

impl<'a> DataflowAnalysis for LiveVars<'a> {
    type Fact = SetFact;

    fn is_forward(&self) -> bool {
        false
    }

    fn new_boundary_fact(&self, _cfg: &Cfg) -> SetFact {
        SetFact::new()
    }

    fn new_initial_fact(&self) -> SetFact {
        SetFact::new()
    }

    fn meet_into(&self, fact: &SetFact, target: &mut SetFact) -> bool {
        target.union(fact)
    }

    /// `IN = (OUT \ defs) ∪ uses`. For this backward analysis `input` is
    /// the fact after the node and `output` the fact before it.
    fn transfer_node(&self, node: CfgNode, input: &SetFact, output: &mut SetFact) -> bool {
        let mut new_in = input.clone();
        if let CfgNode::Stmt(stmt) = node {
            let stmt = &self.program.stmt(stmt).kind;
            if let Some(def) = stmt.def_var() {
                new_in.remove(def);
            }
            for used in stmt.uses() {
                new_in.insert(used);
            }
        }
        let changed = *output != new_in;
        if changed {
            *output = new_in;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::solver::IterativeSolver;
    use crate::ir::{Exp, Stmt};

    #[test]
    fn redefined_variable_is_dead_before_redefinition() {
        // x = 5; x = 6; return x;
        let mut program = Program::new();
        let class = program.add_class("Main", None);
        let int_ty = program.int_ty();
        let method = program.add_method(class, "int main()", true, Some(int_ty));
        let x = program.new_var(method, "x", int_ty);
        let first = program.add_stmt(method, Stmt::Assign { lhs: x, rhs: Exp::Int(5) });
        let second = program.add_stmt(method, Stmt::Assign { lhs: x, rhs: Exp::Int(6) });
        let ret = program.add_stmt(method, Stmt::Return { var: Some(x) });

        let cfg = Cfg::new_linear(&program, method);
        let result = IterativeSolver::new(LiveVars::new(&program)).solve(&cfg);

        // x is not live after the first assignment, but live after the second.
        assert!(!result.out_fact(CfgNode::Stmt(first)).contains(x));
        assert!(result.out_fact(CfgNode::Stmt(second)).contains(x));
        assert!(result.in_fact(CfgNode::Stmt(ret)).contains(x));
    }
}
