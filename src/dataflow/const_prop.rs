// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Intra-procedural constant propagation.

use super::analysis::DataflowAnalysis;
use super::fact::CpFact;
use super::lattice::CpValue;
use crate::graph::cfg::{Cfg, CfgNode};
use crate::ir::{Atom, BinaryOp, Exp, Program, Stmt};

pub struct ConstProp<'a> {
    program: &'a Program,
}

impl<'a> ConstProp<'a> {
    pub fn new(program: &'a Program) -> Self {
        ConstProp { program }
    }
}

impl<'a> DataflowAnalysis for ConstProp<'a> {
    type Fact = CpFact;

    fn is_forward(&self) -> bool {
        true
    }

    /// Every integer-typed parameter is bound to `Nac` at the entry.
    fn new_boundary_fact(&self, cfg: &Cfg) -> CpFact {
        let mut fact = CpFact::new();
        for &param in &self.program.method(cfg.method).params {
            if self.program.can_hold_int(param) {
                fact.update(param, CpValue::Nac);
            }
        }
        fact
    }

    fn new_initial_fact(&self) -> CpFact {
        CpFact::new()
    }

    fn meet_into(&self, fact: &CpFact, target: &mut CpFact) -> bool {
        let mut changed = false;
        for (&var, &value) in fact.iter() {
            changed |= target.update(var, target.get(var).meet(value));
        }
        changed
    }

    fn transfer_node(&self, node: CfgNode, input: &CpFact, output: &mut CpFact) -> bool {
        match node {
            CfgNode::Stmt(stmt) => {
                transfer_stmt(self.program, &self.program.stmt(stmt).kind, input, output)
            }
            // Entry and exit transfer identically.
            _ => {
                let changed = output != input;
                if changed {
                    *output = input.clone();
                }
                changed
            }
        }
    }
}

/// The statement transfer function, shared with the inter-procedural
/// variant. `OUT = IN` except that a definition of an integer-typed
/// variable rebinds it to the evaluated right-hand side.
pub fn transfer_stmt(program: &Program, stmt: &Stmt, input: &CpFact, output: &mut CpFact) -> bool {
    let mut new_out = input.clone();
    if let Some(lhs) = stmt.def_var() {
        if program.can_hold_int(lhs) {
            let value = match stmt {
                Stmt::Assign { rhs, .. } => evaluate(rhs, input),
                // Loads, allocations and invoke results are opaque.
                _ => CpValue::Nac,
            };
            new_out.update(lhs, value);
        }
    }
    let changed = *output != new_out;
    if changed {
        *output = new_out;
    }
    changed
}

/// Evaluates an expression against a fact.
pub fn evaluate(exp: &Exp, fact: &CpFact) -> CpValue {
    match exp {
        Exp::Int(v) => CpValue::Const(*v),
        Exp::Var(var) => fact.get(*var),
        Exp::Cast { .. } => CpValue::Nac,
        Exp::Binary { op, lhs, rhs } => {
            let v1 = atom_value(*lhs, fact);
            let v2 = atom_value(*rhs, fact);
            // A division or remainder by a known zero never commits to a
            // value; the result stays Undef regardless of the dividend.
            if op.may_trap() && v2 == CpValue::Const(0) {
                return CpValue::Undef;
            }
            match (v1, v2) {
                (CpValue::Const(a), CpValue::Const(b)) => CpValue::Const(compute(*op, a, b)),
                (CpValue::Nac, _) | (_, CpValue::Nac) => CpValue::Nac,
                _ => CpValue::Undef,
            }
        }
    }
}

fn atom_value(atom: Atom, fact: &CpFact) -> CpValue {
    match atom {
        Atom::Var(var) => fact.get(var),
        Atom::Int(v) => CpValue::Const(v),
    }
}

/// Two's-complement 32-bit arithmetic; shifts are masked to 5 bits and
/// comparisons yield 0/1.
fn compute(op: BinaryOp, a: i32, b: i32) -> i32 {
    match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => a.wrapping_div(b),
        BinaryOp::Rem => a.wrapping_rem(b),
        BinaryOp::Shl => a.wrapping_shl(b as u32),
        BinaryOp::Shr => a.wrapping_shr(b as u32),
        BinaryOp::Ushr => ((a as u32) >> (b as u32 & 31)) as i32,
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::Eq => (a == b) as i32,
        BinaryOp::Ne => (a != b) as i32,
        BinaryOp::Lt => (a < b) as i32,
        BinaryOp::Le => (a <= b) as i32,
        BinaryOp::Gt => (a > b) as i32,
        BinaryOp::Ge => (a >= b) as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::solver::WorklistSolver;
    use crate::ir::{MethodId, StmtId, VarId};

    struct Setup {
        program: Program,
        method: MethodId,
    }

    fn setup() -> Setup {
        let mut program = Program::new();
        let class = program.add_class("Main", None);
        let int_ty = program.int_ty();
        let method = program.add_method(class, "void main()", true, Some(int_ty));
        program.set_entry(method);
        Setup { program, method }
    }

    fn int_var(setup: &mut Setup, name: &str) -> VarId {
        let ty = setup.program.int_ty();
        setup.program.new_var(setup.method, name, ty)
    }

    fn assign(setup: &mut Setup, lhs: VarId, rhs: Exp) -> StmtId {
        setup.program.add_stmt(setup.method, Stmt::Assign { lhs, rhs })
    }

    #[test]
    fn propagates_constants_through_arithmetic() {
        // a = 1; b = 2; c = a + b;
        let mut s = setup();
        let a = int_var(&mut s, "a");
        let b = int_var(&mut s, "b");
        let c = int_var(&mut s, "c");
        assign(&mut s, a, Exp::Int(1));
        assign(&mut s, b, Exp::Int(2));
        let add = assign(
            &mut s,
            c,
            Exp::Binary {
                op: BinaryOp::Add,
                lhs: Atom::Var(a),
                rhs: Atom::Var(b),
            },
        );

        let cfg = Cfg::new_linear(&s.program, s.method);
        let result = WorklistSolver::new(ConstProp::new(&s.program)).solve(&cfg);
        let out = result.out_fact(CfgNode::Stmt(add));
        assert_eq!(out.get(c), CpValue::Const(3));
        assert_eq!(out.get(a), CpValue::Const(1));
        assert_eq!(out.get(b), CpValue::Const(2));
    }

    #[test]
    fn division_by_constant_zero_is_undef() {
        // a = 1; b = 0; c = a / b;
        let mut s = setup();
        let a = int_var(&mut s, "a");
        let b = int_var(&mut s, "b");
        let c = int_var(&mut s, "c");
        assign(&mut s, a, Exp::Int(1));
        assign(&mut s, b, Exp::Int(0));
        let div = assign(
            &mut s,
            c,
            Exp::Binary {
                op: BinaryOp::Div,
                lhs: Atom::Var(a),
                rhs: Atom::Var(b),
            },
        );

        let cfg = Cfg::new_linear(&s.program, s.method);
        let result = WorklistSolver::new(ConstProp::new(&s.program)).solve(&cfg);
        assert_eq!(
            result.out_fact(CfgNode::Stmt(div)).get(c),
            CpValue::Undef
        );
    }

    #[test]
    fn parameters_start_as_nac() {
        let mut s = setup();
        let p = int_var(&mut s, "p");
        let x = int_var(&mut s, "x");
        s.program.set_params(s.method, vec![p]);
        let copy = assign(&mut s, x, Exp::Var(p));

        let cfg = Cfg::new_linear(&s.program, s.method);
        let result = WorklistSolver::new(ConstProp::new(&s.program)).solve(&cfg);
        assert_eq!(result.out_fact(CfgNode::Stmt(copy)).get(x), CpValue::Nac);
    }

    #[test]
    fn nac_meets_constant_through_join() {
        // if (p) { x = 1 } else { x = p }; y = x;
        let mut s = setup();
        let p = int_var(&mut s, "p");
        let x = int_var(&mut s, "x");
        let y = int_var(&mut s, "y");
        s.program.set_params(s.method, vec![p]);
        let branch = s.program.add_stmt(
            s.method,
            Stmt::If {
                cond: Exp::Binary {
                    op: BinaryOp::Gt,
                    lhs: Atom::Var(p),
                    rhs: Atom::Int(0),
                },
            },
        );
        let then_stmt = assign(&mut s, x, Exp::Int(1));
        let else_stmt = assign(&mut s, x, Exp::Var(p));
        let join = assign(&mut s, y, Exp::Var(x));

        use crate::graph::cfg::CfgEdgeKind::*;
        let mut cfg = Cfg::new(s.method);
        cfg.add_edge(CfgNode::Entry, CfgNode::Stmt(branch), Fallthrough);
        cfg.add_edge(CfgNode::Stmt(branch), CfgNode::Stmt(then_stmt), IfTrue);
        cfg.add_edge(CfgNode::Stmt(branch), CfgNode::Stmt(else_stmt), IfFalse);
        cfg.add_edge(CfgNode::Stmt(then_stmt), CfgNode::Stmt(join), Fallthrough);
        cfg.add_edge(CfgNode::Stmt(else_stmt), CfgNode::Stmt(join), Fallthrough);
        cfg.add_edge(CfgNode::Stmt(join), CfgNode::Exit, Fallthrough);

        let result = WorklistSolver::new(ConstProp::new(&s.program)).solve(&cfg);
        assert_eq!(result.out_fact(CfgNode::Stmt(join)).get(y), CpValue::Nac);
        // The in-fact of the join is the meet of both branch outs.
        assert_eq!(result.in_fact(CfgNode::Stmt(join)).get(x), CpValue::Nac);
    }

    #[test]
    fn converges_on_loops() {
        // x = 0; loop: if (p > 0) { x = x + 1; goto loop }; y = x;
        let mut s = setup();
        let p = int_var(&mut s, "p");
        let x = int_var(&mut s, "x");
        let y = int_var(&mut s, "y");
        s.program.set_params(s.method, vec![p]);
        let init = assign(&mut s, x, Exp::Int(0));
        let branch = s.program.add_stmt(
            s.method,
            Stmt::If {
                cond: Exp::Binary {
                    op: BinaryOp::Gt,
                    lhs: Atom::Var(p),
                    rhs: Atom::Int(0),
                },
            },
        );
        let inc = assign(
            &mut s,
            x,
            Exp::Binary {
                op: BinaryOp::Add,
                lhs: Atom::Var(x),
                rhs: Atom::Int(1),
            },
        );
        let after = assign(&mut s, y, Exp::Var(x));

        use crate::graph::cfg::CfgEdgeKind::*;
        let mut cfg = Cfg::new(s.method);
        cfg.add_edge(CfgNode::Entry, CfgNode::Stmt(init), Fallthrough);
        cfg.add_edge(CfgNode::Stmt(init), CfgNode::Stmt(branch), Fallthrough);
        cfg.add_edge(CfgNode::Stmt(branch), CfgNode::Stmt(inc), IfTrue);
        cfg.add_edge(CfgNode::Stmt(inc), CfgNode::Stmt(branch), Goto);
        cfg.add_edge(CfgNode::Stmt(branch), CfgNode::Stmt(after), IfFalse);
        cfg.add_edge(CfgNode::Stmt(after), CfgNode::Exit, Fallthrough);

        let result = WorklistSolver::new(ConstProp::new(&s.program)).solve(&cfg);
        // The loop-carried value collapses to Nac at the join.
        assert_eq!(result.in_fact(CfgNode::Stmt(branch)).get(x), CpValue::Nac);
        assert_eq!(result.out_fact(CfgNode::Stmt(after)).get(y), CpValue::Nac);
        // IN[n] is consistent with the meet of the predecessors' OUT.
        let analysis = ConstProp::new(&s.program);
        for node in cfg.nodes() {
            if node == CfgNode::Entry {
                continue;
            }
            let mut expected = analysis.new_initial_fact();
            for pred in cfg.preds(node) {
                analysis.meet_into(result.out_fact(pred), &mut expected);
            }
            assert_eq!(*result.in_fact(node), expected);
        }
    }

    #[test]
    fn transfer_is_idempotent_on_unchanged_input() {
        let mut s = setup();
        let a = int_var(&mut s, "a");
        let stmt = Stmt::Assign {
            lhs: a,
            rhs: Exp::Int(5),
        };
        let mut input = CpFact::new();
        input.update(a, CpValue::Nac);
        let mut output = CpFact::new();
        assert!(transfer_stmt(&s.program, &stmt, &input, &mut output));
        let snapshot = output.clone();
        assert!(!transfer_stmt(&s.program, &stmt, &input, &mut output));
        assert_eq!(output, snapshot);
    }

    #[test]
    fn wrapping_and_shift_semantics() {
        let fact = CpFact::new();
        let eval = |op, a, b| {
            evaluate(
                &Exp::Binary {
                    op,
                    lhs: Atom::Int(a),
                    rhs: Atom::Int(b),
                },
                &fact,
            )
        };
        assert_eq!(eval(BinaryOp::Add, i32::MAX, 1), CpValue::Const(i32::MIN));
        assert_eq!(eval(BinaryOp::Shl, 1, 33), CpValue::Const(2));
        assert_eq!(eval(BinaryOp::Ushr, -1, 28), CpValue::Const(15));
        assert_eq!(eval(BinaryOp::Eq, 3, 3), CpValue::Const(1));
        assert_eq!(eval(BinaryOp::Rem, 7, 0), CpValue::Undef);
    }
}
