// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use super::call_site::CallKind;
use super::{ClassId, FieldId, SubsigId, TypeId, VarId};

/// Binary operators over integer-typed operands. Comparisons yield 0/1.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Ushr,
    And,
    Or,
    Xor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// Division and remainder may trap on a zero divisor, which makes them
    /// observable side effects for dead-code detection.
    pub fn may_trap(self) -> bool {
        matches!(self, BinaryOp::Div | BinaryOp::Rem)
    }
}

/// An atomic operand of a binary expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Atom {
    Var(VarId),
    Int(i32),
}

/// Right-hand-side expressions of `Assign` statements and `If` conditions.
/// Field accesses, array accesses and allocations are statement forms, not
/// expressions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Exp {
    Int(i32),
    Var(VarId),
    Binary { op: BinaryOp, lhs: Atom, rhs: Atom },
    Cast { ty: TypeId, arg: VarId },
}

impl Exp {
    fn collect_vars(&self, vars: &mut Vec<VarId>) {
        match self {
            Exp::Int(_) => {}
            Exp::Var(v) => vars.push(*v),
            Exp::Binary { lhs, rhs, .. } => {
                if let Atom::Var(v) = lhs {
                    vars.push(*v);
                }
                if let Atom::Var(v) = rhs {
                    vars.push(*v);
                }
            }
            Exp::Cast { arg, .. } => vars.push(*arg),
        }
    }
}

/// A field access: either a static field or an instance field reached
/// through a base variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldAccess {
    Static(FieldId),
    Instance { base: VarId, field: FieldId },
}

impl FieldAccess {
    pub fn field(&self) -> FieldId {
        match self {
            FieldAccess::Static(field) => *field,
            FieldAccess::Instance { field, .. } => *field,
        }
    }
}

/// A method invocation expression. The callee is named by its declaring
/// class and subsignature; dispatch resolves the actual target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvokeExp {
    pub kind: CallKind,
    pub decl_class: ClassId,
    pub subsig: SubsigId,
    /// The receiver variable; `None` for static calls.
    pub base: Option<VarId>,
    /// Ordered argument variables.
    pub args: Vec<VarId>,
}

/// Statement kinds of the IR.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    /// `x = e` where `e` is a literal, variable, binary or cast expression.
    Assign { lhs: VarId, rhs: Exp },
    /// `x = new T`; the allocation site is the statement itself.
    New { lhs: VarId, ty: TypeId },
    /// `x = o.f` or `x = T.f`.
    LoadField { lhs: VarId, access: FieldAccess },
    /// `o.f = y` or `T.f = y`.
    StoreField { access: FieldAccess, rhs: VarId },
    /// `x = a[i]`.
    LoadArray { lhs: VarId, base: VarId, index: VarId },
    /// `a[i] = y`.
    StoreArray { base: VarId, index: VarId, rhs: VarId },
    /// `x = o.m(...)` / `o.m(...)` / `T.m(...)`.
    Invoke {
        result: Option<VarId>,
        exp: InvokeExp,
    },
    /// Two-way branch; outgoing CFG edges carry the `IfTrue`/`IfFalse` kinds.
    If { cond: Exp },
    /// Unconditional jump; the target is an outgoing CFG edge.
    Goto,
    /// Multi-way branch on `var`; outgoing CFG edges carry the case values.
    Switch { var: VarId },
    Return { var: Option<VarId> },
    Nop,
}

impl Stmt {
    /// The variable defined by this statement, if any.
    pub fn def_var(&self) -> Option<VarId> {
        match self {
            Stmt::Assign { lhs, .. }
            | Stmt::New { lhs, .. }
            | Stmt::LoadField { lhs, .. }
            | Stmt::LoadArray { lhs, .. } => Some(*lhs),
            Stmt::Invoke { result, .. } => *result,
            _ => None,
        }
    }

    /// The variables used (read) by this statement.
    pub fn uses(&self) -> Vec<VarId> {
        let mut vars = Vec::new();
        match self {
            Stmt::Assign { rhs, .. } => rhs.collect_vars(&mut vars),
            Stmt::New { .. } | Stmt::Goto | Stmt::Nop => {}
            Stmt::LoadField { access, .. } => {
                if let FieldAccess::Instance { base, .. } = access {
                    vars.push(*base);
                }
            }
            Stmt::StoreField { access, rhs } => {
                if let FieldAccess::Instance { base, .. } = access {
                    vars.push(*base);
                }
                vars.push(*rhs);
            }
            Stmt::LoadArray { base, index, .. } => {
                vars.push(*base);
                vars.push(*index);
            }
            Stmt::StoreArray { base, index, rhs } => {
                vars.push(*base);
                vars.push(*index);
                vars.push(*rhs);
            }
            Stmt::Invoke { exp, .. } => {
                if let Some(base) = exp.base {
                    vars.push(base);
                }
                vars.extend(exp.args.iter().copied());
            }
            Stmt::If { cond } => cond.collect_vars(&mut vars),
            Stmt::Switch { var } => vars.push(*var),
            Stmt::Return { var } => {
                if let Some(var) = var {
                    vars.push(*var);
                }
            }
        }
        vars
    }

    pub fn as_invoke(&self) -> Option<(Option<VarId>, &InvokeExp)> {
        match self {
            Stmt::Invoke { result, exp } => Some((*result, exp)),
            _ => None,
        }
    }
}
