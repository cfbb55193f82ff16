// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Builds the pointer-flow fragment for a single method.
//!
//! The fragment is part of the PFG for the whole program. Only the
//! receiver-independent facts are collected here; instance field/array
//! accesses and instance calls are wired lazily by the solvers.

use log::*;

use crate::graph::func_pfg::FuncPfg;
use crate::ir::{CallKind, Exp, FieldAccess, MethodId, Program, Stmt};

/// A visitor that traverses the statements of a method's body and builds
/// the method's pointer-flow fragment.
pub struct FuncPfgBuilder<'a> {
    program: &'a Program,
    method: MethodId,
    fpfg: FuncPfg,
}

impl<'a> FuncPfgBuilder<'a> {
    pub fn new(program: &'a Program, method: MethodId) -> Self {
        debug!("Building FuncPfg for {}", program.method_sig(method));
        FuncPfgBuilder {
            program,
            method,
            fpfg: FuncPfg::new(),
        }
    }

    pub fn build(mut self) -> FuncPfg {
        for &stmt in &self.program.method(self.method).body {
            match &self.program.stmt(stmt).kind {
                Stmt::New { lhs, ty } => {
                    self.fpfg.allocs.push((*lhs, stmt, *ty));
                }
                Stmt::Assign { lhs, rhs } => {
                    // Only reference-typed copies move pointers.
                    let src = match rhs {
                        Exp::Var(src) => Some(*src),
                        Exp::Cast { arg, .. } => Some(*arg),
                        _ => None,
                    };
                    if let Some(src) = src {
                        if self.program.is_ref(src) && self.program.is_ref(*lhs) {
                            self.fpfg.copy_edges.push((src, *lhs));
                        }
                    }
                }
                Stmt::LoadField {
                    lhs,
                    access: FieldAccess::Static(field),
                } => {
                    if self.program.is_ref(*lhs) {
                        self.fpfg.static_loads.push((*field, *lhs));
                    }
                }
                Stmt::StoreField {
                    access: FieldAccess::Static(field),
                    rhs,
                } => {
                    if self.program.is_ref(*rhs) {
                        self.fpfg.static_stores.push((*rhs, *field));
                    }
                }
                Stmt::Invoke { exp, .. } => {
                    if exp.kind == CallKind::Static {
                        self.fpfg.static_callsites.push(stmt);
                    }
                }
                _ => {}
            }
        }
        self.fpfg
    }
}
