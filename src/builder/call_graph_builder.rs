// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! This module provides essential functions for resolving call targets,
//! plus the class-hierarchy-analysis call graph builder.

use std::collections::{HashSet, VecDeque};

use log::*;

use crate::graph::call_graph::CallGraph;
use crate::ir::{CallKind, ClassId, InvokeExp, MethodId, Program, Stmt, StmtId, SubsigId};

/// Dispatches a subsignature from `class` upwards: returns the first
/// non-abstract declared method along the superclass chain, if any.
pub fn dispatch(program: &Program, class: ClassId, subsig: SubsigId) -> Option<MethodId> {
    let mut current = Some(class);
    while let Some(c) = current {
        if let Some(method) = program.get_declared_method(c, subsig) {
            if !program.method(method).is_abstract {
                return Some(method);
            }
        }
        current = program.super_class(c);
    }
    None
}

/// Resolves the single callee of a call site given the receiver's dynamic
/// class (ignored for static and special calls).
///
/// Returns `None` when no dispatch target exists; such call sites
/// contribute nothing to the call graph.
pub fn resolve_callee(
    program: &Program,
    recv_class: Option<ClassId>,
    invoke: &InvokeExp,
) -> Option<MethodId> {
    match invoke.kind {
        CallKind::Static => program.get_declared_method(invoke.decl_class, invoke.subsig),
        CallKind::Special => dispatch(program, invoke.decl_class, invoke.subsig),
        CallKind::Virtual | CallKind::Interface => {
            recv_class.and_then(|class| dispatch(program, class, invoke.subsig))
        }
    }
}

/// Builds a call graph by class hierarchy analysis: virtual dispatch is
/// over-approximated by the static sub-hierarchy of the declared class.
pub struct ChaBuilder<'a> {
    program: &'a Program,
}

impl<'a> ChaBuilder<'a> {
    pub fn new(program: &'a Program) -> Self {
        ChaBuilder { program }
    }

    pub fn build(&self) -> CallGraph<MethodId, StmtId> {
        let mut call_graph = CallGraph::new();
        let entry = self
            .program
            .entry()
            .expect("the program has no entry method");
        call_graph.add_node(entry);

        let mut rm_iter = call_graph.reach_methods_iter();
        while let Some(method) = rm_iter.next() {
            for &stmt in &self.program.method(method).body {
                let Stmt::Invoke { exp, .. } = &self.program.stmt(stmt).kind else {
                    continue;
                };
                for callee in self.resolve(exp) {
                    call_graph.add_edge(stmt, method, callee, exp.kind);
                }
            }
        }

        debug!(
            "CHA call graph: {} reachable methods",
            call_graph.num_reachable()
        );
        call_graph
    }

    /// Resolves all possible targets of a call site.
    fn resolve(&self, invoke: &InvokeExp) -> Vec<MethodId> {
        match invoke.kind {
            CallKind::Static | CallKind::Special => {
                resolve_callee(self.program, None, invoke).into_iter().collect()
            }
            CallKind::Virtual | CallKind::Interface => {
                // BFS over the sub-hierarchy of the declared class; every
                // visited class dispatches the subsignature upwards.
                let mut targets = Vec::new();
                let mut seen_targets = HashSet::new();
                let mut visited = HashSet::new();
                let mut queue = VecDeque::new();
                queue.push_back(invoke.decl_class);
                while let Some(class) = queue.pop_front() {
                    if !visited.insert(class) {
                        continue;
                    }
                    if self.program.is_interface(class) {
                        queue.extend(self.program.direct_subinterfaces_of(class));
                        queue.extend(self.program.direct_implementors_of(class));
                    } else {
                        queue.extend(self.program.direct_subclasses_of(class));
                        if let Some(target) = dispatch(self.program, class, invoke.subsig) {
                            if seen_targets.insert(target) {
                                targets.push(target);
                            }
                        }
                    }
                }
                targets
            }
        }
    }
}
