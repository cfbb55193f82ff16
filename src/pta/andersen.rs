// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Context-insensitive inclusion-based (Andersen) points-to analysis with
//! an on-the-fly call graph.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

use log::*;

use super::{NodeId, PointerAnalysisResult, PointsTo};
use crate::builder::call_graph_builder;
use crate::builder::func_pfg_builder::FuncPfgBuilder;
use crate::graph::call_graph::CallGraph;
use crate::graph::func_pfg::FuncPfg;
use crate::graph::pfg::{Pfg, Pointer};
use crate::heap::{HeapModel, ObjId};
use crate::ir::{CallKind, FieldAccess, MethodId, Program, Stmt, StmtId, Type, VarId};
use crate::pts_set::pt_data::PTData;
use crate::util::chunked_queue;

pub struct AndersenPTA<'pta> {
    program: &'pta Program,
    /// The heap abstraction, owned by the analysis instance.
    pub heap: HeapModel,
    /// Pointer Flow Graph
    pfg: Pfg<Pointer>,
    /// Points-to data
    pt_data: PTData<NodeId, ObjId>,
    /// Call graph, grown on demand while solving.
    pub call_graph: CallGraph<MethodId, StmtId>,

    /// Pointer-flow fragments, built once per method.
    func_pfgs: HashMap<MethodId, FuncPfg>,
    /// Records the methods that have been processed.
    processed_methods: HashSet<MethodId>,
    /// Iterator for reachable methods.
    rm_iter: chunked_queue::IterCopied<MethodId>,

    /// Worklist of (pointer, delta points-to set) entries.
    worklist: VecDeque<(NodeId, PointsTo<ObjId>)>,
}

/// Constructor
impl<'pta> AndersenPTA<'pta> {
    pub fn new(program: &'pta Program) -> Self {
        let call_graph = CallGraph::new();
        let rm_iter = call_graph.reach_methods_iter();
        AndersenPTA {
            program,
            heap: HeapModel::new(),
            pfg: Pfg::new(),
            pt_data: PTData::new(),
            call_graph,
            func_pfgs: HashMap::new(),
            processed_methods: HashSet::new(),
            rm_iter,
            worklist: VecDeque::new(),
        }
    }

    /// Runs the analysis to completion.
    pub fn analyze(&mut self) {
        let now = Instant::now();
        self.initialize();
        self.propagate();
        info!(
            "Andersen completed in {}, {} reachable methods",
            humantime::format_duration(now.elapsed()),
            self.call_graph.num_reachable()
        );
    }

    /// Initialize the analysis: the entry method is reachable, and its
    /// statements seed the worklist.
    fn initialize(&mut self) {
        let entry = self
            .program
            .entry()
            .expect("the program has no entry method");
        self.call_graph.add_node(entry);
        self.process_reach_methods();
    }

    /// Process statements of newly reachable methods.
    fn process_reach_methods(&mut self) {
        while let Some(method) = self.rm_iter.next() {
            if self.processed_methods.insert(method) {
                let fpfg = self.fpfg_of(method);
                self.instantiate_fpfg(method, &fpfg);
            }
        }
    }

    fn fpfg_of(&mut self, method: MethodId) -> FuncPfg {
        let program = self.program;
        self.func_pfgs
            .entry(method)
            .or_insert_with(|| FuncPfgBuilder::new(program, method).build())
            .clone()
    }

    /// Adds a method fragment's receiver-independent facts to the PFG.
    fn instantiate_fpfg(&mut self, method: MethodId, fpfg: &FuncPfg) {
        for &(src, dst) in &fpfg.copy_edges {
            self.add_pfg_edge(Pointer::Var(src), Pointer::Var(dst));
        }
        for &(lhs, site, ty) in &fpfg.allocs {
            let obj = self.heap.get_obj(site, ty);
            let node = self.pfg.get_or_insert_node(Pointer::Var(lhs));
            self.worklist.push_back((node, PointsTo::singleton(obj)));
        }
        for &(field, dst) in &fpfg.static_loads {
            self.add_pfg_edge(Pointer::StaticField(field), Pointer::Var(dst));
        }
        for &(src, field) in &fpfg.static_stores {
            self.add_pfg_edge(Pointer::Var(src), Pointer::StaticField(field));
        }
        for &callsite in &fpfg.static_callsites {
            self.process_static_call(method, callsite);
        }
    }

    fn process_static_call(&mut self, caller: MethodId, callsite: StmtId) {
        let (_, invoke) = self
            .program
            .stmt(callsite)
            .kind
            .as_invoke()
            .expect("static callsite is not an invoke statement");
        match call_graph_builder::resolve_callee(self.program, None, invoke) {
            Some(callee) => self.add_call_edge(callsite, caller, callee, CallKind::Static),
            None => warn!(
                "no target for static call {:?} in {}",
                callsite,
                self.program.method_sig(caller)
            ),
        }
    }

    /// Adds a call edge; when the edge is new, the callee becomes
    /// reachable and arguments/returns are wired into the PFG.
    fn add_call_edge(&mut self, callsite: StmtId, caller: MethodId, callee: MethodId, kind: CallKind) {
        if !self.call_graph.add_edge(callsite, caller, callee, kind) {
            return;
        }
        let program = self.program;
        let (result, invoke) = program
            .stmt(callsite)
            .kind
            .as_invoke()
            .expect("call edge from a non-invoke statement");
        let callee_data = program.method(callee);
        for (&arg, &param) in invoke.args.iter().zip(callee_data.params.iter()) {
            if program.is_ref(arg) && program.is_ref(param) {
                self.add_pfg_edge(Pointer::Var(arg), Pointer::Var(param));
            }
        }
        if let Some(result) = result {
            if program.is_ref(result) {
                for &ret_var in &callee_data.ret_vars {
                    if program.is_ref(ret_var) {
                        self.add_pfg_edge(Pointer::Var(ret_var), Pointer::Var(result));
                    }
                }
            }
        }
        self.process_reach_methods();
    }

    /// The main worklist loop.
    fn propagate(&mut self) {
        while let Some((node, pts)) = self.worklist.pop_front() {
            let delta = self.pt_data.diff_pts(node, &pts);
            if delta.is_empty() {
                continue;
            }
            self.pt_data.union_pts_to(node, &delta);
            for succ in self.pfg.succs(node) {
                self.worklist.push_back((succ, delta.clone()));
            }
            if let Pointer::Var(var) = self.pfg.node_pointer(node) {
                for obj in delta.iter() {
                    self.wire_instance_accesses(var, obj);
                    self.process_call(var, obj);
                }
            }
        }
    }

    /// Wires the instance field/array accesses of `var` against a newly
    /// discovered receiver object.
    fn wire_instance_accesses(&mut self, var: VarId, obj: ObjId) {
        let program = self.program;
        for &stmt in &program.var(var).store_fields {
            let Stmt::StoreField {
                access: FieldAccess::Instance { field, .. },
                rhs,
            } = &program.stmt(stmt).kind
            else {
                unreachable!("indexed statement is not an instance field store");
            };
            if program.is_ref(*rhs) {
                self.add_pfg_edge(Pointer::Var(*rhs), Pointer::InstanceField(obj, *field));
            }
        }
        for &stmt in &program.var(var).load_fields {
            let Stmt::LoadField {
                lhs,
                access: FieldAccess::Instance { field, .. },
            } = &program.stmt(stmt).kind
            else {
                unreachable!("indexed statement is not an instance field load");
            };
            if program.is_ref(*lhs) {
                self.add_pfg_edge(Pointer::InstanceField(obj, *field), Pointer::Var(*lhs));
            }
        }
        for &stmt in &program.var(var).store_arrays {
            let Stmt::StoreArray { rhs, .. } = &program.stmt(stmt).kind else {
                unreachable!("indexed statement is not an array store");
            };
            if program.is_ref(*rhs) {
                self.add_pfg_edge(Pointer::Var(*rhs), Pointer::ArrayIndex(obj));
            }
        }
        for &stmt in &program.var(var).load_arrays {
            let Stmt::LoadArray { lhs, .. } = &program.stmt(stmt).kind else {
                unreachable!("indexed statement is not an array load");
            };
            if program.is_ref(*lhs) {
                self.add_pfg_edge(Pointer::ArrayIndex(obj), Pointer::Var(*lhs));
            }
        }
    }

    /// Resolves the instance calls on `var` against a newly discovered
    /// receiver object.
    fn process_call(&mut self, var: VarId, obj: ObjId) {
        let program = self.program;
        let recv_class = match program.type_of(self.heap.obj(obj).ty) {
            Type::Class(class) => Some(class),
            _ => None,
        };
        for &callsite in &program.var(var).invokes {
            let (_, invoke) = program
                .stmt(callsite)
                .kind
                .as_invoke()
                .expect("indexed statement is not an invoke");
            let Some(callee) = call_graph_builder::resolve_callee(program, recv_class, invoke)
            else {
                continue;
            };
            // The receiver flows into the callee's `this` regardless of
            // whether the call edge already existed.
            if let Some(this) = program.method(callee).this {
                let this_node = self.pfg.get_or_insert_node(Pointer::Var(this));
                self.worklist.push_back((this_node, PointsTo::singleton(obj)));
            }
            let caller = program.stmt(callsite).method;
            self.add_call_edge(callsite, caller, callee, invoke.kind);
        }
    }

    /// Adds a PFG edge and, when the edge is new, immediately pushes the
    /// source's current points-to set to the target.
    fn add_pfg_edge(&mut self, src: Pointer, dst: Pointer) {
        let src_id = self.pfg.get_or_insert_node(src);
        let dst_id = self.pfg.get_or_insert_node(dst);
        if self.pfg.add_edge(src_id, dst_id) {
            if let Some(pts) = self.pt_data.get_pts(src_id) {
                if !pts.is_empty() {
                    self.worklist.push_back((dst_id, pts.clone()));
                }
            }
        }
    }

    /// Builds the exposed result from the solved points-to data.
    pub fn result(&self) -> PointerAnalysisResult {
        let mut result = PointerAnalysisResult::new();
        for (node, pointer) in self.pfg.nodes() {
            if let Pointer::Var(var) = pointer {
                if let Some(pts) = self.pt_data.get_pts(node) {
                    if !pts.is_empty() {
                        result.add_var_pts(var, pts);
                    }
                }
            }
        }
        result
    }

    /// Checks the inclusion invariant: after solving, the points-to set of
    /// every edge target includes the points-to set of its source. Intended
    /// for tests and debugging.
    pub fn check_inclusion(&self) -> bool {
        self.pfg.nodes().all(|(node, _)| {
            let src_pts = match self.pt_data.get_pts(node) {
                Some(pts) => pts,
                None => return true,
            };
            self.pfg.succs(node).into_iter().all(|succ| {
                self.pt_data
                    .get_pts(succ)
                    .map(|dst| dst.superset(src_pts))
                    .unwrap_or(src_pts.is_empty())
            })
        })
    }
}
