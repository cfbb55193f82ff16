// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Context-sensitive inclusion-based points-to analysis.
//!
//! The solver mirrors the context-insensitive one, with every variable
//! qualified by the context of its enclosing method instance and every
//! object by a heap context chosen by the [`ContextStrategy`]. The taint
//! overlay observes call edges (sources, transfers) and the final
//! points-to sets (sinks).

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::time::Instant;

use log::*;

use super::context_strategy::ContextStrategy;
use super::taint::{TaintFlow, TaintPoint, TaintProcessor};
use super::{NodeId, PointerAnalysisResult, PointsTo};
use crate::builder::call_graph_builder;
use crate::builder::func_pfg_builder::FuncPfgBuilder;
use crate::graph::call_graph::CSCallGraph;
use crate::graph::func_pfg::FuncPfg;
use crate::graph::pfg::{CSPointer, Pfg};
use crate::heap::{CSObjId, HeapModel};
use crate::ir::context::ContextId;
use crate::ir::{
    CSCallSite, CSMethodId, CallKind, FieldAccess, InvokeExp, MethodId, Program, Stmt, StmtId,
    Type, TypeId, VarId,
};
use crate::pts_set::pt_data::PTData;
use crate::util::chunked_queue;

pub struct ContextSensitivePTA<'pta, S: ContextStrategy> {
    program: &'pta Program,
    /// The heap abstraction, owned by the analysis instance.
    pub heap: HeapModel,
    /// Pointer Flow Graph over context-qualified pointers.
    pfg: Pfg<CSPointer>,
    /// Points-to data
    pt_data: PTData<NodeId, CSObjId>,
    /// Context-sensitive call graph.
    pub call_graph: CSCallGraph,

    /// Pointer-flow fragments, built once per method and instantiated once
    /// per calling context.
    func_pfgs: HashMap<MethodId, FuncPfg>,
    /// Records the method instances that have been processed.
    processed_methods: HashSet<CSMethodId>,
    /// Iterator for reachable method instances.
    rm_iter: chunked_queue::IterCopied<CSMethodId>,

    /// Worklist of (pointer, delta points-to set) entries.
    worklist: VecDeque<(NodeId, PointsTo<CSObjId>)>,

    ctx_strategy: S,
    empty_cid: ContextId,

    /// Taint rules, if the overlay is enabled.
    taint: Option<TaintProcessor>,
    /// Registered taint transfer edges: when taint objects reach the key
    /// pointer, re-typed taint objects are forged at the targets.
    taint_transfers: HashMap<NodeId, Vec<(NodeId, TypeId)>>,
}

/// Constructor
impl<'pta, S: ContextStrategy> ContextSensitivePTA<'pta, S> {
    pub fn new(program: &'pta Program, mut ctx_strategy: S) -> Self {
        let call_graph = CSCallGraph::new();
        let rm_iter = call_graph.reach_methods_iter();
        let empty_cid = ctx_strategy.empty_context();
        ContextSensitivePTA {
            program,
            heap: HeapModel::new(),
            pfg: Pfg::new(),
            pt_data: PTData::new(),
            call_graph,
            func_pfgs: HashMap::new(),
            processed_methods: HashSet::new(),
            rm_iter,
            worklist: VecDeque::new(),
            ctx_strategy,
            empty_cid,
            taint: None,
            taint_transfers: HashMap::new(),
        }
    }

    /// Enables the taint overlay.
    pub fn set_taint(&mut self, taint: TaintProcessor) {
        self.taint = Some(taint);
    }

    /// Runs the analysis to completion.
    pub fn analyze(&mut self) {
        let now = Instant::now();
        self.initialize();
        self.propagate();
        info!(
            "context-sensitive analysis completed in {}, {} reachable method instances",
            humantime::format_duration(now.elapsed()),
            self.call_graph.num_reachable()
        );
    }

    fn initialize(&mut self) {
        let entry = self
            .program
            .entry()
            .expect("the program has no entry method");
        self.call_graph
            .add_node(CSMethodId::new(self.empty_cid, entry));
        self.process_reach_methods();
    }

    /// Process statements of newly reachable method instances.
    fn process_reach_methods(&mut self) {
        while let Some(cs_method) = self.rm_iter.next() {
            if self.processed_methods.insert(cs_method) {
                let fpfg = self.fpfg_of(cs_method.method);
                self.instantiate_fpfg(cs_method, &fpfg);
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

    /// Instantiates a method fragment under the instance's context.
    fn instantiate_fpfg(&mut self, cs_method: CSMethodId, fpfg: &FuncPfg) {
        let cid = cs_method.cid;
        for &(src, dst) in &fpfg.copy_edges {
            self.add_pfg_edge(CSPointer::Var(cid, src), CSPointer::Var(cid, dst));
        }
        for &(lhs, site, ty) in &fpfg.allocs {
            let obj = self.heap.get_obj(site, ty);
            let hctx = self.ctx_strategy.select_heap_context(cs_method, obj);
            let cs_obj = self.heap.get_cs_obj(hctx, obj);
            let node = self.pfg.get_or_insert_node(CSPointer::Var(cid, lhs));
            self.worklist.push_back((node, PointsTo::singleton(cs_obj)));
        }
        for &(field, dst) in &fpfg.static_loads {
            self.add_pfg_edge(CSPointer::StaticField(field), CSPointer::Var(cid, dst));
        }
        for &(src, field) in &fpfg.static_stores {
            self.add_pfg_edge(CSPointer::Var(cid, src), CSPointer::StaticField(field));
        }
        for &callsite in &fpfg.static_callsites {
            self.process_static_call(cs_method, callsite);
        }
    }

    fn process_static_call(&mut self, caller: CSMethodId, callsite: StmtId) {
        let (_, invoke) = self
            .program
            .stmt(callsite)
            .kind
            .as_invoke()
            .expect("static callsite is not an invoke statement");
        match call_graph_builder::resolve_callee(self.program, None, invoke) {
            Some(callee) => {
                let cs_site = CSCallSite::new(caller.cid, callsite);
                let callee_cid = self.ctx_strategy.select_static_context(cs_site, callee);
                let cs_callee = CSMethodId::new(callee_cid, callee);
                self.add_call_edge(cs_site, caller, cs_callee, CallKind::Static);
            }
            None => warn!(
                "no target for static call {:?} in {}",
                callsite,
                self.program.method_sig(caller.method)
            ),
        }
    }

    /// Adds a call edge; when the edge is new, the callee instance becomes
    /// reachable, arguments/returns are wired, and taint rules fire.
    fn add_call_edge(
        &mut self,
        cs_site: CSCallSite,
        caller: CSMethodId,
        cs_callee: CSMethodId,
        kind: CallKind,
    ) {
        if !self.call_graph.add_edge(cs_site, caller, cs_callee, kind) {
            return;
        }
        let program = self.program;
        let (result, invoke) = program
            .stmt(cs_site.stmt)
            .kind
            .as_invoke()
            .expect("call edge from a non-invoke statement");
        let callee_data = program.method(cs_callee.method);
        for (&arg, &param) in invoke.args.iter().zip(callee_data.params.iter()) {
            if program.is_ref(arg) && program.is_ref(param) {
                self.add_pfg_edge(
                    CSPointer::Var(cs_site.cid, arg),
                    CSPointer::Var(cs_callee.cid, param),
                );
            }
        }
        if let Some(result) = result {
            if program.is_ref(result) {
                for &ret_var in &callee_data.ret_vars {
                    if program.is_ref(ret_var) {
                        self.add_pfg_edge(
                            CSPointer::Var(cs_callee.cid, ret_var),
                            CSPointer::Var(cs_site.cid, result),
                        );
                    }
                }
            }
        }
        self.apply_taint_rules(cs_site, cs_callee.method);
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
            if let Some(transfers) = self.taint_transfers.get(&node) {
                let transfers = transfers.clone();
                for (target, ty) in transfers {
                    self.forge_taints(target, &delta, ty);
                }
            }
            if let CSPointer::Var(cid, var) = self.pfg.node_pointer(node) {
                for cs_obj in delta.iter() {
                    self.wire_instance_accesses(cid, var, cs_obj);
                    self.process_call(cid, var, cs_obj);
                }
            }
        }
    }

    /// Wires the instance field/array accesses of `var` against a newly
    /// discovered receiver object.
    fn wire_instance_accesses(&mut self, cid: ContextId, var: VarId, cs_obj: CSObjId) {
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
                self.add_pfg_edge(
                    CSPointer::Var(cid, *rhs),
                    CSPointer::InstanceField(cs_obj, *field),
                );
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
                self.add_pfg_edge(
                    CSPointer::InstanceField(cs_obj, *field),
                    CSPointer::Var(cid, *lhs),
                );
            }
        }
        for &stmt in &program.var(var).store_arrays {
            let Stmt::StoreArray { rhs, .. } = &program.stmt(stmt).kind else {
                unreachable!("indexed statement is not an array store");
            };
            if program.is_ref(*rhs) {
                self.add_pfg_edge(CSPointer::Var(cid, *rhs), CSPointer::ArrayIndex(cs_obj));
            }
        }
        for &stmt in &program.var(var).load_arrays {
            let Stmt::LoadArray { lhs, .. } = &program.stmt(stmt).kind else {
                unreachable!("indexed statement is not an array load");
            };
            if program.is_ref(*lhs) {
                self.add_pfg_edge(CSPointer::ArrayIndex(cs_obj), CSPointer::Var(cid, *lhs));
            }
        }
    }

    /// Resolves the instance calls on `var` against a newly discovered
    /// receiver object.
    fn process_call(&mut self, cid: ContextId, var: VarId, cs_obj: CSObjId) {
        let program = self.program;
        let (hctx, obj) = self.heap.cs_obj(cs_obj);
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
            let cs_site = CSCallSite::new(cid, callsite);
            let callee_cid =
                self.ctx_strategy
                    .select_instance_context(cs_site, (hctx, obj), callee);
            // The receiver flows into the callee's `this` regardless of
            // whether the call edge already existed.
            if let Some(this) = program.method(callee).this {
                let this_node = self
                    .pfg
                    .get_or_insert_node(CSPointer::Var(callee_cid, this));
                self.worklist
                    .push_back((this_node, PointsTo::singleton(cs_obj)));
            }
            let caller = CSMethodId::new(cid, program.stmt(callsite).method);
            let cs_callee = CSMethodId::new(callee_cid, callee);
            self.add_call_edge(cs_site, caller, cs_callee, invoke.kind);
        }
    }

    /// Adds a PFG edge and, when the edge is new, immediately pushes the
    /// source's current points-to set to the target.
    fn add_pfg_edge(&mut self, src: CSPointer, dst: CSPointer) {
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

    /// Fires the source and transfer taint rules for a new call edge.
    fn apply_taint_rules(&mut self, cs_site: CSCallSite, callee: MethodId) {
        let Some(taint) = &self.taint else {
            return;
        };
        let source_tys: Vec<TypeId> = taint.sources_for(callee).collect();
        let transfer_rules: Vec<(TaintPoint, TaintPoint, TypeId)> =
            taint.transfers_for(callee).collect();
        if source_tys.is_empty() && transfer_rules.is_empty() {
            return;
        }
        let (result, invoke) = self
            .program
            .stmt(cs_site.stmt)
            .kind
            .as_invoke()
            .expect("taint rule applied to a non-invoke statement");

        // Sources: materialize a taint object at the call site and enqueue
        // it into the result's points-to set.
        if let Some(result) = result {
            for ty in source_tys {
                let taint_obj = self.heap.get_taint_obj(cs_site.stmt, ty);
                let cs_taint = self.heap.get_cs_obj(self.empty_cid, taint_obj);
                let node = self
                    .pfg
                    .get_or_insert_node(CSPointer::Var(cs_site.cid, result));
                self.worklist.push_back((node, PointsTo::singleton(cs_taint)));
            }
        }

        // Transfers: taint objects reaching the `from` pointer forge
        // re-typed taint objects at the `to` pointer.
        for (from, to, ty) in transfer_rules {
            let Some(from_var) = taint_point_var(invoke, result, from) else {
                continue;
            };
            let Some(to_var) = taint_point_var(invoke, result, to) else {
                continue;
            };
            let from_node = self
                .pfg
                .get_or_insert_node(CSPointer::Var(cs_site.cid, from_var));
            let to_node = self
                .pfg
                .get_or_insert_node(CSPointer::Var(cs_site.cid, to_var));
            self.taint_transfers
                .entry(from_node)
                .or_default()
                .push((to_node, ty));
            if let Some(pts) = self.pt_data.get_pts(from_node) {
                let pts = pts.clone();
                self.forge_taints(to_node, &pts, ty);
            }
        }
    }

    /// Forges re-typed taint objects at `target` for every taint object in
    /// `pts`, preserving the originating source call site.
    fn forge_taints(&mut self, target: NodeId, pts: &PointsTo<CSObjId>, ty: TypeId) {
        for cs_obj in pts.iter() {
            let (_, obj) = self.heap.cs_obj(cs_obj);
            if let Some(site) = self.heap.taint_source(obj) {
                let forged = self.heap.get_taint_obj(site, ty);
                let cs_forged = self.heap.get_cs_obj(self.empty_cid, forged);
                self.worklist
                    .push_back((target, PointsTo::singleton(cs_forged)));
            }
        }
    }

    /// Scans the reachable call edges for sink rules and reports the taint
    /// flows in a stable order.
    pub fn taint_flows(&self) -> BTreeSet<TaintFlow> {
        let mut flows = BTreeSet::new();
        let Some(taint) = &self.taint else {
            return flows;
        };
        for (_, cs_site, _, cs_callee) in self.call_graph.edges() {
            for index in taint.sinks_for(cs_callee.method) {
                let (_, invoke) = self
                    .program
                    .stmt(cs_site.stmt)
                    .kind
                    .as_invoke()
                    .expect("call edge from a non-invoke statement");
                let Some(&arg) = invoke.args.get(index) else {
                    continue;
                };
                let Some(node) = self.pfg.get_node_id(&CSPointer::Var(cs_site.cid, arg)) else {
                    continue;
                };
                let Some(pts) = self.pt_data.get_pts(node) else {
                    continue;
                };
                for cs_obj in pts.iter() {
                    let (_, obj) = self.heap.cs_obj(cs_obj);
                    if let Some(source) = self.heap.taint_source(obj) {
                        flows.insert(TaintFlow {
                            source,
                            sink: cs_site.stmt,
                            index,
                        });
                    }
                }
            }
        }
        flows
    }

    /// Builds the exposed result: the context-sensitive points-to sets and
    /// their context-insensitive aggregation.
    pub fn result(&self) -> PointerAnalysisResult {
        let mut result = PointerAnalysisResult::new();
        for (node, pointer) in self.pfg.nodes() {
            if let CSPointer::Var(cid, var) = pointer {
                if let Some(pts) = self.pt_data.get_pts(node) {
                    if pts.is_empty() {
                        continue;
                    }
                    result.set_cs_var_pts(cid, var, pts.clone());
                    let mut ci_pts = PointsTo::new();
                    for cs_obj in pts.iter() {
                        ci_pts.insert(self.heap.cs_obj(cs_obj).1);
                    }
                    result.add_var_pts(var, &ci_pts);
                }
            }
        }
        result
    }
}

fn taint_point_var(
    invoke: &InvokeExp,
    result: Option<VarId>,
    point: TaintPoint,
) -> Option<VarId> {
    match point {
        TaintPoint::Base => invoke.base,
        TaintPoint::Result => result,
        TaintPoint::Arg(i) => invoke.args.get(i).copied(),
    }
}
