// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Inter-procedural constant propagation with alias-aware heap handling.
//!
//! The analysis consumes a points-to result to resolve field and array
//! loads through aliases: a store through one alias updates the abstract
//! heap location and re-enqueues every load of the same location through
//! any other alias.

use std::collections::HashMap;

use super::const_prop;
use super::fact::CpFact;
use super::lattice::CpValue;
use super::inter_solver::InterDataflowAnalysis;
use crate::graph::icfg::{IcfgEdgeKind, IcfgNode};
use crate::heap::ObjId;
use crate::ir::{FieldAccess, FieldId, MethodId, Program, Stmt, StmtId, VarId};
use crate::pta::PointerAnalysisResult;

/// Abstract heap locations. Array locations are additionally keyed by the
/// abstract index value; `Undef` indices are never stored.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum HeapKey {
    Instance(ObjId, FieldId),
    Static(FieldId),
    Array(ObjId, CpValue),
}

/// Auxiliary state owned by one solve invocation.
struct InterCpState {
    /// Abstract values of heap locations, only ever descending in the
    /// lattice.
    val_map: HashMap<HeapKey, CpValue>,
    /// For each object, the variables whose points-to set contains it.
    alias_map: HashMap<ObjId, Vec<VarId>>,
    /// For each static field, the load statements reading it.
    static_load_fields: HashMap<FieldId, Vec<StmtId>>,
    /// Load statements to re-process after a heap update.
    pending: Vec<IcfgNode>,
}

pub struct InterConstProp<'a> {
    program: &'a Program,
    pta: &'a PointerAnalysisResult,
    state: InterCpState,
}

impl<'a> InterConstProp<'a> {
    pub fn new(program: &'a Program, pta: &'a PointerAnalysisResult) -> Self {
        // The alias map is derived once from the points-to result.
        let mut alias_map: HashMap<ObjId, Vec<VarId>> = HashMap::new();
        for (var, pts) in pta.vars() {
            for obj in pts.iter() {
                alias_map.entry(obj).or_default().push(var);
            }
        }
        let mut static_load_fields: HashMap<FieldId, Vec<StmtId>> = HashMap::new();
        for stmt in program.all_stmts() {
            if let Stmt::LoadField {
                access: FieldAccess::Static(field),
                ..
            } = &program.stmt(stmt).kind
            {
                static_load_fields.entry(*field).or_default().push(stmt);
            }
        }
        InterConstProp {
            program,
            pta,
            state: InterCpState {
                val_map: HashMap::new(),
                alias_map,
                static_load_fields,
                pending: Vec::new(),
            },
        }
    }

    /// Meets `value` into the heap location; on change, re-enqueues every
    /// load statement that may observe the location.
    fn store(&mut self, key: HeapKey, value: CpValue) {
        let old = self
            .state
            .val_map
            .get(&key)
            .copied()
            .unwrap_or(CpValue::Undef);
        let new = old.meet(value);
        if new == old {
            return;
        }
        self.state.val_map.insert(key, new);
        let mut affected_loads: Vec<StmtId> = Vec::new();
        match key {
            HeapKey::Static(field) => {
                if let Some(loads) = self.state.static_load_fields.get(&field) {
                    affected_loads.extend(loads.iter().copied());
                }
            }
            HeapKey::Instance(obj, field) => {
                for &var in self.aliases_of(obj) {
                    for &load in &self.program.var(var).load_fields {
                        if self.load_field_of(load) == Some(field) {
                            affected_loads.push(load);
                        }
                    }
                }
            }
            HeapKey::Array(obj, _) => {
                for &var in self.aliases_of(obj) {
                    affected_loads.extend(self.program.var(var).load_arrays.iter().copied());
                }
            }
        }
        self.state
            .pending
            .extend(affected_loads.into_iter().map(IcfgNode::Stmt));
    }

    fn aliases_of(&self, obj: ObjId) -> &[VarId] {
        self.state
            .alias_map
            .get(&obj)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn load_field_of(&self, stmt: StmtId) -> Option<FieldId> {
        match &self.program.stmt(stmt).kind {
            Stmt::LoadField { access, .. } => Some(access.field()),
            _ => None,
        }
    }

    fn pts_of(&self, var: VarId) -> Vec<ObjId> {
        self.pta
            .points_to_set(var)
            .map(|pts| pts.iter().collect())
            .unwrap_or_default()
    }

    /// The value of a field load: the meet over the locations of all
    /// pointed-to objects.
    fn load_field_value(&self, access: &FieldAccess) -> CpValue {
        match access {
            FieldAccess::Static(field) => self
                .state
                .val_map
                .get(&HeapKey::Static(*field))
                .copied()
                .unwrap_or(CpValue::Undef),
            FieldAccess::Instance { base, field } => {
                let mut value = CpValue::Undef;
                for obj in self.pts_of(*base) {
                    if let Some(v) = self.state.val_map.get(&HeapKey::Instance(obj, *field)) {
                        value = value.meet(*v);
                    }
                }
                value
            }
        }
    }

    /// The value of an array load: the meet over all stored entries of the
    /// pointed-to objects whose index is compatible with the load index.
    fn load_array_value(&self, base: VarId, load_index: CpValue) -> CpValue {
        if load_index.is_undef() {
            return CpValue::Undef;
        }
        let mut value = CpValue::Undef;
        for obj in self.pts_of(base) {
            for (key, v) in &self.state.val_map {
                if let HeapKey::Array(stored_obj, stored_index) = key {
                    if *stored_obj == obj && index_compatible(*stored_index, load_index) {
                        value = value.meet(*v);
                    }
                }
            }
        }
        value
    }

    fn transfer_stmt(&mut self, stmt_id: StmtId, input: &CpFact, output: &mut CpFact) -> bool {
        let kind = &self.program.stmt(stmt_id).kind;
        match kind {
            // Call nodes transfer identically; the edges do the work.
            Stmt::Invoke { .. } => identity_transfer(input, output),
            Stmt::StoreField { access, rhs } => {
                if self.program.can_hold_int(*rhs) {
                    let value = input.get(*rhs);
                    match access {
                        FieldAccess::Static(field) => self.store(HeapKey::Static(*field), value),
                        FieldAccess::Instance { base, field } => {
                            for obj in self.pts_of(*base) {
                                self.store(HeapKey::Instance(obj, *field), value);
                            }
                        }
                    }
                }
                identity_transfer(input, output)
            }
            Stmt::StoreArray { base, index, rhs } => {
                if self.program.can_hold_int(*rhs) {
                    let index_value = input.get(*index);
                    // Undef indices denote dead accesses and are ignored.
                    if !index_value.is_undef() {
                        let value = input.get(*rhs);
                        for obj in self.pts_of(*base) {
                            self.store(HeapKey::Array(obj, index_value), value);
                        }
                    }
                }
                identity_transfer(input, output)
            }
            Stmt::LoadField { lhs, access } => {
                if self.program.can_hold_int(*lhs) {
                    let value = self.load_field_value(access);
                    let mut new_out = input.clone();
                    new_out.update(*lhs, value);
                    replace_if_changed(output, new_out)
                } else {
                    identity_transfer(input, output)
                }
            }
            Stmt::LoadArray { lhs, base, index } => {
                if self.program.can_hold_int(*lhs) {
                    let value = self.load_array_value(*base, input.get(*index));
                    let mut new_out = input.clone();
                    new_out.update(*lhs, value);
                    replace_if_changed(output, new_out)
                } else {
                    identity_transfer(input, output)
                }
            }
            _ => const_prop::transfer_stmt(self.program, kind, input, output),
        }
    }
}

impl<'a> InterDataflowAnalysis for InterConstProp<'a> {
    type Fact = CpFact;

    fn new_boundary_fact(&mut self, entry: MethodId) -> CpFact {
        let mut fact = CpFact::new();
        for &param in &self.program.method(entry).params {
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

    fn transfer_node(&mut self, node: IcfgNode, input: &CpFact, output: &mut CpFact) -> bool {
        match node {
            IcfgNode::Stmt(stmt) => self.transfer_stmt(stmt, input, output),
            _ => identity_transfer(input, output),
        }
    }

    fn transfer_edge(&mut self, kind: &IcfgEdgeKind, src_out: &CpFact) -> CpFact {
        match kind {
            IcfgEdgeKind::Normal => src_out.clone(),
            IcfgEdgeKind::CallToReturn { callsite } => {
                // The call site's LHS is rebound by the matching return
                // edge, so its caller-side binding is killed here.
                let mut fact = src_out.clone();
                if let Some((Some(result), _)) = self.program.stmt(*callsite).kind.as_invoke() {
                    fact.update(result, CpValue::Undef);
                }
                fact
            }
            IcfgEdgeKind::Call { callsite, callee } => {
                let mut fact = CpFact::new();
                let (_, invoke) = self
                    .program
                    .stmt(*callsite)
                    .kind
                    .as_invoke()
                    .expect("call edge from a non-invoke statement");
                let params = &self.program.method(*callee).params;
                for (&arg, &param) in invoke.args.iter().zip(params.iter()) {
                    if self.program.can_hold_int(param) {
                        fact.update(param, src_out.get(arg));
                    }
                }
                fact
            }
            IcfgEdgeKind::Return { callsite, ret_vars, .. } => {
                let mut fact = CpFact::new();
                if let Some((Some(result), _)) = self.program.stmt(*callsite).kind.as_invoke() {
                    if self.program.can_hold_int(result) {
                        let mut value = CpValue::Undef;
                        for &ret_var in ret_vars {
                            value = value.meet(src_out.get(ret_var));
                        }
                        fact.update(result, value);
                    }
                }
                fact
            }
        }
    }

    fn pending_nodes(&mut self) -> Vec<IcfgNode> {
        std::mem::take(&mut self.state.pending)
    }
}

fn identity_transfer(input: &CpFact, output: &mut CpFact) -> bool {
    let changed = output != input;
    if changed {
        *output = input.clone();
    }
    changed
}

fn replace_if_changed(output: &mut CpFact, new_out: CpFact) -> bool {
    let changed = *output != new_out;
    if changed {
        *output = new_out;
    }
    changed
}

/// A stored index `s` contributes to a load at index `l` iff both are the
/// same constant, or one of them is `Nac` and the other is not `Undef`.
fn index_compatible(stored: CpValue, load: CpValue) -> bool {
    match (stored, load) {
        (CpValue::Const(a), CpValue::Const(b)) => a == b,
        (CpValue::Nac, other) | (other, CpValue::Nac) => !other.is_undef(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_index_compatibility() {
        use CpValue::*;
        assert!(index_compatible(Const(1), Const(1)));
        assert!(!index_compatible(Const(1), Const(2)));
        assert!(index_compatible(Nac, Const(1)));
        assert!(index_compatible(Const(1), Nac));
        assert!(index_compatible(Nac, Nac));
        assert!(!index_compatible(Nac, Undef));
        assert!(!index_compatible(Undef, Const(0)));
    }
}
