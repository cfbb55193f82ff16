// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The pointer-flow fragment of a single method.
//!
//! A `FuncPfg` records the context-free pointer facts of a method body:
//! internal copy edges, allocation sites, static field accesses and the
//! call sites that can be resolved without points-to information. It is
//! built once per method; the context-sensitive analysis instantiates it
//! once per calling context by qualifying the variables.
//!
//! Instance field/array accesses and instance calls are deliberately absent:
//! they are wired lazily by the solvers when receiver objects become known.

use crate::ir::{FieldId, StmtId, TypeId, VarId};

#[derive(Clone, Debug, Default)]
pub struct FuncPfg {
    /// `x = y` and `x = (T) y`: copy edges `y -> x`.
    pub(crate) copy_edges: Vec<(VarId, VarId)>,
    /// `x = new T`: the defined variable, the allocation site, the type.
    pub(crate) allocs: Vec<(VarId, StmtId, TypeId)>,
    /// `x = T.f`: edges `StaticField(f) -> x`.
    pub(crate) static_loads: Vec<(FieldId, VarId)>,
    /// `T.f = y`: edges `y -> StaticField(f)`.
    pub(crate) static_stores: Vec<(VarId, FieldId)>,
    /// Static invoke statements, resolvable without receiver objects.
    pub(crate) static_callsites: Vec<StmtId>,
}

impl FuncPfg {
    pub fn new() -> Self {
        Self::default()
    }
}
