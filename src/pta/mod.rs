// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Whole-program points-to analyses and the taint overlay.

use std::collections::BTreeMap;

use crate::graph::pfg::PfgNodeId;
use crate::heap::{CSObjId, ObjId};
use crate::ir::context::ContextId;
use crate::ir::VarId;
use crate::pts_set::points_to::PointsToSet;

pub mod andersen;
pub mod context_sensitive;
pub mod context_strategy;
pub mod taint;

pub type NodeId = PfgNodeId;
pub type PointsTo<T> = PointsToSet<T>;

/// The kind of call graph / points-to analysis to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PTAType {
    Cha,
    Andersen,
    CallSiteSensitive,
    ObjectSensitive,
}

/// The final points-to facts, exposed per variable (context-insensitive
/// view) and per context-qualified variable (context-sensitive view).
/// Built once after a solver terminates; ordered maps keep iteration
/// deterministic.
pub struct PointerAnalysisResult {
    var_pts: BTreeMap<VarId, PointsTo<ObjId>>,
    cs_var_pts: BTreeMap<(ContextId, VarId), PointsTo<CSObjId>>,
}

impl PointerAnalysisResult {
    pub(crate) fn new() -> Self {
        PointerAnalysisResult {
            var_pts: BTreeMap::new(),
            cs_var_pts: BTreeMap::new(),
        }
    }

    pub(crate) fn add_var_pts(&mut self, var: VarId, pts: &PointsTo<ObjId>) {
        self.var_pts.entry(var).or_default().union(pts);
    }

    pub(crate) fn set_cs_var_pts(
        &mut self,
        cid: ContextId,
        var: VarId,
        pts: PointsTo<CSObjId>,
    ) {
        self.cs_var_pts.insert((cid, var), pts);
    }

    /// The objects the variable may point to, over all contexts.
    pub fn points_to_set(&self, var: VarId) -> Option<&PointsTo<ObjId>> {
        self.var_pts.get(&var)
    }

    /// The context-qualified objects a context-qualified variable may point
    /// to.
    pub fn cs_points_to_set(&self, cid: ContextId, var: VarId) -> Option<&PointsTo<CSObjId>> {
        self.cs_var_pts.get(&(cid, var))
    }

    /// All variables with a non-empty points-to set, in variable order.
    pub fn vars(&self) -> impl Iterator<Item = (VarId, &PointsTo<ObjId>)> {
        self.var_pts.iter().map(|(var, pts)| (*var, pts))
    }

    /// All context-qualified variables with a non-empty points-to set.
    pub fn cs_vars(&self) -> impl Iterator<Item = ((ContextId, VarId), &PointsTo<CSObjId>)> {
        self.cs_var_pts.iter().map(|(key, pts)| (*key, pts))
    }
}
