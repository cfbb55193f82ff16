// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Taint rules consumed by the context-sensitive solver.
//!
//! Sources materialize taint objects at matched call sites, transfers
//! forge re-typed taint objects between call-site pointers, and sinks are
//! scanned once the points-to solver has terminated.

use crate::ir::{MethodId, StmtId, TypeId};

/// A pointer position at a call site that taint rules talk about.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaintPoint {
    Base,
    Result,
    Arg(usize),
}

/// A detected flow: an object originating at a source call site reached a
/// sink call site at the given argument position. The derived order makes
/// reported flows deterministic.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TaintFlow {
    pub source: StmtId,
    pub sink: StmtId,
    pub index: usize,
}

/// The resolved taint specification: rules reference interned methods and
/// types of the program under analysis.
#[derive(Debug, Default)]
pub struct TaintProcessor {
    pub(crate) sources: Vec<(MethodId, TypeId)>,
    pub(crate) sinks: Vec<(MethodId, usize)>,
    pub(crate) transfers: Vec<(MethodId, TaintPoint, TaintPoint, TypeId)>,
}

impl TaintProcessor {
    pub fn new(
        sources: Vec<(MethodId, TypeId)>,
        sinks: Vec<(MethodId, usize)>,
        transfers: Vec<(MethodId, TaintPoint, TaintPoint, TypeId)>,
    ) -> Self {
        TaintProcessor {
            sources,
            sinks,
            transfers,
        }
    }

    /// Types of taint objects produced when `callee` is called as a source.
    pub fn sources_for(&self, callee: MethodId) -> impl Iterator<Item = TypeId> + '_ {
        self.sources
            .iter()
            .filter(move |(m, _)| *m == callee)
            .map(|(_, ty)| *ty)
    }

    /// Transfer rules applying to calls of `callee`.
    pub fn transfers_for(
        &self,
        callee: MethodId,
    ) -> impl Iterator<Item = (TaintPoint, TaintPoint, TypeId)> + '_ {
        self.transfers
            .iter()
            .filter(move |(m, _, _, _)| *m == callee)
            .map(|(_, from, to, ty)| (*from, *to, *ty))
    }

    /// Sink rules applying to calls of `callee`.
    pub fn sinks_for(&self, callee: MethodId) -> impl Iterator<Item = usize> + '_ {
        self.sinks
            .iter()
            .filter(move |(m, _)| *m == callee)
            .map(|(_, index)| *index)
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.sinks.is_empty() && self.transfers.is_empty()
    }
}
