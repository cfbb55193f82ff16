// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use super::context::ContextId;
use super::{MethodId, StmtId};

/// The kind of a call site / call graph edge.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum CallKind {
    /// Calls bound to the declared method of the declaring class.
    Static,
    /// Constructor / super / private calls, dispatched from the declaring
    /// class upwards.
    Special,
    /// Calls dispatched on the receiver's dynamic class.
    Virtual,
    /// Virtual calls through an interface-typed receiver.
    Interface,
}

/// Context-sensitive method consisting of a context id (cid) and a method id.
#[derive(Copy, Clone, Debug, Eq, PartialOrd, PartialEq, Hash, Ord)]
pub struct CSMethodId {
    pub cid: ContextId,
    pub method: MethodId,
}

impl CSMethodId {
    pub fn new(cid: ContextId, method: MethodId) -> Self {
        Self { cid, method }
    }
}

impl From<CSMethodId> for MethodId {
    fn from(m: CSMethodId) -> Self {
        m.method
    }
}

/// Context-sensitive call site: an invoke statement qualified by the
/// context of its containing method.
#[derive(Copy, Clone, Debug, Eq, PartialOrd, PartialEq, Hash, Ord)]
pub struct CSCallSite {
    pub cid: ContextId,
    pub stmt: StmtId,
}

impl CSCallSite {
    pub fn new(cid: ContextId, stmt: StmtId) -> Self {
        Self { cid, stmt }
    }
}

impl From<CSCallSite> for StmtId {
    fn from(cs: CSCallSite) -> Self {
        cs.stmt
    }
}
