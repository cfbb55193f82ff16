// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Context selection strategies for the context-sensitive analysis.

use std::rc::Rc;

use crate::heap::ObjId;
use crate::ir::context::{Context, ContextCache, ContextId, CtxElem};
use crate::ir::{CSCallSite, CSMethodId, MethodId};

/// Selects the contexts under which callees and heap objects are analyzed.
///
/// All strategies intern through a [`ContextCache`], so equal contexts get
/// identical ids across the whole analysis.
pub trait ContextStrategy {
    /// The distinguished empty context.
    fn empty_context(&mut self) -> ContextId;

    /// The context for the callee of a static call.
    fn select_static_context(&mut self, callsite: CSCallSite, callee: MethodId) -> ContextId;

    /// The context for the callee of an instance call with the given
    /// receiver object.
    fn select_instance_context(
        &mut self,
        callsite: CSCallSite,
        recv: (ContextId, ObjId),
        callee: MethodId,
    ) -> ContextId;

    /// The heap context for an object allocated in the given method.
    fn select_heap_context(&mut self, method: CSMethodId, obj: ObjId) -> ContextId;
}

/// k-limited call-site sensitivity (k-CFA): callee contexts are the last
/// `k` call sites; heap contexts are truncated to `k - 1` elements.
pub struct KCallSiteSensitive {
    k: usize,
    cache: ContextCache<CtxElem>,
}

impl KCallSiteSensitive {
    pub fn new(k: usize) -> Self {
        KCallSiteSensitive {
            k,
            cache: ContextCache::new(),
        }
    }

    fn context_of(&mut self, cid: ContextId) -> Rc<Context<CtxElem>> {
        self.cache
            .get_context(cid)
            .expect("context id minted by another cache")
    }
}

impl ContextStrategy for KCallSiteSensitive {
    fn empty_context(&mut self) -> ContextId {
        self.cache.get_context_id(&Context::new_empty())
    }

    fn select_static_context(&mut self, callsite: CSCallSite, _callee: MethodId) -> ContextId {
        let parent = self.context_of(callsite.cid);
        let ctx =
            Context::new_k_limited_context(&parent, CtxElem::CallSite(callsite.stmt), self.k);
        self.cache.get_context_id(&ctx)
    }

    fn select_instance_context(
        &mut self,
        callsite: CSCallSite,
        _recv: (ContextId, ObjId),
        callee: MethodId,
    ) -> ContextId {
        self.select_static_context(callsite, callee)
    }

    fn select_heap_context(&mut self, method: CSMethodId, _obj: ObjId) -> ContextId {
        let ctx = self.context_of(method.cid);
        let hctx = Context::k_limited(&ctx, self.k.saturating_sub(1));
        self.cache.get_context_id(&hctx)
    }
}

/// k-limited object sensitivity: callee contexts of instance calls are the
/// receiver object prepended to its heap context; static calls inherit the
/// caller's context.
pub struct KObjectSensitive {
    k: usize,
    cache: ContextCache<CtxElem>,
}

impl KObjectSensitive {
    pub fn new(k: usize) -> Self {
        KObjectSensitive {
            k,
            cache: ContextCache::new(),
        }
    }

    fn context_of(&mut self, cid: ContextId) -> Rc<Context<CtxElem>> {
        self.cache
            .get_context(cid)
            .expect("context id minted by another cache")
    }
}

impl ContextStrategy for KObjectSensitive {
    fn empty_context(&mut self) -> ContextId {
        self.cache.get_context_id(&Context::new_empty())
    }

    fn select_static_context(&mut self, callsite: CSCallSite, _callee: MethodId) -> ContextId {
        callsite.cid
    }

    fn select_instance_context(
        &mut self,
        _callsite: CSCallSite,
        recv: (ContextId, ObjId),
        _callee: MethodId,
    ) -> ContextId {
        let hctx = self.context_of(recv.0);
        let ctx = Context::new_k_limited_context(&hctx, CtxElem::Object(recv.1), self.k);
        self.cache.get_context_id(&ctx)
    }

    fn select_heap_context(&mut self, method: CSMethodId, _obj: ObjId) -> ContextId {
        let ctx = self.context_of(method.cid);
        let hctx = Context::k_limited(&ctx, self.k.saturating_sub(1));
        self.cache.get_context_id(&hctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::StmtId;

    #[test]
    fn one_call_site_sensitivity_distinguishes_sites() {
        let mut strategy = KCallSiteSensitive::new(1);
        let empty = strategy.empty_context();
        let callee = MethodId(0);
        let c1 = strategy.select_static_context(CSCallSite::new(empty, StmtId(1)), callee);
        let c2 = strategy.select_static_context(CSCallSite::new(empty, StmtId(2)), callee);
        let c1_again = strategy.select_static_context(CSCallSite::new(empty, StmtId(1)), callee);
        assert_ne!(c1, c2);
        assert_eq!(c1, c1_again);
    }

    #[test]
    fn k_limiting_collapses_deep_chains() {
        let mut strategy = KCallSiteSensitive::new(1);
        let empty = strategy.empty_context();
        let callee = MethodId(0);
        // site2 called from within site1's context keeps only site2.
        let c1 = strategy.select_static_context(CSCallSite::new(empty, StmtId(1)), callee);
        let via_c1 = strategy.select_static_context(CSCallSite::new(c1, StmtId(2)), callee);
        let direct = strategy.select_static_context(CSCallSite::new(empty, StmtId(2)), callee);
        assert_eq!(via_c1, direct);
    }

    #[test]
    fn heap_context_of_one_cfa_is_empty() {
        let mut strategy = KCallSiteSensitive::new(1);
        let empty = strategy.empty_context();
        let callee = MethodId(0);
        let c1 = strategy.select_static_context(CSCallSite::new(empty, StmtId(1)), callee);
        let hctx = strategy.select_heap_context(CSMethodId::new(c1, callee), ObjId(0));
        assert_eq!(hctx, empty);
    }
}
