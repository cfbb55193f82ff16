// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result};
use std::hash::Hash;
use std::rc::Rc;

use super::StmtId;
use crate::heap::ObjId;
use crate::util::bit_vec::Idx;

crate::index_type! {
    /// The unique identifier for each interned context.
    ContextId
}

pub trait ContextElement: Clone + Eq + PartialEq + Debug + Hash {}

/// An abstract calling context: a bounded string of context elements.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Context<E: ContextElement> {
    pub(crate) context_elems: Vec<E>,
}

impl<E: ContextElement> Debug for Context<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.context_elems.fmt(f)
    }
}

impl<E: ContextElement> Context<E> {
    pub fn new_empty() -> Rc<Self> {
        Rc::new(Context {
            context_elems: Vec::new(),
        })
    }

    pub fn new(context_elems: Vec<E>) -> Rc<Self> {
        Rc::new(Context { context_elems })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.context_elems.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.context_elems.is_empty()
    }

    /// Compose a new context from a given context and a new context element.
    /// Discard the last old context element if the length of context exceeds
    /// the depth limit.
    pub fn new_k_limited_context(old_ctx: &Rc<Context<E>>, elem: E, k: usize) -> Rc<Self> {
        let mut elems = Vec::with_capacity(k);
        if k > 0 {
            elems.push(elem);
            if old_ctx.len() < k {
                elems.extend_from_slice(&old_ctx.context_elems[..])
            } else {
                elems.extend_from_slice(&old_ctx.context_elems[..k - 1])
            }
        }
        Rc::new(Context { context_elems: elems })
    }

    /// Truncates a context to its first `k` elements.
    pub fn k_limited(ctx: &Rc<Context<E>>, k: usize) -> Rc<Self> {
        if ctx.len() <= k {
            ctx.clone()
        } else {
            let elems = ctx.context_elems[..k].to_vec();
            Rc::new(Context { context_elems: elems })
        }
    }

    pub fn first_context_element(&self) -> Option<&E> {
        self.context_elems.first()
    }
}

/// Interns contexts so that equal contexts share a single `ContextId`,
/// making identity comparison equivalent to structural equality.
#[derive(Debug)]
pub struct ContextCache<E: ContextElement> {
    context_list: Vec<Rc<Context<E>>>,
    context_to_index_map: HashMap<Rc<Context<E>>, ContextId>,
}

impl<E: ContextElement> Default for ContextCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ContextElement> ContextCache<E> {
    pub fn new() -> ContextCache<E> {
        ContextCache {
            context_list: Vec::new(),
            context_to_index_map: HashMap::new(),
        }
    }

    /// Returns an index that can be used to retrieve the context via
    /// `get_context`.
    pub fn get_context_id(&mut self, context: &Rc<Context<E>>) -> ContextId {
        if let Some(id) = self.context_to_index_map.get(context) {
            *id
        } else {
            let id = ContextId::new(self.context_list.len());
            self.context_list.push(context.clone());
            self.context_to_index_map.insert(context.clone(), id);
            id
        }
    }

    /// Returns the context that was interned at this index.
    pub fn get_context(&self, id: ContextId) -> Option<Rc<Context<E>>> {
        self.context_list.get(id.index()).cloned()
    }
}

// Different kinds of context elements supported now
impl ContextElement for StmtId {}

impl ContextElement for ObjId {}

/// Context element for strategies that mix call sites and objects.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CtxElem {
    CallSite(StmtId),
    Object(ObjId),
}

impl ContextElement for CtxElem {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn k_limited_composition() {
        let empty = Context::<CtxElem>::new_empty();
        let s = |i| CtxElem::CallSite(StmtId(i));

        let c1 = Context::new_k_limited_context(&empty, s(0), 2);
        assert_eq!(c1.context_elems, vec![s(0)]);
        let c2 = Context::new_k_limited_context(&c1, s(1), 2);
        assert_eq!(c2.context_elems, vec![s(1), s(0)]);
        // The oldest element falls off once the depth limit is reached.
        let c3 = Context::new_k_limited_context(&c2, s(2), 2);
        assert_eq!(c3.context_elems, vec![s(2), s(1)]);
        // Depth 0 always yields the empty context.
        let c0 = Context::new_k_limited_context(&c2, s(3), 0);
        assert!(c0.is_empty());
    }

    #[test]
    fn cache_canonicalizes_equal_contexts() {
        let mut cache = ContextCache::new();
        let empty = Context::<CtxElem>::new_empty();
        let a = Context::new(vec![CtxElem::CallSite(StmtId(7))]);
        let b = Context::new(vec![CtxElem::CallSite(StmtId(7))]);

        let empty_id = cache.get_context_id(&empty);
        let a_id = cache.get_context_id(&a);
        let b_id = cache.get_context_id(&b);
        assert_ne!(empty_id, a_id);
        assert_eq!(a_id, b_id);
        assert_eq!(cache.get_context(a_id).unwrap(), a);
    }
}
