// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The allocation-site heap abstraction.
//!
//! Every `new` statement names one canonical abstract object. Taint objects
//! are distinguished abstract objects keyed by their originating call site
//! and declared type; they participate in points-to sets as any other
//! object. The context-sensitive analyses additionally intern
//! (heap context, object) pairs.

use std::collections::HashMap;

use crate::ir::context::ContextId;
use crate::ir::{StmtId, TypeId};
use crate::util::bit_vec::Idx;

crate::index_type! {
    /// The unique identifier for each abstract heap object.
    ObjId
}

crate::index_type! {
    /// The unique identifier for each context-qualified heap object.
    CSObjId
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjKind {
    /// An object abstracting all instances allocated at a `new` site.
    Alloc { site: StmtId },
    /// A taint object originating at a source call site.
    Taint { site: StmtId },
}

#[derive(Copy, Clone, Debug)]
pub struct ObjData {
    pub kind: ObjKind,
    pub ty: TypeId,
}

/// Canonicalizing manager for abstract heap objects.
pub struct HeapModel {
    objs: Vec<ObjData>,
    alloc_map: HashMap<StmtId, ObjId>,
    taint_map: HashMap<(StmtId, TypeId), ObjId>,

    cs_objs: Vec<(ContextId, ObjId)>,
    cs_obj_map: HashMap<(ContextId, ObjId), CSObjId>,
}

impl Default for HeapModel {
    fn default() -> Self {
        Self::new()
    }
}

impl HeapModel {
    pub fn new() -> Self {
        HeapModel {
            objs: Vec::new(),
            alloc_map: HashMap::new(),
            taint_map: HashMap::new(),
            cs_objs: Vec::new(),
            cs_obj_map: HashMap::new(),
        }
    }

    /// Returns the canonical object for the given allocation site.
    pub fn get_obj(&mut self, site: StmtId, ty: TypeId) -> ObjId {
        if let Some(obj) = self.alloc_map.get(&site) {
            return *obj;
        }
        let obj = self.push_obj(ObjData {
            kind: ObjKind::Alloc { site },
            ty,
        });
        self.alloc_map.insert(site, obj);
        obj
    }

    /// Returns the canonical taint object for the given source call site and
    /// declared type.
    pub fn get_taint_obj(&mut self, site: StmtId, ty: TypeId) -> ObjId {
        if let Some(obj) = self.taint_map.get(&(site, ty)) {
            return *obj;
        }
        let obj = self.push_obj(ObjData {
            kind: ObjKind::Taint { site },
            ty,
        });
        self.taint_map.insert((site, ty), obj);
        obj
    }

    #[inline]
    pub fn obj(&self, obj: ObjId) -> &ObjData {
        &self.objs[obj.index()]
    }

    /// Returns the originating source call site if `obj` is a taint object.
    pub fn taint_source(&self, obj: ObjId) -> Option<StmtId> {
        match self.obj(obj).kind {
            ObjKind::Taint { site } => Some(site),
            ObjKind::Alloc { .. } => None,
        }
    }

    pub fn num_objs(&self) -> usize {
        self.objs.len()
    }

    /// Interns a (heap context, object) pair.
    pub fn get_cs_obj(&mut self, hctx: ContextId, obj: ObjId) -> CSObjId {
        if let Some(cs_obj) = self.cs_obj_map.get(&(hctx, obj)) {
            return *cs_obj;
        }
        let cs_obj = CSObjId::new(self.cs_objs.len());
        self.cs_objs.push((hctx, obj));
        self.cs_obj_map.insert((hctx, obj), cs_obj);
        cs_obj
    }

    /// Returns the (heap context, object) pair behind a context-qualified
    /// object.
    #[inline]
    pub fn cs_obj(&self, cs_obj: CSObjId) -> (ContextId, ObjId) {
        self.cs_objs[cs_obj.index()]
    }

    fn push_obj(&mut self, data: ObjData) -> ObjId {
        let obj = ObjId::new(self.objs.len());
        self.objs.push(data);
        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objects_are_canonical_per_site() {
        let mut heap = HeapModel::new();
        let ty = TypeId(0);
        let a = heap.get_obj(StmtId(1), ty);
        let b = heap.get_obj(StmtId(1), ty);
        let c = heap.get_obj(StmtId(2), ty);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(heap.taint_source(a).is_none());
    }

    #[test]
    fn taint_objects_are_distinct_and_keyed_by_type() {
        let mut heap = HeapModel::new();
        let site = StmtId(3);
        let t1 = heap.get_taint_obj(site, TypeId(0));
        let t2 = heap.get_taint_obj(site, TypeId(1));
        assert_ne!(t1, t2);
        assert_eq!(heap.get_taint_obj(site, TypeId(0)), t1);
        assert_eq!(heap.taint_source(t1), Some(site));
    }

    #[test]
    fn cs_objects_are_interned() {
        let mut heap = HeapModel::new();
        let obj = heap.get_obj(StmtId(1), TypeId(0));
        let c0 = ContextId(0);
        let c1 = ContextId(1);
        assert_eq!(heap.get_cs_obj(c0, obj), heap.get_cs_obj(c0, obj));
        assert_ne!(heap.get_cs_obj(c0, obj), heap.get_cs_obj(c1, obj));
        let cs = heap.get_cs_obj(c1, obj);
        assert_eq!(heap.cs_obj(cs), (c1, obj));
    }
}
