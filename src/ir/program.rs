// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;

use super::stmt::{FieldAccess, Stmt};
use super::types::{PrimitiveType, Type};
use super::{ClassId, FieldId, MethodId, StmtId, SubsigId, TypeId, VarId};
use crate::util::bit_vec::Idx;

/// A class or interface of the analyzed program.
#[derive(Debug)]
pub struct ClassData {
    pub name: String,
    pub super_class: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    pub is_interface: bool,
    pub is_abstract: bool,
    /// Methods declared directly in this class, keyed by subsignature.
    pub methods: HashMap<SubsigId, MethodId>,
    pub direct_subclasses: Vec<ClassId>,
    pub direct_subinterfaces: Vec<ClassId>,
    pub direct_implementors: Vec<ClassId>,
}

#[derive(Debug)]
pub struct FieldData {
    pub class: ClassId,
    pub name: String,
    pub ty: TypeId,
    pub is_static: bool,
}

#[derive(Debug)]
pub struct MethodData {
    pub class: ClassId,
    pub subsig: SubsigId,
    pub is_static: bool,
    pub is_abstract: bool,
    pub params: Vec<VarId>,
    /// The receiver variable of an instance method.
    pub this: Option<VarId>,
    pub ret_ty: Option<TypeId>,
    pub body: Vec<StmtId>,
    /// Variables returned by the `Return` statements of the body.
    pub ret_vars: Vec<VarId>,
}

/// A method-local variable.
///
/// The statement indexes are maintained by [`Program::add_stmt`] so that the
/// points-to solvers can wire instance field/array accesses and virtual
/// calls lazily, when the variable's points-to set grows.
#[derive(Debug)]
pub struct VarData {
    pub name: String,
    pub ty: TypeId,
    pub method: MethodId,
    /// `LoadField` statements with this variable as the base.
    pub load_fields: Vec<StmtId>,
    /// `StoreField` statements with this variable as the base.
    pub store_fields: Vec<StmtId>,
    /// `LoadArray` statements with this variable as the base.
    pub load_arrays: Vec<StmtId>,
    /// `StoreArray` statements with this variable as the base.
    pub store_arrays: Vec<StmtId>,
    /// `Invoke` statements with this variable as the receiver.
    pub invokes: Vec<StmtId>,
}

#[derive(Debug)]
pub struct StmtData {
    pub kind: Stmt,
    pub method: MethodId,
}

/// The whole analyzed program: arena storage for classes, fields, methods,
/// variables and statements, plus the interning tables for types and
/// subsignatures.
pub struct Program {
    pub(crate) classes: Vec<ClassData>,
    pub(crate) fields: Vec<FieldData>,
    pub(crate) methods: Vec<MethodData>,
    pub(crate) vars: Vec<VarData>,
    pub(crate) stmts: Vec<StmtData>,

    types: Vec<Type>,
    type_map: HashMap<Type, TypeId>,
    subsigs: Vec<String>,
    subsig_map: HashMap<String, SubsigId>,

    entry: Option<MethodId>,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

/// Constructor and builder API.
impl Program {
    pub fn new() -> Self {
        Program {
            classes: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            vars: Vec::new(),
            stmts: Vec::new(),
            types: Vec::new(),
            type_map: HashMap::new(),
            subsigs: Vec::new(),
            subsig_map: HashMap::new(),
            entry: None,
        }
    }

    pub fn add_class(&mut self, name: &str, super_class: Option<ClassId>) -> ClassId {
        self.add_class_impl(name, super_class, false, false)
    }

    pub fn add_abstract_class(&mut self, name: &str, super_class: Option<ClassId>) -> ClassId {
        self.add_class_impl(name, super_class, false, true)
    }

    pub fn add_interface(&mut self, name: &str) -> ClassId {
        self.add_class_impl(name, None, true, true)
    }

    fn add_class_impl(
        &mut self,
        name: &str,
        super_class: Option<ClassId>,
        is_interface: bool,
        is_abstract: bool,
    ) -> ClassId {
        let class = ClassId::new(self.classes.len());
        self.classes.push(ClassData {
            name: name.to_string(),
            super_class,
            interfaces: Vec::new(),
            is_interface,
            is_abstract,
            methods: HashMap::new(),
            direct_subclasses: Vec::new(),
            direct_subinterfaces: Vec::new(),
            direct_implementors: Vec::new(),
        });
        if let Some(sup) = super_class {
            self.classes[sup.index()].direct_subclasses.push(class);
        }
        class
    }

    /// Registers `iface` as a super-interface of `sub`. If `sub` is itself an
    /// interface it becomes a direct subinterface, otherwise a direct
    /// implementor.
    pub fn add_super_interface(&mut self, sub: ClassId, iface: ClassId) {
        self.classes[sub.index()].interfaces.push(iface);
        if self.classes[sub.index()].is_interface {
            self.classes[iface.index()].direct_subinterfaces.push(sub);
        } else {
            self.classes[iface.index()].direct_implementors.push(sub);
        }
    }

    pub fn add_field(&mut self, class: ClassId, name: &str, ty: TypeId, is_static: bool) -> FieldId {
        let field = FieldId::new(self.fields.len());
        self.fields.push(FieldData {
            class,
            name: name.to_string(),
            ty,
            is_static,
        });
        field
    }

    pub fn add_method(
        &mut self,
        class: ClassId,
        subsig: &str,
        is_static: bool,
        ret_ty: Option<TypeId>,
    ) -> MethodId {
        self.add_method_impl(class, subsig, is_static, false, ret_ty)
    }

    pub fn add_abstract_method(
        &mut self,
        class: ClassId,
        subsig: &str,
        ret_ty: Option<TypeId>,
    ) -> MethodId {
        self.add_method_impl(class, subsig, false, true, ret_ty)
    }

    fn add_method_impl(
        &mut self,
        class: ClassId,
        subsig: &str,
        is_static: bool,
        is_abstract: bool,
        ret_ty: Option<TypeId>,
    ) -> MethodId {
        let subsig = self.get_subsig(subsig);
        let method = MethodId::new(self.methods.len());
        self.methods.push(MethodData {
            class,
            subsig,
            is_static,
            is_abstract,
            params: Vec::new(),
            this: None,
            ret_ty,
            body: Vec::new(),
            ret_vars: Vec::new(),
        });
        self.classes[class.index()].methods.insert(subsig, method);
        method
    }

    pub fn new_var(&mut self, method: MethodId, name: &str, ty: TypeId) -> VarId {
        let var = VarId::new(self.vars.len());
        self.vars.push(VarData {
            name: name.to_string(),
            ty,
            method,
            load_fields: Vec::new(),
            store_fields: Vec::new(),
            load_arrays: Vec::new(),
            store_arrays: Vec::new(),
            invokes: Vec::new(),
        });
        var
    }

    pub fn set_params(&mut self, method: MethodId, params: Vec<VarId>) {
        self.methods[method.index()].params = params;
    }

    pub fn set_this(&mut self, method: MethodId, this: VarId) {
        self.methods[method.index()].this = Some(this);
    }

    /// Appends a statement to the method's body and indexes it on the
    /// variables it accesses.
    pub fn add_stmt(&mut self, method: MethodId, stmt: Stmt) -> StmtId {
        let id = StmtId::new(self.stmts.len());
        match &stmt {
            Stmt::LoadField {
                access: FieldAccess::Instance { base, .. },
                ..
            } => self.vars[base.index()].load_fields.push(id),
            Stmt::StoreField {
                access: FieldAccess::Instance { base, .. },
                ..
            } => self.vars[base.index()].store_fields.push(id),
            Stmt::LoadArray { base, .. } => self.vars[base.index()].load_arrays.push(id),
            Stmt::StoreArray { base, .. } => self.vars[base.index()].store_arrays.push(id),
            Stmt::Invoke { exp, .. } => {
                if let Some(base) = exp.base {
                    self.vars[base.index()].invokes.push(id);
                }
            }
            Stmt::Return { var: Some(var) } => {
                let ret_vars = &mut self.methods[method.index()].ret_vars;
                if !ret_vars.contains(var) {
                    ret_vars.push(*var);
                }
            }
            _ => {}
        }
        self.stmts.push(StmtData { kind: stmt, method });
        self.methods[method.index()].body.push(id);
        id
    }

    pub fn set_entry(&mut self, method: MethodId) {
        self.entry = Some(method);
    }
}

/// Interning.
impl Program {
    pub fn get_type(&mut self, ty: Type) -> TypeId {
        if let Some(id) = self.type_map.get(&ty) {
            return *id;
        }
        let id = TypeId::new(self.types.len());
        self.types.push(ty);
        self.type_map.insert(ty, id);
        id
    }

    pub fn int_ty(&mut self) -> TypeId {
        self.get_type(Type::Primitive(PrimitiveType::Int))
    }

    pub fn class_ty(&mut self, class: ClassId) -> TypeId {
        self.get_type(Type::Class(class))
    }

    pub fn array_ty(&mut self, elem: TypeId) -> TypeId {
        self.get_type(Type::Array(elem))
    }

    #[inline]
    pub fn type_of(&self, ty: TypeId) -> Type {
        self.types[ty.index()]
    }

    pub fn get_subsig(&mut self, subsig: &str) -> SubsigId {
        if let Some(id) = self.subsig_map.get(subsig) {
            return *id;
        }
        let id = SubsigId::new(self.subsigs.len());
        self.subsigs.push(subsig.to_string());
        self.subsig_map.insert(subsig.to_string(), id);
        id
    }

    #[inline]
    pub fn subsig_str(&self, subsig: SubsigId) -> &str {
        &self.subsigs[subsig.index()]
    }
}

/// Read accessors.
impl Program {
    #[inline]
    pub fn class(&self, class: ClassId) -> &ClassData {
        &self.classes[class.index()]
    }

    #[inline]
    pub fn field(&self, field: FieldId) -> &FieldData {
        &self.fields[field.index()]
    }

    #[inline]
    pub fn method(&self, method: MethodId) -> &MethodData {
        &self.methods[method.index()]
    }

    #[inline]
    pub fn var(&self, var: VarId) -> &VarData {
        &self.vars[var.index()]
    }

    #[inline]
    pub fn stmt(&self, stmt: StmtId) -> &StmtData {
        &self.stmts[stmt.index()]
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    /// All statement ids of the program, in index order.
    pub fn all_stmts(&self) -> impl Iterator<Item = StmtId> {
        (0..self.stmts.len()).map(StmtId::new)
    }

    pub fn entry(&self) -> Option<MethodId> {
        self.entry
    }

    /// Returns true if the variable's type holds an integer value.
    pub fn can_hold_int(&self, var: VarId) -> bool {
        match self.type_of(self.var(var).ty) {
            Type::Primitive(prim) => prim.can_hold_int(),
            _ => false,
        }
    }

    /// Returns true if the variable is reference-typed, i.e. a pointer the
    /// points-to analyses track.
    pub fn is_ref(&self, var: VarId) -> bool {
        matches!(
            self.type_of(self.var(var).ty),
            Type::Class(_) | Type::Array(_)
        )
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        (0..self.classes.len())
            .map(ClassId::new)
            .find(|c| self.class(*c).name == name)
    }

    /// A human-readable method signature, `Class.subsig`.
    pub fn method_sig(&self, method: MethodId) -> String {
        let data = self.method(method);
        format!(
            "{}.{}",
            self.class(data.class).name,
            self.subsig_str(data.subsig)
        )
    }

    /// Looks up a method by its `Class.subsig` signature string.
    pub fn method_by_sig(&self, sig: &str) -> Option<MethodId> {
        (0..self.methods.len())
            .map(MethodId::new)
            .find(|m| self.method_sig(*m) == sig)
    }
}

/// Class hierarchy queries.
impl Program {
    #[inline]
    pub fn super_class(&self, class: ClassId) -> Option<ClassId> {
        self.class(class).super_class
    }

    #[inline]
    pub fn is_interface(&self, class: ClassId) -> bool {
        self.class(class).is_interface
    }

    #[inline]
    pub fn is_abstract(&self, class: ClassId) -> bool {
        self.class(class).is_abstract
    }

    pub fn direct_subclasses_of(&self, class: ClassId) -> &[ClassId] {
        &self.class(class).direct_subclasses
    }

    pub fn direct_subinterfaces_of(&self, iface: ClassId) -> &[ClassId] {
        &self.class(iface).direct_subinterfaces
    }

    pub fn direct_implementors_of(&self, iface: ClassId) -> &[ClassId] {
        &self.class(iface).direct_implementors
    }

    /// The method declared directly in `class` with the given subsignature.
    pub fn get_declared_method(&self, class: ClassId, subsig: SubsigId) -> Option<MethodId> {
        self.class(class).methods.get(&subsig).copied()
    }
}
