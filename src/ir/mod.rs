// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The typed object-oriented intermediate representation the analyses run on.
//!
//! Programs are assembled through the arena-style builder API on
//! [`Program`]; the analyses only ever read the IR.

pub mod call_site;
pub mod context;
pub mod program;
pub mod stmt;
pub mod types;

pub use call_site::{CSCallSite, CSMethodId, CallKind};
pub use context::{Context, ContextCache, ContextId, CtxElem};
pub use program::{ClassData, FieldData, MethodData, Program, StmtData, VarData};
pub use stmt::{Atom, BinaryOp, Exp, FieldAccess, InvokeExp, Stmt};
pub use types::{PrimitiveType, Type};

crate::index_type! {
    /// The unique identifier for each class or interface.
    ClassId
}

crate::index_type! {
    /// The unique identifier for each field.
    FieldId
}

crate::index_type! {
    /// The unique identifier for each method.
    MethodId
}

crate::index_type! {
    /// The unique identifier for each variable. Variables are method-local.
    VarId
}

crate::index_type! {
    /// The program-wide stable index of a statement.
    StmtId
}

crate::index_type! {
    /// The unique identifier for each interned type.
    TypeId
}

crate::index_type! {
    /// The unique identifier for each interned method subsignature.
    SubsigId
}
