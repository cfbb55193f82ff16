// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Class-hierarchy-analysis call graph construction.

use opal::builder::call_graph_builder::{dispatch, ChaBuilder};
use opal::ir::{CallKind, InvokeExp, Program, Stmt};

/// Classes `A { foo() }`, `B extends A { foo() }`, `C extends A`; a call
/// `a.foo()` on a receiver declared as `A` resolves to `{A.foo, B.foo}`
/// (C inherits A.foo, deduplicated).
#[test]
fn virtual_dispatch_over_subhierarchy() {
    let mut program = Program::new();
    let a = program.add_class("A", None);
    let b = program.add_class("B", Some(a));
    let c = program.add_class("C", Some(a));
    let a_foo = program.add_method(a, "void foo()", false, None);
    let b_foo = program.add_method(b, "void foo()", false, None);

    let main_class = program.add_class("Main", None);
    let main = program.add_method(main_class, "void main()", true, None);
    program.set_entry(main);
    let a_ty = program.class_ty(a);
    let recv = program.new_var(main, "a", a_ty);
    let subsig = program.get_subsig("void foo()");
    let callsite = program.add_stmt(
        main,
        Stmt::Invoke {
            result: None,
            exp: InvokeExp {
                kind: CallKind::Virtual,
                decl_class: a,
                subsig,
                base: Some(recv),
                args: vec![],
            },
        },
    );

    let call_graph = ChaBuilder::new(&program).build();
    let callees = call_graph.get_callees(&callsite);
    assert_eq!(callees, vec![a_foo, b_foo]);
    // C inherits A.foo; dispatch confirms the deduplicated target.
    assert_eq!(dispatch(&program, c, subsig), Some(a_foo));
    assert!(call_graph.is_reachable(a_foo));
    assert!(call_graph.is_reachable(b_foo));
}

#[test]
fn interface_calls_reach_implementors() {
    let mut program = Program::new();
    let iface = program.add_interface("I");
    let sub_iface = program.add_interface("J");
    program.add_super_interface(sub_iface, iface);
    let x = program.add_class("X", None);
    program.add_super_interface(x, sub_iface);
    let x_m = program.add_method(x, "void m()", false, None);

    let main_class = program.add_class("Main", None);
    let main = program.add_method(main_class, "void main()", true, None);
    program.set_entry(main);
    let i_ty = program.class_ty(iface);
    let recv = program.new_var(main, "i", i_ty);
    let subsig = program.get_subsig("void m()");
    let callsite = program.add_stmt(
        main,
        Stmt::Invoke {
            result: None,
            exp: InvokeExp {
                kind: CallKind::Interface,
                decl_class: iface,
                subsig,
                base: Some(recv),
                args: vec![],
            },
        },
    );

    let call_graph = ChaBuilder::new(&program).build();
    assert_eq!(call_graph.get_callees(&callsite), vec![x_m]);
}

#[test]
fn special_calls_dispatch_from_declaring_class() {
    let mut program = Program::new();
    let sup = program.add_class("Super", None);
    let sup_init = program.add_method(sup, "void init()", false, None);
    let sub = program.add_class("Sub", Some(sup));

    let main_class = program.add_class("Main", None);
    let main = program.add_method(main_class, "void main()", true, None);
    program.set_entry(main);
    let sub_ty = program.class_ty(sub);
    let recv = program.new_var(main, "s", sub_ty);
    let subsig = program.get_subsig("void init()");
    // Sub declares no init(); the special call walks up to Super.
    let callsite = program.add_stmt(
        main,
        Stmt::Invoke {
            result: None,
            exp: InvokeExp {
                kind: CallKind::Special,
                decl_class: sub,
                subsig,
                base: Some(recv),
                args: vec![],
            },
        },
    );

    let call_graph = ChaBuilder::new(&program).build();
    assert_eq!(call_graph.get_callees(&callsite), vec![sup_init]);
    let edges = call_graph.edges();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].0, CallKind::Special);
}

#[test]
fn unresolvable_callsites_contribute_nothing() {
    let mut program = Program::new();
    let a = program.add_abstract_class("A", None);
    program.add_abstract_method(a, "void foo()", None);

    let main_class = program.add_class("Main", None);
    let main = program.add_method(main_class, "void main()", true, None);
    program.set_entry(main);
    let a_ty = program.class_ty(a);
    let recv = program.new_var(main, "a", a_ty);
    let subsig = program.get_subsig("void foo()");
    let callsite = program.add_stmt(
        main,
        Stmt::Invoke {
            result: None,
            exp: InvokeExp {
                kind: CallKind::Virtual,
                decl_class: a,
                subsig,
                base: Some(recv),
                args: vec![],
            },
        },
    );

    let call_graph = ChaBuilder::new(&program).build();
    assert!(call_graph.get_callees(&callsite).is_empty());
    assert_eq!(call_graph.num_reachable(), 1);
}
