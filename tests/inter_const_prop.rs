// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Inter-procedural constant propagation on the ICFG.

use opal::dataflow::inter_const_prop::InterConstProp;
use opal::dataflow::inter_solver::InterSolver;
use opal::dataflow::lattice::CpValue;
use opal::graph::icfg::{Icfg, IcfgEdgeKind as E, IcfgNode as N};
use opal::ir::{CallKind, Exp, FieldAccess, InvokeExp, Program, Stmt};
use opal::pta::andersen::AndersenPTA;

/// `int id(int x) { return x; }  main() { a = 42; y = id(a); z = y; }`
/// The constant flows through the call and return edges.
#[test]
fn constant_flows_through_call_and_return() {
    let mut program = Program::new();
    let int_ty = program.int_ty();
    let main_class = program.add_class("Main", None);

    let id = program.add_method(main_class, "int id(int)", true, Some(int_ty));
    let x = program.new_var(id, "x", int_ty);
    program.set_params(id, vec![x]);
    let ret = program.add_stmt(id, Stmt::Return { var: Some(x) });

    let main = program.add_method(main_class, "void main()", true, None);
    program.set_entry(main);
    let a = program.new_var(main, "a", int_ty);
    let y = program.new_var(main, "y", int_ty);
    let z = program.new_var(main, "z", int_ty);
    let init = program.add_stmt(main, Stmt::Assign { lhs: a, rhs: Exp::Int(42) });
    let subsig = program.get_subsig("int id(int)");
    let call = program.add_stmt(
        main,
        Stmt::Invoke {
            result: Some(y),
            exp: InvokeExp {
                kind: CallKind::Static,
                decl_class: main_class,
                subsig,
                base: None,
                args: vec![a],
            },
        },
    );
    let copy = program.add_stmt(main, Stmt::Assign { lhs: z, rhs: Exp::Var(y) });

    let mut icfg = Icfg::new();
    icfg.add_edge(N::Entry(main), N::Stmt(init), E::Normal);
    icfg.add_edge(N::Stmt(init), N::Stmt(call), E::Normal);
    icfg.add_edge(N::Stmt(call), N::Stmt(copy), E::CallToReturn { callsite: call });
    icfg.add_edge(N::Stmt(call), N::Entry(id), E::Call { callsite: call, callee: id });
    icfg.add_edge(N::Entry(id), N::Stmt(ret), E::Normal);
    icfg.add_edge(N::Stmt(ret), N::Exit(id), E::Normal);
    icfg.add_edge(
        N::Exit(id),
        N::Stmt(copy),
        E::Return {
            callsite: call,
            callee: id,
            ret_vars: vec![x],
        },
    );
    icfg.add_edge(N::Stmt(copy), N::Exit(main), E::Normal);

    // No heap accesses; an empty points-to result suffices.
    let mut pta = AndersenPTA::new(&program);
    pta.analyze();
    let pta_result = pta.result();

    let analysis = InterConstProp::new(&program, &pta_result);
    let mut solver = InterSolver::new(&icfg, analysis);
    let result = solver.solve(main);

    assert_eq!(result.in_fact(N::Stmt(copy)).get(y), CpValue::Const(42));
    assert_eq!(result.out_fact(N::Stmt(copy)).get(z), CpValue::Const(42));
    // Inside the callee the parameter is the argument's constant.
    assert_eq!(result.out_fact(N::Stmt(ret)).get(x), CpValue::Const(42));
}

/// A store through one alias is observed by a load through another.
#[test]
fn aliased_field_store_reaches_load() {
    let mut program = Program::new();
    let int_ty = program.int_ty();
    let class_c = program.add_class("C", None);
    let c_ty = program.class_ty(class_c);
    let field_f = program.add_field(class_c, "f", int_ty, false);

    let main_class = program.add_class("Main", None);
    let main = program.add_method(main_class, "void main()", true, None);
    program.set_entry(main);
    let c1 = program.new_var(main, "c1", c_ty);
    let c2 = program.new_var(main, "c2", c_ty);
    let v = program.new_var(main, "v", int_ty);
    let x = program.new_var(main, "x", int_ty);
    let alloc = program.add_stmt(main, Stmt::New { lhs: c1, ty: c_ty });
    let copy = program.add_stmt(main, Stmt::Assign { lhs: c2, rhs: Exp::Var(c1) });
    let init = program.add_stmt(main, Stmt::Assign { lhs: v, rhs: Exp::Int(7) });
    let store = program.add_stmt(
        main,
        Stmt::StoreField {
            access: FieldAccess::Instance { base: c2, field: field_f },
            rhs: v,
        },
    );
    let load = program.add_stmt(
        main,
        Stmt::LoadField {
            lhs: x,
            access: FieldAccess::Instance { base: c1, field: field_f },
        },
    );

    let mut icfg = Icfg::new();
    icfg.add_edge(N::Entry(main), N::Stmt(alloc), E::Normal);
    icfg.add_edge(N::Stmt(alloc), N::Stmt(copy), E::Normal);
    icfg.add_edge(N::Stmt(copy), N::Stmt(init), E::Normal);
    icfg.add_edge(N::Stmt(init), N::Stmt(store), E::Normal);
    icfg.add_edge(N::Stmt(store), N::Stmt(load), E::Normal);
    icfg.add_edge(N::Stmt(load), N::Exit(main), E::Normal);

    let mut pta = AndersenPTA::new(&program);
    pta.analyze();
    let pta_result = pta.result();

    let analysis = InterConstProp::new(&program, &pta_result);
    let mut solver = InterSolver::new(&icfg, analysis);
    let result = solver.solve(main);
    assert_eq!(result.out_fact(N::Stmt(load)).get(x), CpValue::Const(7));
}

/// An array store at an unknown index is observed by a load at a constant
/// index; a store at a different constant index is not.
#[test]
fn array_index_compatibility_governs_loads() {
    let mut program = Program::new();
    let int_ty = program.int_ty();
    let arr_ty = program.array_ty(int_ty);

    let main_class = program.add_class("Main", None);
    let main = program.add_method(main_class, "void main()", true, Some(int_ty));
    program.set_entry(main);
    let p = program.new_var(main, "p", int_ty);
    program.set_params(main, vec![p]);
    let arr = program.new_var(main, "arr", arr_ty);
    let v5 = program.new_var(main, "v5", int_ty);
    let v9 = program.new_var(main, "v9", int_ty);
    let i0 = program.new_var(main, "i0", int_ty);
    let i3 = program.new_var(main, "i3", int_ty);
    let x = program.new_var(main, "x", int_ty);

    let alloc = program.add_stmt(main, Stmt::New { lhs: arr, ty: arr_ty });
    let s1 = program.add_stmt(main, Stmt::Assign { lhs: v5, rhs: Exp::Int(5) });
    let s2 = program.add_stmt(main, Stmt::Assign { lhs: v9, rhs: Exp::Int(9) });
    let s3 = program.add_stmt(main, Stmt::Assign { lhs: i0, rhs: Exp::Int(0) });
    let s4 = program.add_stmt(main, Stmt::Assign { lhs: i3, rhs: Exp::Int(3) });
    // arr[p] = 5 with p unknown; arr[3] = 9.
    let store_nac = program.add_stmt(main, Stmt::StoreArray { base: arr, index: p, rhs: v5 });
    let store_3 = program.add_stmt(main, Stmt::StoreArray { base: arr, index: i3, rhs: v9 });
    let load = program.add_stmt(main, Stmt::LoadArray { lhs: x, base: arr, index: i0 });

    let mut icfg = Icfg::new();
    let chain = [
        N::Entry(main),
        N::Stmt(alloc),
        N::Stmt(s1),
        N::Stmt(s2),
        N::Stmt(s3),
        N::Stmt(s4),
        N::Stmt(store_nac),
        N::Stmt(store_3),
        N::Stmt(load),
        N::Exit(main),
    ];
    for pair in chain.windows(2) {
        icfg.add_edge(pair[0], pair[1], E::Normal);
    }

    let mut pta = AndersenPTA::new(&program);
    pta.analyze();
    let pta_result = pta.result();

    let analysis = InterConstProp::new(&program, &pta_result);
    let mut solver = InterSolver::new(&icfg, analysis);
    let result = solver.solve(main);
    // The Nac-indexed store is compatible with the load at index 0; the
    // store at index 3 is not.
    assert_eq!(result.out_fact(N::Stmt(load)).get(x), CpValue::Const(5));
}
