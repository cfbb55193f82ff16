// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Taint tracking on top of the context-sensitive points-to analysis.

use std::collections::BTreeSet;

use opal::config::TaintConfig;
use opal::ir::{CallKind, InvokeExp, Program, Stmt, StmtId, VarId};
use opal::pta::context_sensitive::ContextSensitivePTA;
use opal::pta::context_strategy::KCallSiteSensitive;
use opal::pta::taint::TaintFlow;

struct TaintSetup {
    program: Program,
    get_site: StmtId,
    leak_site: StmtId,
    append_site: Option<StmtId>,
}

/// `s = Source.get(); [t = Helper.append(s);] Sink.leak(s or t);`
fn build_taint_program(with_transfer: bool) -> TaintSetup {
    let mut program = Program::new();
    let string = program.add_class("String", None);
    let string_ty = program.class_ty(string);

    let source_class = program.add_class("Source", None);
    program.add_method(source_class, "String get()", true, Some(string_ty));
    let sink_class = program.add_class("Sink", None);
    program.add_method(sink_class, "void leak(String)", true, None);
    let helper_class = program.add_class("Helper", None);
    program.add_method(helper_class, "String append(String)", true, Some(string_ty));

    let main_class = program.add_class("Main", None);
    let main = program.add_method(main_class, "void main()", true, None);
    program.set_entry(main);
    let s = program.new_var(main, "s", string_ty);

    let get_subsig = program.get_subsig("String get()");
    let get_site = program.add_stmt(
        main,
        Stmt::Invoke {
            result: Some(s),
            exp: InvokeExp {
                kind: CallKind::Static,
                decl_class: source_class,
                subsig: get_subsig,
                base: None,
                args: vec![],
            },
        },
    );

    let mut leaked: VarId = s;
    let mut append_site = None;
    if with_transfer {
        let t = program.new_var(main, "t", string_ty);
        let append_subsig = program.get_subsig("String append(String)");
        append_site = Some(program.add_stmt(
            main,
            Stmt::Invoke {
                result: Some(t),
                exp: InvokeExp {
                    kind: CallKind::Static,
                    decl_class: helper_class,
                    subsig: append_subsig,
                    base: None,
                    args: vec![s],
                },
            },
        ));
        leaked = t;
    }

    let leak_subsig = program.get_subsig("void leak(String)");
    let leak_site = program.add_stmt(
        main,
        Stmt::Invoke {
            result: None,
            exp: InvokeExp {
                kind: CallKind::Static,
                decl_class: sink_class,
                subsig: leak_subsig,
                base: None,
                args: vec![leaked],
            },
        },
    );

    TaintSetup {
        program,
        get_site,
        leak_site,
        append_site,
    }
}

#[test]
fn source_to_sink_flow_is_detected() {
    let mut setup = build_taint_program(false);
    let config: TaintConfig = serde_json::from_str(
        r#"{
            "sources": [{"method": "Source.String get()", "type": "String"}],
            "sinks": [{"method": "Sink.void leak(String)", "index": 0}]
        }"#,
    )
    .unwrap();
    let rules = config.resolve(&mut setup.program);

    let mut pta = ContextSensitivePTA::new(&setup.program, KCallSiteSensitive::new(1));
    pta.set_taint(rules);
    pta.analyze();

    let flows = pta.taint_flows();
    assert_eq!(
        flows,
        BTreeSet::from([TaintFlow {
            source: setup.get_site,
            sink: setup.leak_site,
            index: 0,
        }])
    );
}

#[test]
fn transfers_forge_taint_across_helpers() {
    let mut setup = build_taint_program(true);
    let config: TaintConfig = serde_json::from_str(
        r#"{
            "sources": [{"method": "Source.String get()", "type": "String"}],
            "sinks": [{"method": "Sink.void leak(String)", "index": 0}],
            "transfers": [
                {"method": "Helper.String append(String)", "from": "0", "to": "result", "type": "String"}
            ]
        }"#,
    )
    .unwrap();
    let rules = config.resolve(&mut setup.program);

    let mut pta = ContextSensitivePTA::new(&setup.program, KCallSiteSensitive::new(1));
    pta.set_taint(rules);
    pta.analyze();

    let flows = pta.taint_flows();
    // The forged taint object preserves the originating source call site.
    assert_eq!(
        flows,
        BTreeSet::from([TaintFlow {
            source: setup.get_site,
            sink: setup.leak_site,
            index: 0,
        }])
    );
    assert!(setup.append_site.is_some());
}

#[test]
fn without_rules_no_flows_are_reported() {
    let setup = build_taint_program(false);
    let mut pta = ContextSensitivePTA::new(&setup.program, KCallSiteSensitive::new(1));
    pta.analyze();
    assert!(pta.taint_flows().is_empty());
}
