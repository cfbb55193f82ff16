// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Serializes analysis results to JSON files. Pure observers over the
//! solved data; never consulted by the solvers.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use itertools::Itertools;
use log::*;
use serde_json::json;

use crate::graph::call_graph::{CGCallSite, CGMethod, CallGraph};
use crate::ir::{MethodId, Program, StmtId};
use crate::pta::taint::TaintFlow;
use crate::pta::PointerAnalysisResult;
use crate::util::bit_vec::Idx;
use crate::util::options::AnalysisOptions;

/// Dumps whatever results the options ask for.
pub fn dump_results<F, S>(
    program: &Program,
    options: &AnalysisOptions,
    call_graph: &CallGraph<F, S>,
    pta: Option<&PointerAnalysisResult>,
    taint_flows: Option<&BTreeSet<TaintFlow>>,
) -> anyhow::Result<()>
where
    F: CGMethod + Into<MethodId>,
    S: CGCallSite + Into<StmtId>,
{
    if let Some(path) = &options.call_graph_output {
        info!("Dumping call graph...");
        dump_call_graph(program, call_graph, Path::new(path))?;
    }
    if let (Some(path), Some(pta)) = (&options.pts_output, pta) {
        info!("Dumping points-to results...");
        dump_pts(program, pta, Path::new(path))?;
    }
    if let (Some(path), Some(flows)) = (&options.taint_output, taint_flows) {
        info!("Dumping taint flows...");
        dump_taint_flows(flows, Path::new(path))?;
    }
    Ok(())
}

/// Dumps the call graph edges, collapsed to their context-insensitive
/// form, in a stable order.
pub fn dump_call_graph<F, S>(
    program: &Program,
    call_graph: &CallGraph<F, S>,
    path: &Path,
) -> anyhow::Result<()>
where
    F: CGMethod + Into<MethodId>,
    S: CGCallSite + Into<StmtId>,
{
    let mut edges: BTreeSet<(u32, String, String, String)> = BTreeSet::new();
    for (kind, callsite, caller, callee) in call_graph.edges() {
        let site: StmtId = callsite.into();
        edges.insert((
            site.0,
            format!("{:?}", kind),
            program.method_sig(caller.into()),
            program.method_sig(callee.into()),
        ));
    }
    let value = json!({
        "reachable_methods": call_graph.num_reachable(),
        "edges": edges
            .iter()
            .map(|(site, kind, caller, callee)| json!({
                "callsite": site,
                "kind": kind,
                "caller": caller,
                "callee": callee,
            }))
            .collect::<Vec<_>>(),
    });
    write_json(path, &value)
}

/// Dumps the context-insensitive points-to sets, keyed by variable.
pub fn dump_pts(program: &Program, pta: &PointerAnalysisResult, path: &Path) -> anyhow::Result<()> {
    let mut entries = Vec::new();
    for (var, pts) in pta.vars() {
        let var_data = program.var(var);
        let objs: Vec<usize> = pts.iter().map(|obj| obj.index()).sorted().collect();
        entries.push(json!({
            "method": program.method_sig(var_data.method),
            "var": var_data.name,
            "objects": objs,
        }));
    }
    write_json(path, &json!({ "points_to": entries }))
}

/// Dumps taint flows; the set order is already deterministic.
pub fn dump_taint_flows(flows: &BTreeSet<TaintFlow>, path: &Path) -> anyhow::Result<()> {
    let entries: Vec<_> = flows
        .iter()
        .map(|flow| {
            json!({
                "source": flow.source.0,
                "sink": flow.sink.0,
                "index": flow.index,
            })
        })
        .collect();
    write_json(path, &json!({ "taint_flows": entries }))
}

fn write_json(path: &Path, value: &serde_json::Value) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}
