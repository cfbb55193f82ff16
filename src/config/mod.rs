// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Taint configuration: sources, sinks and transfers, deserialized from a
//! JSON file and resolved against the analyzed program.

use std::path::Path;

use anyhow::Context as _;
use log::*;
use serde::{Deserialize, Serialize};

use crate::ir::{Program, TypeId};
use crate::pta::taint::{TaintPoint, TaintProcessor};

/// A raw taint configuration as found in the configuration file. Methods
/// are named by `Class.subsignature` strings, types by class names, and
/// transfer endpoints by `"base"`, `"result"` or an argument index.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TaintConfig {
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    #[serde(default)]
    pub sinks: Vec<SinkSpec>,
    #[serde(default)]
    pub transfers: Vec<TransferSpec>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SourceSpec {
    pub method: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SinkSpec {
    pub method: String,
    pub index: usize,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TransferSpec {
    pub method: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl TaintConfig {
    pub fn from_json_file(path: &Path) -> anyhow::Result<TaintConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read taint config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("malformed taint config {}", path.display()))
    }

    /// Resolves method and type names against the program. Entries that do
    /// not resolve are reported and skipped; the analysis proceeds with
    /// whatever rules remain.
    pub fn resolve(&self, program: &mut Program) -> TaintProcessor {
        let mut sources = Vec::new();
        for spec in &self.sources {
            match (
                program.method_by_sig(&spec.method),
                resolve_type(program, &spec.ty),
            ) {
                (Some(method), Some(ty)) => sources.push((method, ty)),
                _ => warn!("skipping unresolved taint source {:?}", spec),
            }
        }
        let mut sinks = Vec::new();
        for spec in &self.sinks {
            match program.method_by_sig(&spec.method) {
                Some(method) => sinks.push((method, spec.index)),
                None => warn!("skipping unresolved taint sink {:?}", spec),
            }
        }
        let mut transfers = Vec::new();
        for spec in &self.transfers {
            let resolved = (
                program.method_by_sig(&spec.method),
                parse_point(&spec.from),
                parse_point(&spec.to),
                resolve_type(program, &spec.ty),
            );
            match resolved {
                (Some(method), Some(from), Some(to), Some(ty)) => {
                    transfers.push((method, from, to, ty))
                }
                _ => warn!("skipping unresolved taint transfer {:?}", spec),
            }
        }
        TaintProcessor::new(sources, sinks, transfers)
    }
}

fn resolve_type(program: &mut Program, name: &str) -> Option<TypeId> {
    let class = program.class_by_name(name)?;
    Some(program.class_ty(class))
}

fn parse_point(s: &str) -> Option<TaintPoint> {
    match s {
        "base" => Some(TaintPoint::Base),
        "result" => Some(TaintPoint::Result),
        _ => s.parse::<usize>().ok().map(TaintPoint::Arg),
    }
}

/// Convenience for hosts: load and resolve in one step. I/O and parse
/// errors surface through `anyhow`; unresolved entries only produce
/// warnings.
pub fn load_taint_config(path: &Path, program: &mut Program) -> anyhow::Result<TaintProcessor> {
    let config = TaintConfig::from_json_file(path)?;
    Ok(config.resolve(program))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_resolves_rules() {
        let json = r#"{
            "sources": [{"method": "Source.String get()", "type": "String"}],
            "sinks": [{"method": "Sink.void leak(String)", "index": 0}],
            "transfers": [
                {"method": "String.String concat(String)", "from": "0", "to": "result", "type": "String"}
            ]
        }"#;
        let config: TaintConfig = serde_json::from_str(json).unwrap();

        let mut program = Program::new();
        let string = program.add_class("String", None);
        let source = program.add_class("Source", None);
        let sink = program.add_class("Sink", None);
        let string_ty = program.class_ty(string);
        program.add_method(source, "String get()", true, Some(string_ty));
        program.add_method(sink, "void leak(String)", true, None);
        program.add_method(string, "String concat(String)", false, Some(string_ty));

        let rules = config.resolve(&mut program);
        assert_eq!(rules.sources.len(), 1);
        assert_eq!(rules.sinks.len(), 1);
        assert_eq!(rules.transfers.len(), 1);
        assert_eq!(rules.transfers[0].1, TaintPoint::Arg(0));
        assert_eq!(rules.transfers[0].2, TaintPoint::Result);
    }

    #[test]
    fn unresolved_entries_are_skipped() {
        let json = r#"{"sources": [{"method": "Nope.none()", "type": "Nope"}]}"#;
        let config: TaintConfig = serde_json::from_str(json).unwrap();
        let mut program = Program::new();
        let rules = config.resolve(&mut program);
        assert!(rules.is_empty());
    }
}
