// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Analysis options.

use clap::{Arg, Command};

use crate::pta::PTAType;

const OPAL_USAGE: &str = r#"opal [OPTIONS] -- <host arguments>"#;

/// Creates the clap::Command metadata for argument parsing.
fn make_options_parser() -> Command<'static> {
    Command::new("opal")
        .no_binary_name(true)
        .override_usage(OPAL_USAGE)
        .arg(Arg::new("entry-func-name")
            .long("entry-func")
            .takes_value(true)
            .help("The signature of the entry method from which the analyses begin."))
        .arg(Arg::new("analysis-type")
            .long("analysis-type")
            .takes_value(true)
            .value_parser(["cha", "andersen", "ander", "callsite-sensitive", "cs", "object-sensitive", "obj"])
            .default_value("callsite-sensitive")
            .help("The kind of call graph / points-to analysis.")
            .long_help("CHA, Andersen, callsite-sensitive and object-sensitive analyses are supported now."))
        .arg(Arg::new("context-depth")
            .long("context-depth")
            .takes_value(true)
            .value_parser(clap::value_parser!(u32))
            .default_value("1")
            .help("The context depth limit for a context-sensitive pointer analysis."))
        .arg(Arg::new("taint-config")
            .long("taint-config")
            .takes_value(true)
            .help("Path of the taint configuration file (sources, sinks, transfers)."))
        .arg(Arg::new("call-graph-output")
            .long("dump-call-graph")
            .takes_value(true)
            .help("Dump the call graph to the output file."))
        .arg(Arg::new("pts-output")
            .long("dump-pts")
            .takes_value(true)
            .help("Dump points-to results to the output file."))
        .arg(Arg::new("taint-output")
            .long("dump-taint-flows")
            .takes_value(true)
            .help("Dump detected taint flows to the output file."))
}

#[derive(Clone, Debug)]
pub struct AnalysisOptions {
    pub entry_func: String,
    pub analysis_type: PTAType,
    // options for context-sensitive analysis
    pub context_depth: u32,

    pub taint_config: Option<String>,
    pub call_graph_output: Option<String>,
    pub pts_output: Option<String>,
    pub taint_output: Option<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            entry_func: String::new(),
            analysis_type: PTAType::CallSiteSensitive,
            context_depth: 1,
            taint_config: None,
            call_graph_output: None,
            pts_output: None,
            taint_output: None,
        }
    }
}

impl AnalysisOptions {
    /// Parses options from a list of strings. Unknown arguments surface as
    /// a clap error so the embedding host can decide how to report them.
    pub fn parse_from_args(args: &[String]) -> Result<AnalysisOptions, clap::Error> {
        let matches = make_options_parser().try_get_matches_from(args.iter())?;
        let mut options = AnalysisOptions::default();

        if let Some(s) = matches.get_one::<String>("entry-func-name") {
            options.entry_func = s.clone();
        }
        if matches.contains_id("analysis-type") {
            options.analysis_type = match matches.get_one::<String>("analysis-type").unwrap().as_str() {
                "cha" => PTAType::Cha,
                "andersen" | "ander" => PTAType::Andersen,
                "callsite-sensitive" | "cs" => PTAType::CallSiteSensitive,
                "object-sensitive" | "obj" => PTAType::ObjectSensitive,
                _ => unreachable!(),
            }
        }
        if let Some(depth) = matches.get_one::<u32>("context-depth") {
            options.context_depth = *depth;
        }
        options.taint_config = matches.get_one::<String>("taint-config").cloned();
        options.call_graph_output = matches.get_one::<String>("call-graph-output").cloned();
        options.pts_output = matches.get_one::<String>("pts-output").cloned();
        options.taint_output = matches.get_one::<String>("taint-output").cloned();
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_to_callsite_sensitive() {
        let options = AnalysisOptions::parse_from_args(&args(&[])).unwrap();
        assert_eq!(options.analysis_type, PTAType::CallSiteSensitive);
        assert_eq!(options.context_depth, 1);
    }

    #[test]
    fn parses_analysis_selection() {
        let options = AnalysisOptions::parse_from_args(&args(&[
            "--analysis-type",
            "obj",
            "--context-depth",
            "2",
            "--dump-pts",
            "pts.json",
        ]))
        .unwrap();
        assert_eq!(options.analysis_type, PTAType::ObjectSensitive);
        assert_eq!(options.context_depth, 2);
        assert_eq!(options.pts_output.as_deref(), Some("pts.json"));
    }

    #[test]
    fn rejects_unknown_arguments() {
        assert!(AnalysisOptions::parse_from_args(&args(&["--no-such-flag"])).is_err());
    }
}
