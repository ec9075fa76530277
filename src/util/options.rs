// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Analysis options.

use clap::{Arg, Command};
use serde::{Deserialize, Serialize};

use crate::error::{PtaError, PtaResult};
use crate::pta::PTAType;

/// Environment variable holding a JSON array of option strings.
pub const PTA_FLAGS: &str = "PTA_FLAGS";

const CSPTA_USAGE: &str = r#"cspta [OPTIONS]"#;

/// Creates the clap::Command metadata for argument parsing.
fn make_options_parser() -> Command<'static> {
    Command::new("cspta")
        .no_binary_name(true)
        .override_usage(CSPTA_USAGE)
        .version(env!("CARGO_PKG_VERSION"))
        .arg(Arg::new("entry-func-name")
            .long("entry-func")
            .takes_value(true)
            .help("The name of the function from which the analysis begins.")
            .long_help("When omitted, every function that is never called directly is a root."))
        .arg(Arg::new("pta-type")
            .long("pta-type")
            .takes_value(true)
            .value_parser(["andersen", "ander", "callsite-sensitive", "cs"])
            .help("The type of pointer analysis."))
        .arg(Arg::new("context-depth")
            .long("context-depth")
            .takes_value(true)
            .value_parser(clap::value_parser!(u32))
            .help("The context depth limit for a context-sensitive pointer analysis."))
        .arg(Arg::new("max-iterations")
            .long("max-iterations")
            .takes_value(true)
            .value_parser(clap::value_parser!(usize))
            .help("Fail once the solver has processed this many worklist entries."))
        .arg(Arg::new("isolate-malformed")
            .long("isolate-malformed")
            .takes_value(false)
            .help("Skip functions containing malformed statements instead of failing."))
        .arg(Arg::new("no-invariant-checks")
            .long("no-invariant-checks")
            .takes_value(false)
            .hide(true)
            .help("Do not check that points-to sets only grow."))
        .arg(Arg::new("record-trace")
            .long("record-trace")
            .takes_value(false)
            .help("Record the size of every processed points-to set."))
        .arg(Arg::new("dump-stats")
            .long("dump-stats")
            .takes_value(false)
            .help("Dump the statistics of the analysis results."))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    pub entry_func: Option<String>,
    pub pta_type: PTAType,
    // options for context-sensitive analysis
    pub context_depth: u32,
    /// `None` bounds the solver by the square of the number of graph nodes.
    pub max_iterations: Option<usize>,
    pub isolate_malformed_functions: bool,
    pub check_invariants: bool,
    pub record_trace: bool,
    pub dump_stats: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            entry_func: None,
            pta_type: PTAType::CallSiteSensitive,
            context_depth: 1,
            max_iterations: None,
            isolate_malformed_functions: false,
            check_invariants: true,
            record_trace: false,
            dump_stats: false,
        }
    }
}

impl AnalysisOptions {
    /// Parses options from a list of strings, overriding the current values
    /// of the options that appear.
    pub fn parse_from_args(&mut self, args: &[String]) -> PtaResult<()> {
        let matches = make_options_parser()
            .try_get_matches_from(args.iter())
            .map_err(|e| PtaError::InvalidOptions(e.to_string()))?;

        if let Some(s) = matches.get_one::<String>("entry-func-name") {
            self.entry_func = Some(s.clone());
        }

        if let Some(pta_type) = matches.get_one::<String>("pta-type") {
            self.pta_type = match pta_type.as_str() {
                "andersen" | "ander" => PTAType::Andersen,
                _ => PTAType::CallSiteSensitive,
            }
        }

        if let Some(depth) = matches.get_one::<u32>("context-depth") {
            self.context_depth = *depth;
        }
        if let Some(max) = matches.get_one::<usize>("max-iterations") {
            self.max_iterations = Some(*max);
        }

        self.isolate_malformed_functions |= matches.contains_id("isolate-malformed");
        if matches.contains_id("no-invariant-checks") {
            self.check_invariants = false;
        }
        self.record_trace |= matches.contains_id("record-trace");
        self.dump_stats |= matches.contains_id("dump-stats");
        Ok(())
    }

    /// Builds options from `PTA_FLAGS`, e.g. `["--context-depth", "2"]`.
    /// An unset variable yields the defaults.
    pub fn from_env() -> PtaResult<Self> {
        let mut options = AnalysisOptions::default();
        if let Ok(flags) = std::env::var(PTA_FLAGS) {
            let args: Vec<String> = serde_json::from_str(&flags)?;
            options.parse_from_args(&args)?;
        }
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
    fn defaults_are_one_call_site_deep() {
        let options = AnalysisOptions::default();
        assert_eq!(options.pta_type, PTAType::CallSiteSensitive);
        assert_eq!(options.context_depth, 1);
        assert!(options.check_invariants);
        assert!(!options.isolate_malformed_functions);
    }

    #[test]
    fn parses_command_line() {
        let mut options = AnalysisOptions::default();
        options
            .parse_from_args(&args(&[
                "--entry-func",
                "main",
                "--pta-type",
                "ander",
                "--context-depth",
                "3",
                "--max-iterations",
                "50",
                "--isolate-malformed",
                "--record-trace",
            ]))
            .unwrap();
        assert_eq!(options.entry_func.as_deref(), Some("main"));
        assert_eq!(options.pta_type, PTAType::Andersen);
        assert_eq!(options.context_depth, 3);
        assert_eq!(options.max_iterations, Some(50));
        assert!(options.isolate_malformed_functions);
        assert!(options.record_trace);
        assert!(!options.dump_stats);
    }

    #[test]
    fn rejects_unknown_flags() {
        let mut options = AnalysisOptions::default();
        let err = options.parse_from_args(&args(&["--bogus"])).unwrap_err();
        assert!(matches!(err, PtaError::InvalidOptions(_)));
    }

    #[test]
    fn reads_flags_from_the_environment() {
        std::env::set_var(PTA_FLAGS, r#"["--context-depth", "4", "--dump-stats"]"#);
        let options = AnalysisOptions::from_env().unwrap();
        std::env::remove_var(PTA_FLAGS);
        assert_eq!(options.context_depth, 4);
        assert!(options.dump_stats);
        assert_eq!(options.pta_type, PTAType::CallSiteSensitive);
    }

    #[test]
    fn deserializes_partial_json() {
        let options: AnalysisOptions =
            serde_json::from_str(r#"{"context_depth": 2, "pta_type": "andersen"}"#).unwrap();
        assert_eq!(options.context_depth, 2);
        assert_eq!(options.pta_type, PTAType::Andersen);
        assert!(options.check_invariants);
    }
}
