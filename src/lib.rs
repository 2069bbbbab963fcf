// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Compile a resolved Horn program into flat Horn clauses over integers and
//! booleans: the standard translation pipeline, optionally followed by
//! medium-step folding.

// configure clippy
#![allow(clippy::needless_return)]
#![allow(clippy::large_enum_variant)]
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::type_complexity)]
#![deny(clippy::uninlined_format_args)]
// documentation-related lints (only checked when running rustdoc)
#![warn(missing_docs)]
#![allow(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::broken_intra_doc_links)]

use horn::syntax::Rule;
use lower::{
    check::check_flattened,
    conf::TranslationConf,
    error::TranslationError,
    oracle::{RuleTypeOracle, TestOutcome},
    pipeline::{Pipeline, TraceEntry},
    program::Program,
    selector::SelectorRegistry,
    steps::rename::rename,
};
use medium::FoldError;
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};
use thiserror::Error;

pub use horn;
pub use lower;
pub use medium;

/// Any error that aborts a compilation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[allow(missing_docs)]
    #[error(transparent)]
    Translation(#[from] TranslationError),
    #[allow(missing_docs)]
    #[error(transparent)]
    Fold(#[from] FoldError),
}

/// The flat program handed to a back end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Compiled {
    /// Rules over base types only, with unit invocations
    pub rules: Vec<Rule>,
    /// Names of query rules
    pub queries: BTreeSet<String>,
    /// Names of test rules with their expected outcome
    pub tests: BTreeMap<String, TestOutcome>,
    /// Per-step renderings, if tracing was enabled
    pub trace: Vec<TraceEntry>,
}

#[derive(Serialize)]
struct Report<'a> {
    rules: Vec<String>,
    queries: &'a BTreeSet<String>,
    tests: &'a BTreeMap<String, TestOutcome>,
    trace: &'a [TraceEntry],
}

impl Compiled {
    /// The rendered rules, query and test tables, and trace as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&Report {
            rules: self.rules.iter().map(|r| r.to_string()).collect(),
            queries: &self.queries,
            tests: &self.tests,
            trace: &self.trace,
        })
    }
}

/// Run the standard pipeline over every rule of `program` and, if
/// configured, the medium-step folder over the result. The output is checked
/// to be flat.
pub fn compile(
    program: &Program,
    registry: Arc<SelectorRegistry>,
    conf: &TranslationConf,
) -> Result<Compiled, CompileError> {
    let oracle: Arc<dyn RuleTypeOracle> = Arc::new(program.oracle());
    let translated = Pipeline::standard(conf, registry, oracle.clone()).run(program.rules.clone())?;
    let rules = if conf.medium_step {
        // merged clauses carry renamed-apart variables
        medium::medium_step(translated.rules, oracle.as_ref())?
            .into_iter()
            .map(rename)
            .collect::<Result<Vec<_>, _>>()?
    } else {
        translated.rules
    };
    check_flattened(&rules)?;
    log::info!("compiled {} rules", rules.len());
    Ok(Compiled {
        rules,
        queries: program.queries.clone(),
        tests: program.tests.clone(),
        trace: translated.trace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use horn::syntax::{Atom, Clause, CompoundInvocation, Predicate};

    #[test]
    fn test_json_report() {
        let p = Predicate::new("P", &[], &[]);
        let mut program = Program::new();
        program
            .add_query(Rule::new(
                "q",
                CompoundInvocation::unit(),
                vec![Clause::new(vec![], Atom::new(&p, vec![], vec![]), BTreeMap::new())],
            ))
            .unwrap();
        program
            .add_test(
                Rule::new("t", CompoundInvocation::unit(), vec![]),
                TestOutcome::Sat,
            )
            .unwrap();
        let compiled = compile(
            &program,
            Arc::new(SelectorRegistry::with_builtins()),
            &TranslationConf::default(),
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&compiled.to_json().unwrap()).unwrap();
        assert_eq!(json["rules"][0], "rule q:\n  P()");
        assert_eq!(json["queries"][0], "q");
        assert_eq!(json["tests"]["t"], "Sat");
        assert_eq!(json["trace"], serde_json::json!([]));
    }
}
