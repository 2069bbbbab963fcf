// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Classification of rules into queries, tests and ordinary rules.

use horn::syntax::Rule;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// The result a back end reports for a query.
#[derive(Serialize, Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TestOutcome {
    #[allow(missing_docs)]
    Sat,
    #[allow(missing_docs)]
    Unsat,
}

/// Tells the translation which rules must survive it.
pub trait RuleTypeOracle: Send + Sync {
    /// Whether the rule is a query or a test; such rules are never removed.
    fn is_query_or_test(&self, rule: &Rule) -> bool;
    /// Whether the rule is a test with an expected outcome.
    fn is_test(&self, rule: &Rule) -> bool;
    /// Whether `outcome` is what the test expects.
    fn is_expected_test_result(&self, rule: &Rule, outcome: TestOutcome) -> bool;
}

/// An oracle backed by tables of rule names.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgramOracle {
    /// Names of query rules
    pub queries: BTreeSet<String>,
    /// Names of test rules and their expected outcomes
    pub tests: BTreeMap<String, TestOutcome>,
}

impl RuleTypeOracle for ProgramOracle {
    fn is_query_or_test(&self, rule: &Rule) -> bool {
        self.queries.contains(&rule.name) || self.is_test(rule)
    }

    fn is_test(&self, rule: &Rule) -> bool {
        self.tests.contains_key(&rule.name)
    }

    fn is_expected_test_result(&self, rule: &Rule, outcome: TestOutcome) -> bool {
        self.tests.get(&rule.name) == Some(&outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horn::syntax::CompoundInvocation;

    #[test]
    fn test_program_oracle() {
        let oracle = ProgramOracle {
            queries: BTreeSet::from(["q".to_string()]),
            tests: BTreeMap::from([("t".to_string(), TestOutcome::Unsat)]),
        };
        let rule = |name| horn::syntax::Rule::new(name, CompoundInvocation::unit(), vec![]);
        assert!(oracle.is_query_or_test(&rule("q")));
        assert!(!oracle.is_test(&rule("q")));
        assert!(oracle.is_query_or_test(&rule("t")));
        assert!(oracle.is_expected_test_result(&rule("t"), TestOutcome::Unsat));
        assert!(!oracle.is_expected_test_result(&rule("t"), TestOutcome::Sat));
        assert!(!oracle.is_query_or_test(&rule("r")));
    }
}
