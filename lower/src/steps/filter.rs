// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Drop clauses that can never fire.

use horn::syntax::{Clause, Expr, Proposition, Rule};
use std::sync::Arc;

use crate::oracle::RuleTypeOracle;

/// Removes clauses with a premise that folded to `false`, and rules that are
/// left without clauses unless the oracle says they are queries or tests.
/// Premises that folded to `true` are dropped from the remaining clauses.
#[derive(Clone)]
pub struct InapplicableClauseFilter {
    oracle: Arc<dyn RuleTypeOracle>,
}

fn applicable(clause: &Clause) -> bool {
    !clause
        .premises
        .iter()
        .any(|p| matches!(p, Proposition::Expr(Expr::Bool(false))))
}

impl InapplicableClauseFilter {
    #[allow(missing_docs)]
    pub fn new(oracle: Arc<dyn RuleTypeOracle>) -> Self {
        InapplicableClauseFilter { oracle }
    }

    /// The rule without its inapplicable clauses; nothing if the rule can be
    /// dropped altogether.
    pub fn filter(&self, rule: Rule) -> Vec<Rule> {
        let before = rule.clauses.len();
        let clauses: Vec<Clause> = rule
            .clauses
            .into_iter()
            .filter(applicable)
            .map(|clause| Clause {
                premises: clause
                    .premises
                    .into_iter()
                    .filter(|p| !matches!(p, Proposition::Expr(Expr::Bool(true))))
                    .collect(),
                ..clause
            })
            .collect();
        if clauses.len() < before {
            log::debug!(
                "dropped {} inapplicable clauses of {}",
                before - clauses.len(),
                rule.name
            );
        }
        let rule = Rule { clauses, ..rule };
        if rule.clauses.is_empty() && !self.oracle.is_query_or_test(&rule) {
            vec![]
        } else {
            vec![rule]
        }
    }
}
