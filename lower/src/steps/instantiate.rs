// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Instantiate rules for every binding of their selector invocation.

use horn::{
    semantics::Assignment,
    syntax::{CompoundInvocation, Rule},
};
use std::sync::Arc;

use crate::{error::TranslationError, selector::SelectorRegistry, sum::Instantiator};

/// The parameter instantiation step.
#[derive(Clone, Debug)]
pub struct ParameterInstantiator {
    registry: Arc<SelectorRegistry>,
}

impl ParameterInstantiator {
    #[allow(missing_docs)]
    pub fn new(registry: Arc<SelectorRegistry>) -> Self {
        ParameterInstantiator { registry }
    }

    /// One rule per binding of the rule's invocation, in enumeration order.
    /// Every parameter is replaced with its value and every aggregation is
    /// unrolled; the results have the [`CompoundInvocation::unit`] invocation.
    pub fn instantiate_rule(&self, rule: Rule) -> Result<Vec<Rule>, TranslationError> {
        let mut rules = vec![];
        for binding in self.registry.invoke(&Assignment::new(), &rule.invocation) {
            let env = binding?;
            let clauses = rule
                .clauses
                .iter()
                .map(|clause| {
                    // family caches never outlive a clause
                    let mut instantiator = Instantiator::new(&self.registry);
                    clause.try_map_exprs(|e| instantiator.instantiate(e, &env))
                })
                .collect::<Result<Vec<_>, _>>()?;
            rules.push(Rule::new(&rule.name, CompoundInvocation::unit(), clauses));
        }
        log::debug!("{} has {} instances", rule.name, rules.len());
        Ok(rules)
    }
}
