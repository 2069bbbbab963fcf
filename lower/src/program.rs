// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The resolved program handed over by a front end.

use horn::syntax::{CustomType, Operation, Rule};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use crate::{
    error::TranslationError,
    oracle::{ProgramOracle, TestOutcome},
};

/// Declarations of one or more compilation units.
///
/// Units are merged in file order, so definitions from earlier files are
/// visible in later ones. Every name is defined at most once.
#[derive(Clone, Debug, Default)]
pub struct Program {
    /// Custom types by name
    pub types: BTreeMap<String, Arc<CustomType>>,
    /// Operations by name
    pub operations: BTreeMap<String, Arc<Operation>>,
    /// Rules, in definition order
    pub rules: Vec<Rule>,
    /// Names of query rules
    pub queries: BTreeSet<String>,
    /// Names of test rules with their expected outcome
    pub tests: BTreeMap<String, TestOutcome>,
}

fn redefined(kind: &'static str, name: &str) -> TranslationError {
    TranslationError::Redefined {
        kind,
        name: name.to_string(),
    }
}

impl Program {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(missing_docs)]
    pub fn add_type(&mut self, ty: Arc<CustomType>) -> Result<(), TranslationError> {
        if self.types.contains_key(&ty.name) {
            return Err(redefined("type", &ty.name));
        }
        self.types.insert(ty.name.clone(), ty);
        Ok(())
    }

    #[allow(missing_docs)]
    pub fn add_operation(&mut self, op: Arc<Operation>) -> Result<(), TranslationError> {
        if self.operations.contains_key(&op.name) {
            return Err(redefined("operation", &op.name));
        }
        self.operations.insert(op.name.clone(), op);
        Ok(())
    }

    #[allow(missing_docs)]
    pub fn add_rule(&mut self, rule: Rule) -> Result<(), TranslationError> {
        if self.rules.iter().any(|r| r.name == rule.name) {
            return Err(redefined("rule", &rule.name));
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Add a rule and mark it as a query.
    pub fn add_query(&mut self, rule: Rule) -> Result<(), TranslationError> {
        let name = rule.name.clone();
        self.add_rule(rule)?;
        self.queries.insert(name);
        Ok(())
    }

    /// Add a rule and mark it as a test with an expected outcome.
    pub fn add_test(&mut self, rule: Rule, expected: TestOutcome) -> Result<(), TranslationError> {
        let name = rule.name.clone();
        self.add_rule(rule)?;
        self.tests.insert(name, expected);
        Ok(())
    }

    /// Merge a later compilation unit into this one.
    pub fn extend(&mut self, unit: Program) -> Result<(), TranslationError> {
        for ty in unit.types.into_values() {
            self.add_type(ty)?;
        }
        for op in unit.operations.into_values() {
            self.add_operation(op)?;
        }
        for rule in unit.rules {
            if let Some(expected) = unit.tests.get(&rule.name) {
                self.add_test(rule, *expected)?;
            } else if unit.queries.contains(&rule.name) {
                self.add_query(rule)?;
            } else {
                self.add_rule(rule)?;
            }
        }
        Ok(())
    }

    /// Merge compilation units in order.
    pub fn from_units(units: impl IntoIterator<Item = Program>) -> Result<Self, TranslationError> {
        let mut program = Program::new();
        for unit in units {
            program.extend(unit)?;
        }
        Ok(program)
    }

    /// An oracle answering from the query and test tables.
    pub fn oracle(&self) -> ProgramOracle {
        ProgramOracle {
            queries: self.queries.clone(),
            tests: self.tests.clone(),
        }
    }
}
