// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Where each predicate occurs.

use horn::syntax::{Clause, Predicate, Rule};
use std::collections::BTreeMap;

/// The position of a clause in a rule list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClauseId {
    /// Index of the rule
    pub rule: usize,
    /// Index of the clause within the rule
    pub clause: usize,
}

/// The clauses a predicate occurs in. A clause with the same predicate in two
/// premises is listed twice.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Occurrences {
    #[allow(missing_docs)]
    pub as_premise: Vec<ClauseId>,
    #[allow(missing_docs)]
    pub as_conclusion: Vec<ClauseId>,
}

/// Occurrences of every predicate that appears in a rule list.
#[derive(Clone, Debug, Default)]
pub struct OccurrenceIndex {
    predicates: BTreeMap<Predicate, Occurrences>,
}

impl OccurrenceIndex {
    /// Scan the premises and conclusion of every clause.
    pub fn build(rules: &[Rule]) -> Self {
        let mut predicates: BTreeMap<Predicate, Occurrences> = BTreeMap::new();
        for (r, rule) in rules.iter().enumerate() {
            for (c, clause) in rule.clauses.iter().enumerate() {
                let id = ClauseId { rule: r, clause: c };
                for atom in clause.premise_atoms() {
                    predicates
                        .entry(atom.predicate.clone())
                        .or_default()
                        .as_premise
                        .push(id);
                }
                predicates
                    .entry(clause.conclusion.predicate.clone())
                    .or_default()
                    .as_conclusion
                    .push(id);
            }
        }
        OccurrenceIndex { predicates }
    }

    /// The occurrences of `predicate`; empty if it does not appear.
    pub fn get(&self, predicate: &Predicate) -> Occurrences {
        self.predicates.get(predicate).cloned().unwrap_or_default()
    }

    /// Whether `predicate` is a premise of some clause.
    pub fn is_consumed(&self, predicate: &Predicate) -> bool {
        self.predicates
            .get(predicate)
            .map_or(false, |o| !o.as_premise.is_empty())
    }

    #[allow(missing_docs)]
    pub fn iter(&self) -> impl Iterator<Item = (&Predicate, &Occurrences)> {
        self.predicates.iter()
    }
}

/// Look up a clause by its id.
pub fn clause<'a>(rules: &'a [Rule], id: ClauseId) -> &'a Clause {
    &rules[id.rule].clauses[id.clause]
}

#[cfg(test)]
mod tests {
    use super::*;
    use horn::syntax::{Atom, CompoundInvocation, Expr, Proposition, Type};
    use std::collections::BTreeMap;

    #[test]
    fn test_occurrences() {
        let a = Predicate::new("A", &[], &[Type::Int]);
        let b = Predicate::new("B", &[], &[Type::Int]);
        let x = Expr::free("x", &Type::Int);
        let vars = BTreeMap::from([("x".to_string(), Type::Int)]);
        let a_x = Proposition::Predicate(Atom::new(&a, vec![], vec![x.clone()]));
        let rules = vec![
            Rule::new(
                "r",
                CompoundInvocation::unit(),
                vec![Clause::new(vec![], Atom::new(&a, vec![], vec![Expr::int(0)]), BTreeMap::new())],
            ),
            Rule::new(
                "s",
                CompoundInvocation::unit(),
                vec![Clause::new(
                    vec![a_x.clone(), a_x],
                    Atom::new(&b, vec![], vec![x]),
                    vars,
                )],
            ),
        ];
        let index = OccurrenceIndex::build(&rules);
        let s0 = ClauseId { rule: 1, clause: 0 };
        assert_eq!(
            index.get(&a),
            Occurrences {
                as_premise: vec![s0, s0],
                as_conclusion: vec![ClauseId { rule: 0, clause: 0 }],
            }
        );
        assert!(!index.is_consumed(&b));
        assert_eq!(index.get(&b).as_conclusion, vec![s0]);
        assert_eq!(index.iter().count(), 2);
        assert_eq!(clause(&rules, s0).premises.len(), 2);
    }
}
