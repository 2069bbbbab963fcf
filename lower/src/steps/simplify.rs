// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Normalize predicate applications and premise lists.

use horn::{
    semantics::{eval, Assignment, Value},
    syntax::{Atom, Clause, Expr, Predicate, Proposition, Rule},
};
use itertools::Itertools;

fn name_part(value: &Value) -> Option<String> {
    match value {
        Value::Int(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) => None,
    }
}

/// Move constant parameters into the predicate name: `P{1, true}(x)` becomes
/// `P[1,true](x)`. Atoms with a non-constant parameter are left alone.
///
/// The bracketed suffix is the last one in the name and holds only literals,
/// so distinct names or parameter values never give the same relation, and a
/// declared identifier cannot clash with a specialized name.
pub fn specialize(atom: &Atom) -> Atom {
    if atom.params.is_empty() {
        return atom.clone();
    }
    let parts: Option<Vec<String>> = atom
        .params
        .iter()
        .map(|e| eval(e, &Assignment::new()).ok().as_ref().and_then(name_part))
        .collect();
    match parts {
        Some(parts) => Atom {
            predicate: Predicate {
                name: format!("{}[{}]", atom.predicate.name, parts.join(",")),
                params: vec![],
                args: atom.predicate.args.clone(),
            },
            params: vec![],
            args: atom.args.clone(),
        },
        None => atom.clone(),
    }
}

fn simplify_clause(clause: &Clause) -> Clause {
    let premises = clause
        .premises
        .iter()
        .filter(|p| !matches!(p, Proposition::Expr(Expr::Bool(true))))
        .map(|p| match p {
            Proposition::Predicate(atom) => Proposition::Predicate(specialize(atom)),
            Proposition::Expr(_) => p.clone(),
        })
        .unique()
        .collect();
    Clause {
        premises,
        conclusion: specialize(&clause.conclusion),
        free_vars: clause.free_vars.clone(),
    }
}

/// Specialize predicates and drop duplicate and trivially true premises.
pub fn simplify(rule: Rule) -> Rule {
    Rule {
        clauses: rule.clauses.iter().map(simplify_clause).collect(),
        ..rule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horn::syntax::{CompoundInvocation, Type};
    use std::collections::BTreeMap;

    #[test]
    fn test_specialize_and_dedupe() {
        let p = Predicate::new("P", &[Type::Int, Type::Bool], &[Type::Int]);
        let q = Predicate::new("Q", &[], &[Type::Int]);
        let x = Expr::free("x", &Type::Int);
        let q_x = Proposition::Predicate(Atom::new(&q, vec![], vec![x.clone()]));
        let clause = Clause::new(
            vec![
                q_x.clone(),
                Proposition::Expr(Expr::true_()),
                q_x,
                Proposition::Expr(Expr::lt(x.clone(), Expr::int(3))),
            ],
            Atom::new(
                &p,
                vec![Expr::sub(Expr::int(0), Expr::int(5)), Expr::true_()],
                vec![x],
            ),
            BTreeMap::from([("x".to_string(), Type::Int)]),
        );
        let rule = simplify(Rule::new("r", CompoundInvocation::unit(), vec![clause]));
        insta::assert_display_snapshot!(rule.clauses[0], @"forall x:int. Q(x), x < 3 => P[-5,true](x)");
        assert!(rule.clauses[0].conclusion.predicate.params.is_empty());
    }

    #[test]
    fn test_non_constant_parameters_are_kept() {
        let p = Predicate::new("P", &[Type::Int], &[]);
        let atom = Atom::new(&p, vec![Expr::free("y", &Type::Int)], vec![]);
        assert_eq!(specialize(&atom), atom);
    }

    #[test]
    fn test_specialized_names_are_distinct() {
        let x = Expr::free("x", &Type::Int);
        let two = Predicate::new("P", &[Type::Int, Type::Int], &[Type::Int]);
        let one = Predicate::new("P_1", &[Type::Int], &[Type::Int]);
        let plain = Predicate::new("P_1_2", &[], &[Type::Int]);
        let p_1_2 = specialize(&Atom::new(&two, vec![Expr::int(1), Expr::int(2)], vec![x.clone()]));
        let p1_2 = specialize(&Atom::new(&one, vec![Expr::int(2)], vec![x.clone()]));
        assert_eq!(p_1_2.predicate.name, "P[1,2]");
        assert_eq!(p1_2.predicate.name, "P_1[2]");
        assert_ne!(p_1_2.predicate, p1_2.predicate);
        assert_ne!(p_1_2.predicate, plain);
        assert_ne!(p1_2.predicate, plain);

        let p = Predicate::new("P", &[Type::Int], &[Type::Int]);
        let minus = specialize(&Atom::new(&p, vec![Expr::int(-1)], vec![x.clone()]));
        let p_n = Predicate::new("P_n", &[Type::Int], &[Type::Int]);
        let n1 = specialize(&Atom::new(&p_n, vec![Expr::int(1)], vec![x]));
        assert_ne!(minus.predicate, n1.predicate);
    }
}
