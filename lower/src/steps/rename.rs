// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Give the free variables of each clause short canonical names.

use horn::{
    syntax::{Clause, Expr, Rule, VarKind},
    term::subst::{substitute, Substitution},
};
use itertools::Itertools;
use std::collections::BTreeMap;

use crate::error::TranslationError;

/// Rename the free variables used by `clause` to `v0`, `v1`, ... in the order
/// of their original names, and drop declarations nothing uses.
pub fn rename_clause(clause: &Clause) -> Result<Clause, TranslationError> {
    if let Some(b) = clause.undeclared_free_vars().first() {
        return Err(TranslationError::UndeclaredFreeVar(b.name.clone()));
    }
    let used: Vec<String> = clause
        .exprs()
        .flat_map(|e| e.vars(VarKind::Free))
        .map(|b| b.name)
        .sorted()
        .dedup()
        .collect();
    let mut s = Substitution::new();
    let mut free_vars = BTreeMap::new();
    for (i, name) in used.iter().enumerate() {
        let fresh = format!("v{i}");
        let ty = &clause.free_vars[name];
        s.insert((VarKind::Free, name.clone()), Expr::free(&fresh, ty));
        free_vars.insert(fresh, ty.clone());
    }
    let renamed = clause.try_map_exprs(|e| Ok::<_, TranslationError>(substitute(e, &s)))?;
    Ok(Clause {
        free_vars,
        ..renamed
    })
}

/// Rename the free variables of every clause.
pub fn rename(rule: Rule) -> Result<Rule, TranslationError> {
    let clauses = rule
        .clauses
        .iter()
        .map(rename_clause)
        .collect::<Result<_, _>>()?;
    Ok(Rule { clauses, ..rule })
}

#[cfg(test)]
mod tests {
    use super::*;
    use horn::syntax::{Atom, Predicate, Proposition, Type};

    #[test]
    fn test_canonical_names() {
        let p = Predicate::new("P", &[], &[Type::Int, Type::Bool]);
        let q = Predicate::new("Q", &[], &[Type::Int]);
        let clause = Clause::new(
            vec![
                Proposition::Predicate(Atom::new(&q, vec![], vec![Expr::free("y", &Type::Int)])),
                Proposition::Expr(Expr::free("flag", &Type::Bool)),
            ],
            Atom::new(
                &p,
                vec![],
                vec![Expr::free("y", &Type::Int), Expr::free("flag", &Type::Bool)],
            ),
            BTreeMap::from([
                ("y".to_string(), Type::Int),
                ("flag".to_string(), Type::Bool),
                ("unused".to_string(), Type::Int),
            ]),
        );
        let renamed = rename_clause(&clause).unwrap();
        insta::assert_display_snapshot!(renamed, @"forall v0:bool, v1:int. Q(v1), v0 => P(v1, v0)");
    }

    #[test]
    fn test_undeclared_variable() {
        let p = Predicate::new("P", &[], &[Type::Int]);
        let clause = Clause::new(
            vec![],
            Atom::new(&p, vec![], vec![Expr::free("x", &Type::Int)]),
            BTreeMap::new(),
        );
        assert_eq!(
            rename_clause(&clause),
            Err(TranslationError::UndeclaredFreeVar("x".to_string()))
        );
    }
}
