// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Verification that translated rules only use what the back end supports.

use horn::syntax::{Clause, Expr, Predicate, Rule};

use crate::error::TranslationError;

fn unsupported(e: &Expr) -> Option<&'static str> {
    match e {
        Expr::Sum { .. } => Some("an aggregation"),
        Expr::App { .. } => Some("an operation application"),
        Expr::Match { .. } => Some("a match"),
        Expr::Construct { .. } => Some("a constructor application"),
        Expr::Const(_) => Some("a named constant"),
        _ if !e.ty().is_base() => Some("a custom-typed expression"),
        _ => None,
    }
}

fn check_expr(e: &Expr) -> Result<(), String> {
    if let Some(what) = unsupported(e) {
        return Err(format!("{what} remains in {e}"));
    }
    e.children().into_iter().try_for_each(check_expr)
}

fn check_predicate(p: &Predicate) -> Result<(), String> {
    match p.params.iter().chain(&p.args).find(|ty| !ty.is_base()) {
        Some(ty) => Err(format!("predicate {} has an argument of type {ty}", p.name)),
        None => Ok(()),
    }
}

fn check_clause(clause: &Clause) -> Result<(), String> {
    if let Some((name, ty)) = clause.free_vars.iter().find(|(_, ty)| !ty.is_base()) {
        return Err(format!("free variable {name} has type {ty}"));
    }
    for atom in clause.premise_atoms().chain([&clause.conclusion]) {
        check_predicate(&atom.predicate)?;
    }
    clause.exprs().try_for_each(check_expr)
}

/// Check that every rule has no selector invocation left and that its clauses
/// mention only integers, booleans and arrays of them, with no aggregation,
/// application, match, constructor or named constant.
pub fn check_flattened(rules: &[Rule]) -> Result<(), TranslationError> {
    for rule in rules {
        let fail = |reason: String| TranslationError::NotFlattened {
            rule: rule.name.clone(),
            reason,
        };
        if !rule.invocation.is_unit() {
            return Err(fail(format!(
                "selector invocation {} remains",
                rule.invocation
            )));
        }
        for clause in &rule.clauses {
            check_clause(clause).map_err(fail)?;
        }
    }
    Ok(())
}
