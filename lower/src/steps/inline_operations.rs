// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Replace operation applications with the operation's body.

use horn::{
    syntax::{Binder, Expr, Rule, VarKind},
    term::subst::{substitute, Substitution},
};

use super::try_map_rule_exprs;
use crate::error::TranslationError;

fn arity(
    operation: &str,
    what: &'static str,
    formals: &[Binder],
    actuals: &[Expr],
) -> Result<(), TranslationError> {
    if formals.len() == actuals.len() {
        Ok(())
    } else {
        Err(TranslationError::OperationArity {
            operation: operation.to_string(),
            what,
            expected: formals.len(),
            found: actuals.len(),
        })
    }
}

/// Inline every application in `e`, including applications that appear in
/// inlined bodies.
///
/// Arguments replace the operation's arguments positionally. Parameters are
/// replaced the same way when the application passes them; an application
/// without parameters leaves the body's parameters to be bound by the
/// enclosing selector invocations.
pub fn inline_expr(e: &Expr) -> Result<Expr, TranslationError> {
    match e {
        Expr::App { op, params, args } => {
            arity(&op.name, "arguments", &op.args, args)?;
            if !params.is_empty() {
                arity(&op.name, "parameters", &op.params, params)?;
            }
            let mut s = Substitution::new();
            for (formal, actual) in op.params.iter().zip(params) {
                s.insert((VarKind::Param, formal.name.clone()), inline_expr(actual)?);
            }
            for (formal, actual) in op.args.iter().zip(args) {
                s.insert((VarKind::Local, formal.name.clone()), inline_expr(actual)?);
            }
            inline_expr(&substitute(&op.body, &s))
        }
        _ => e.try_map_children(inline_expr),
    }
}

/// Inline every application in the rule.
pub fn inline_operations(rule: Rule) -> Result<Rule, TranslationError> {
    try_map_rule_exprs(&rule, inline_expr)
}
