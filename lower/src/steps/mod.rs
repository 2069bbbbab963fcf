// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The rewrites that make up the standard pipeline, in pipeline order.

use horn::syntax::{CompoundInvocation, Expr, Invocation, Rule};

pub mod filter;
pub mod fold;
pub mod inline_operations;
pub mod inline_types;
pub mod instantiate;
pub mod rename;
pub mod simplify;

/// Rebuild a rule with every expression replaced by `f(e)`: the selector
/// arguments of the rule's own invocation and every expression of every clause.
pub fn try_map_rule_exprs<E>(
    rule: &Rule,
    mut f: impl FnMut(&Expr) -> Result<Expr, E>,
) -> Result<Rule, E> {
    let invocations = rule
        .invocation
        .invocations()
        .iter()
        .map(|inv| {
            Ok(Invocation {
                function: inv.function.clone(),
                bindings: inv.bindings.clone(),
                args: inv.args.iter().map(&mut f).collect::<Result<_, E>>()?,
            })
        })
        .collect::<Result<Vec<_>, E>>()?;
    let clauses = rule
        .clauses
        .iter()
        .map(|clause| clause.try_map_exprs(&mut f))
        .collect::<Result<_, E>>()?;
    Ok(Rule {
        name: rule.name.clone(),
        invocation: CompoundInvocation::new(invocations),
        clauses,
    })
}
