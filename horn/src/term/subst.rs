// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Perform substitutions of variables by expressions.

use std::{collections::HashMap, sync::Arc};

use crate::syntax::{
    CompoundInvocation, CustomSum, Expr, InlinedSum, Invocation, MatchArm, Pattern, SumFamily,
    SumOp, VarKind,
};

/// A map from variables, identified by kind and name, to expressions.
pub type Substitution = HashMap<(VarKind, String), Expr>;

type Bound = im::HashSet<(VarKind, String)>;

/// Perform a substitution.
///
/// Variables bound inside the expression (sum parameters and accumulators,
/// match wildcards) shadow the substitution.
pub fn substitute(expr: &Expr, substitution: &Substitution) -> Expr {
    if substitution.is_empty() {
        return expr.clone();
    }
    substitute_rec(expr, substitution, &im::HashSet::new())
}

/// Build a substitution from `(kind, name, replacement)` triples.
pub fn substitution<'a>(entries: impl IntoIterator<Item = (VarKind, &'a str, Expr)>) -> Substitution {
    entries
        .into_iter()
        .map(|(kind, name, e)| ((kind, name.to_string()), e))
        .collect()
}

fn pattern_bindings(pattern: &Pattern, bound: &mut Bound) {
    match pattern {
        Pattern::Wildcard(name) => {
            bound.insert((VarKind::Local, name.clone()));
        }
        Pattern::Value(_, fields) => {
            for p in fields {
                pattern_bindings(p, bound);
            }
        }
    }
}

fn substitute_rec(expr: &Expr, substitution: &Substitution, bound: &Bound) -> Expr {
    match expr {
        Expr::Var(kind, binder) => {
            let key = (*kind, binder.name.clone());
            match substitution.get(&key) {
                Some(e) if !bound.contains(&key) => e.clone(),
                _ => expr.clone(),
            }
        }

        Expr::Sum {
            invocation,
            body,
            op,
        } => {
            // each invocation's bindings scope over the later arguments and the body
            let mut inner = bound.clone();
            let mut invocations = vec![];
            for inv in invocation.invocations() {
                invocations.push(Invocation {
                    function: inv.function.clone(),
                    bindings: inv.bindings.clone(),
                    args: inv
                        .args
                        .iter()
                        .map(|a| substitute_rec(a, substitution, &inner))
                        .collect(),
                });
                inner.extend(
                    inv.bindings
                        .iter()
                        .map(|b| (VarKind::Param, b.name.clone())),
                );
            }

            let invocation = CompoundInvocation::new(invocations);
            let (op, body) = match op {
                SumOp::Simple(_) => (op.clone(), substitute_rec(body, substitution, &inner)),
                SumOp::Custom(custom) => {
                    let mut in_body = inner.clone();
                    in_body.insert((VarKind::Local, custom.acc.name.clone()));
                    let op = SumOp::Custom(Arc::new(CustomSum {
                        name: custom.name.clone(),
                        acc: custom.acc.clone(),
                        start: substitute_rec(&custom.start, substitution, bound),
                    }));
                    (op, substitute_rec(body, substitution, &in_body))
                }
                SumOp::Inlined(inlined) => {
                    let family = &inlined.family;
                    let mut in_body = inner.clone();
                    in_body.extend(
                        family
                            .accs
                            .iter()
                            .map(|acc| (VarKind::Local, acc.name.clone())),
                    );
                    let op = SumOp::Inlined(InlinedSum {
                        family: Arc::new(SumFamily {
                            name: family.name.clone(),
                            invocation: invocation.clone(),
                            accs: family.accs.clone(),
                            starts: family
                                .starts
                                .iter()
                                .map(|s| substitute_rec(s, substitution, bound))
                                .collect(),
                            bodies: family
                                .bodies
                                .iter()
                                .map(|b| substitute_rec(b, substitution, &in_body))
                                .collect(),
                        }),
                        member: inlined.member,
                    });
                    (op, substitute_rec(body, substitution, &in_body))
                }
            };

            Expr::Sum {
                invocation,
                body: Box::new(body),
                op,
            }
        }

        Expr::Match { scrutinees, arms } => Expr::Match {
            scrutinees: scrutinees
                .iter()
                .map(|s| substitute_rec(s, substitution, bound))
                .collect(),
            arms: arms
                .iter()
                .map(|arm| {
                    let mut in_arm = bound.clone();
                    for p in &arm.patterns {
                        pattern_bindings(p, &mut in_arm);
                    }
                    MatchArm {
                        patterns: arm.patterns.clone(),
                        result: substitute_rec(&arm.result, substitution, &in_arm),
                    }
                })
                .collect(),
        },

        _ => expr.map_children(|e| substitute_rec(e, substitution, bound)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::*;

    #[test]
    fn test_substitute_respects_kinds() {
        let e = Expr::add(Expr::local("x", &Type::Int), Expr::param("x", &Type::Int));
        let s = substitution([(VarKind::Param, "x", Expr::int(4))]);
        assert_eq!(
            substitute(&e, &s),
            Expr::add(Expr::local("x", &Type::Int), Expr::int(4))
        );
    }

    #[test]
    fn test_substitute_shadowed_by_sum_binding() {
        let f = SelectorFunction::new("range", &[Type::Int], &[Type::Int]);
        let sum = |arg: Expr| {
            Expr::sum(
                CompoundInvocation::single(Invocation::new(
                    &f,
                    vec![Binder::new("i", &Type::Int)],
                    vec![arg],
                )),
                Expr::param("i", &Type::Int),
                SumOp::Simple(SimpleSum::Add),
            )
        };
        // `i` in the argument is the outer one; in the body it is the sum's own
        let e = sum(Expr::param("i", &Type::Int));
        let s = substitution([(VarKind::Param, "i", Expr::int(7))]);
        assert_eq!(substitute(&e, &s), sum(Expr::int(7)));
    }

    #[test]
    fn test_substitute_custom_start() {
        let f = SelectorFunction::new("range", &[Type::Int], &[Type::Int]);
        let op = |start: Expr| {
            SumOp::Custom(CustomSum::new(
                "max",
                Binder::new("acc", &Type::Int),
                start,
            ))
        };
        let e = Expr::sum(
            CompoundInvocation::single(Invocation::new(
                &f,
                vec![Binder::new("i", &Type::Int)],
                vec![Expr::int(3)],
            )),
            Expr::add(Expr::local("acc", &Type::Int), Expr::param("i", &Type::Int)),
            op(Expr::param("p", &Type::Int)),
        );
        let s = substitution([
            (VarKind::Param, "p", Expr::int(1)),
            (VarKind::Local, "acc", Expr::int(100)),
        ]);
        let Expr::Sum { op: new_op, body, .. } = substitute(&e, &s) else {
            panic!("substitution changed the expression kind")
        };
        assert_eq!(new_op, op(Expr::int(1)));
        assert_eq!(
            *body,
            Expr::add(Expr::local("acc", &Type::Int), Expr::param("i", &Type::Int))
        );
    }

    #[test]
    fn test_substitute_match_wildcards() {
        let e = Expr::Match {
            scrutinees: vec![Expr::local("x", &Type::Int)],
            arms: vec![
                MatchArm {
                    patterns: vec![Pattern::Value(Constructor::numeral(0), vec![])],
                    result: Expr::local("x", &Type::Int),
                },
                MatchArm {
                    patterns: vec![Pattern::Wildcard("x".to_string())],
                    result: Expr::local("x", &Type::Int),
                },
            ],
        };
        let s = substitution([(VarKind::Local, "x", Expr::int(5))]);
        let Expr::Match { scrutinees, arms } = substitute(&e, &s) else {
            panic!("substitution changed the expression kind")
        };
        assert_eq!(scrutinees, vec![Expr::int(5)]);
        assert_eq!(arms[0].result, Expr::int(5));
        assert_eq!(arms[1].result, Expr::local("x", &Type::Int));
    }
}
