// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Structural traversal of [`Expr`] children.
//!
//! The children of an expression are its direct sub-expressions in a fixed
//! order. Selector arguments of a sum are children; the start elements of
//! custom aggregations are not, since they live in the shared declaration.

use crate::syntax::{Binder, CompoundInvocation, Expr, Invocation, MatchArm, VarKind};

impl Expr {
    /// The direct sub-expressions, in order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Int(_) | Expr::Bool(_) | Expr::Var(..) | Expr::Const(_) => vec![],
            Expr::ArrayInit(e) | Expr::Not(e) | Expr::BvNot(e) => vec![&**e],
            Expr::IntOp(_, lhs, rhs) | Expr::BoolOp(_, lhs, rhs) | Expr::Cmp(_, lhs, rhs) => {
                vec![&**lhs, &**rhs]
            }
            Expr::Select { array, index } => vec![&**array, &**index],
            Expr::Store {
                array,
                index,
                value,
            } => vec![&**array, &**index, &**value],
            Expr::Ite { cond, then, else_ } => vec![&**cond, &**then, &**else_],
            Expr::Sum {
                invocation, body, ..
            } => invocation
                .invocations()
                .iter()
                .flat_map(|inv| inv.args.iter())
                .chain([&**body])
                .collect(),
            Expr::App { params, args, .. } => params.iter().chain(args.iter()).collect(),
            Expr::Construct { fields, .. } => fields.iter().collect(),
            Expr::Match { scrutinees, arms } => scrutinees
                .iter()
                .chain(arms.iter().map(|arm| &arm.result))
                .collect(),
        }
    }

    /// Rebuild the expression with every direct child replaced by `f(child)`.
    /// The first error aborts the traversal.
    pub fn try_map_children<E>(
        &self,
        mut f: impl FnMut(&Expr) -> Result<Expr, E>,
    ) -> Result<Expr, E> {
        let mut f = |e: &Expr| f(e).map(Box::new);
        Ok(match self {
            Expr::Int(_) | Expr::Bool(_) | Expr::Var(..) | Expr::Const(_) => self.clone(),
            Expr::ArrayInit(e) => Expr::ArrayInit(f(e)?),
            Expr::Not(e) => Expr::Not(f(e)?),
            Expr::BvNot(e) => Expr::BvNot(f(e)?),
            Expr::IntOp(op, lhs, rhs) => Expr::IntOp(*op, f(lhs)?, f(rhs)?),
            Expr::BoolOp(op, lhs, rhs) => Expr::BoolOp(*op, f(lhs)?, f(rhs)?),
            Expr::Cmp(op, lhs, rhs) => Expr::Cmp(*op, f(lhs)?, f(rhs)?),
            Expr::Select { array, index } => Expr::Select {
                array: f(array)?,
                index: f(index)?,
            },
            Expr::Store {
                array,
                index,
                value,
            } => Expr::Store {
                array: f(array)?,
                index: f(index)?,
                value: f(value)?,
            },
            Expr::Ite { cond, then, else_ } => Expr::Ite {
                cond: f(cond)?,
                then: f(then)?,
                else_: f(else_)?,
            },
            Expr::Sum {
                invocation,
                body,
                op,
            } => {
                let invocations = invocation
                    .invocations()
                    .iter()
                    .map(|inv| {
                        Ok(Invocation {
                            function: inv.function.clone(),
                            bindings: inv.bindings.clone(),
                            args: inv
                                .args
                                .iter()
                                .map(|a| f(a).map(|a| *a))
                                .collect::<Result<_, E>>()?,
                        })
                    })
                    .collect::<Result<Vec<_>, E>>()?;
                Expr::Sum {
                    invocation: CompoundInvocation::new(invocations),
                    body: f(body)?,
                    op: op.clone(),
                }
            }
            Expr::App { op, params, args } => Expr::App {
                op: op.clone(),
                params: params
                    .iter()
                    .map(|e| f(e).map(|e| *e))
                    .collect::<Result<_, E>>()?,
                args: args
                    .iter()
                    .map(|e| f(e).map(|e| *e))
                    .collect::<Result<_, E>>()?,
            },
            Expr::Construct { ty, ctor, fields } => Expr::Construct {
                ty: ty.clone(),
                ctor: ctor.clone(),
                fields: fields
                    .iter()
                    .map(|e| f(e).map(|e| *e))
                    .collect::<Result<_, E>>()?,
            },
            Expr::Match { scrutinees, arms } => Expr::Match {
                scrutinees: scrutinees
                    .iter()
                    .map(|e| f(e).map(|e| *e))
                    .collect::<Result<_, E>>()?,
                arms: arms
                    .iter()
                    .map(|arm| {
                        Ok(MatchArm {
                            patterns: arm.patterns.clone(),
                            result: *f(&arm.result)?,
                        })
                    })
                    .collect::<Result<_, E>>()?,
            },
        })
    }

    /// Infallible version of [`Expr::try_map_children`].
    pub fn map_children(&self, mut f: impl FnMut(&Expr) -> Expr) -> Expr {
        match self.try_map_children(|e| Ok::<_, std::convert::Infallible>(f(e))) {
            Ok(e) => e,
            Err(never) => match never {},
        }
    }

    /// Whether `pred` holds for this expression or any sub-expression.
    pub fn any(&self, pred: &impl Fn(&Expr) -> bool) -> bool {
        pred(self) || self.children().into_iter().any(|e| e.any(pred))
    }

    /// Every occurrence of a variable of the given kind, in traversal order.
    /// Occurrences are not filtered by scope.
    pub fn vars(&self, kind: VarKind) -> Vec<Binder> {
        let mut found = vec![];
        self.collect_vars(kind, &mut found);
        found
    }

    fn collect_vars(&self, kind: VarKind, found: &mut Vec<Binder>) {
        if let Expr::Var(k, binder) = self {
            if *k == kind {
                found.push(binder.clone());
            }
        }
        for child in self.children() {
            child.collect_vars(kind, found);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::syntax::*;

    #[test]
    fn test_map_children_preserves_shape() {
        let e = Expr::ite(
            Expr::free("c", &Type::Bool),
            Expr::int(1),
            Expr::add(Expr::int(2), Expr::int(3)),
        );
        let bumped = e.map_children(|c| match c {
            Expr::Int(n) => Expr::Int(n.clone() + 10),
            _ => c.clone(),
        });
        assert_eq!(
            bumped,
            Expr::ite(
                Expr::free("c", &Type::Bool),
                Expr::int(11),
                Expr::add(Expr::int(2), Expr::int(3)),
            )
        );
    }

    #[test]
    fn test_vars_by_kind() {
        let e = Expr::add(
            Expr::free("x", &Type::Int),
            Expr::mul(Expr::param("p", &Type::Int), Expr::free("y", &Type::Int)),
        );
        let names: Vec<_> = e
            .vars(VarKind::Free)
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(e.vars(VarKind::Local), vec![]);
    }

    #[test]
    fn test_any_finds_nested_sums() {
        let f = SelectorFunction::new("range", &[Type::Int], &[Type::Int]);
        let sum = Expr::sum(
            CompoundInvocation::single(Invocation::new(
                &f,
                vec![Binder::new("i", &Type::Int)],
                vec![Expr::int(3)],
            )),
            Expr::param("i", &Type::Int),
            SumOp::Simple(SimpleSum::Add),
        );
        let e = Expr::eq(Expr::free("x", &Type::Int), sum);
        assert!(e.any(&|e| matches!(e, Expr::Sum { .. })));
        assert!(!e.any(&|e| matches!(e, Expr::App { .. })));
    }
}
