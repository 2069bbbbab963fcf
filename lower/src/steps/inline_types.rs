// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Replace custom-typed values by their fixed-width layout.
//!
//! Every expression is translated to the list of its slots (one per element of
//! [`TypeLayouter::unfold`] of its type). Constructor applications are laid
//! out, matches become chains of conditionals, free variables and predicate
//! arguments are split per slot, and custom aggregations over custom-typed
//! accumulators become families of primitive aggregations.

use horn::syntax::{
    Atom, Binder, Clause, CmpOp, CompoundInvocation, Constructor, CustomSum, CustomType, Expr,
    InlinedSum, Invocation, MatchArm, Pattern, Predicate, Proposition, Rule, SumFamily, SumOp,
    Type, VarKind,
};
use std::{collections::BTreeMap, sync::Arc};

use super::inline_operations::inline_expr;
use crate::{error::TranslationError, layout::TypeLayouter};

/// Slots of the variables bound by enclosing match patterns.
type Scope = im::HashMap<String, Vec<Expr>>;

/// The type inlining step.
#[derive(Copy, Clone, Debug, Default)]
pub struct TypeInliner {
    #[allow(missing_docs)]
    pub layouter: TypeLayouter,
}

impl TypeInliner {
    #[allow(missing_docs)]
    pub fn new(layouter: TypeLayouter) -> Self {
        TypeInliner { layouter }
    }

    /// Flatten every type in the rule.
    pub fn inline_rule(&self, rule: Rule) -> Result<Rule, TranslationError> {
        let invocations = rule
            .invocation
            .invocations()
            .iter()
            .map(|inv| self.invocation(inv, &Scope::new()))
            .collect::<Result<Vec<_>, _>>()?;
        let clauses = rule
            .clauses
            .iter()
            .map(|clause| self.clause(clause))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Rule {
            name: rule.name,
            invocation: CompoundInvocation::new(invocations),
            clauses,
        })
    }

    /// Flatten a clause: its free variables, premises and predicates.
    pub fn clause(&self, clause: &Clause) -> Result<Clause, TranslationError> {
        let scope = Scope::new();
        let free_vars: BTreeMap<String, Type> = clause
            .free_vars
            .iter()
            .flat_map(|(name, ty)| {
                self.layouter.translate_binder(&Binder::new(name, ty))
            })
            .map(|b| (b.name, b.ty))
            .collect();
        let premises = clause
            .premises
            .iter()
            .map(|p| {
                Ok(match p {
                    Proposition::Predicate(atom) => Proposition::Predicate(self.atom(atom)?),
                    Proposition::Expr(e) => Proposition::Expr(self.single(e, &scope)?),
                })
            })
            .collect::<Result<_, TranslationError>>()?;
        Ok(Clause {
            premises,
            conclusion: self.atom(&clause.conclusion)?,
            free_vars,
        })
    }

    /// Flatten a predicate's signature.
    pub fn predicate(&self, predicate: &Predicate) -> Predicate {
        let unfold = |types: &[Type]| -> Vec<Type> {
            types.iter().flat_map(|ty| self.layouter.unfold(ty)).collect()
        };
        Predicate {
            name: predicate.name.clone(),
            params: unfold(&predicate.params),
            args: unfold(&predicate.args),
        }
    }

    fn atom(&self, atom: &Atom) -> Result<Atom, TranslationError> {
        let scope = Scope::new();
        let flatten = |es: &[Expr]| -> Result<Vec<Expr>, TranslationError> {
            Ok(es
                .iter()
                .map(|e| self.translate(e, &scope))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .flatten()
                .collect())
        };
        Ok(Atom {
            predicate: self.predicate(&atom.predicate),
            params: flatten(&atom.params)?,
            args: flatten(&atom.args)?,
        })
    }

    fn invocation(&self, inv: &Invocation, scope: &Scope) -> Result<Invocation, TranslationError> {
        Ok(Invocation {
            function: inv.function.clone(),
            bindings: inv.bindings.clone(),
            args: inv
                .args
                .iter()
                .map(|a| self.single(a, scope))
                .collect::<Result<_, _>>()?,
        })
    }

    /// Translate an expression of a primitive type (or an array of one).
    fn single(&self, e: &Expr, scope: &Scope) -> Result<Expr, TranslationError> {
        let mut slots = self.translate(e, scope)?;
        assert_eq!(slots.len(), 1, "{e} should have a single slot");
        Ok(slots.remove(0))
    }

    /// Translate an expression to its slots.
    fn translate(&self, e: &Expr, scope: &Scope) -> Result<Vec<Expr>, TranslationError> {
        Ok(match e {
            Expr::Int(_) | Expr::Bool(_) => vec![e.clone()],
            Expr::Const(c) => {
                if c.value.ty().is_base() {
                    vec![e.clone()]
                } else {
                    self.translate(&c.value, scope)?
                }
            }
            Expr::Var(kind, binder) => match scope.get(&binder.name) {
                Some(slots) if *kind == VarKind::Local => slots.clone(),
                _ => self.layouter.translate_var(*kind, binder),
            },
            Expr::ArrayInit(init) => self
                .translate(init, scope)?
                .into_iter()
                .map(Expr::array_init)
                .collect(),
            Expr::IntOp(op, lhs, rhs) => {
                vec![Expr::int_op(
                    *op,
                    self.single(lhs, scope)?,
                    self.single(rhs, scope)?,
                )]
            }
            Expr::BoolOp(op, lhs, rhs) => vec![Expr::BoolOp(
                *op,
                Box::new(self.single(lhs, scope)?),
                Box::new(self.single(rhs, scope)?),
            )],
            Expr::Cmp(op @ (CmpOp::Eq | CmpOp::Neq), lhs, rhs) => {
                let ty = lhs.ty();
                let lhs = self.translate(lhs, scope)?;
                let rhs = self.translate(rhs, scope)?;
                let eq = self.equal(&ty, &lhs, &rhs)?;
                if *op == CmpOp::Eq {
                    vec![eq]
                } else {
                    vec![negate(eq)]
                }
            }
            Expr::Cmp(op, lhs, rhs) => vec![Expr::cmp(
                *op,
                self.single(lhs, scope)?,
                self.single(rhs, scope)?,
            )],
            Expr::Not(arg) => vec![Expr::Not(Box::new(self.single(arg, scope)?))],
            Expr::BvNot(arg) => vec![Expr::BvNot(Box::new(self.single(arg, scope)?))],
            Expr::Select { array, index } => {
                let index = self.single(index, scope)?;
                self.translate(array, scope)?
                    .into_iter()
                    .map(|slot| Expr::select(slot, index.clone()))
                    .collect()
            }
            Expr::Store {
                array,
                index,
                value,
            } => {
                let index = self.single(index, scope)?;
                let values = self.translate(value, scope)?;
                self.translate(array, scope)?
                    .into_iter()
                    .zip(values)
                    .map(|(slot, value)| Expr::store(slot, index.clone(), value))
                    .collect()
            }
            Expr::Ite { cond, then, else_ } => {
                let cond = self.single(cond, scope)?;
                let then = self.translate(then, scope)?;
                let else_ = self.translate(else_, scope)?;
                then.into_iter()
                    .zip(else_)
                    .map(|(t, e)| Expr::ite(cond.clone(), t, e))
                    .collect()
            }
            Expr::Construct { ty, ctor, fields } => {
                let fields = fields
                    .iter()
                    .map(|f| self.translate(f, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                self.layouter.layout_construct(ty, ctor, fields)?
            }
            Expr::Match { scrutinees, arms } => self.translate_match(e, scrutinees, arms, scope)?,
            Expr::Sum {
                invocation,
                body,
                op,
            } => self.translate_sum(invocation, body, op, scope)?,
            Expr::App { .. } => self.translate(&inline_expr(e)?, scope)?,
        })
    }

    /// Equality of two laid-out values of type `ty`: equal discriminants and
    /// equal fields of the constructor they name. Slots of other constructors
    /// are ignored.
    fn equal(&self, ty: &Type, lhs: &[Expr], rhs: &[Expr]) -> Result<Expr, TranslationError> {
        match ty {
            Type::Custom(custom) => {
                let mut conjuncts = vec![Expr::eq(lhs[0].clone(), rhs[0].clone())];
                for ctor in custom.constructors.iter().filter(|c| !c.params.is_empty()) {
                    let active = self.layouter.select_expr(ty, ctor, lhs)?;
                    let lfields = self.layouter.flattened_fields(custom, ctor, lhs)?;
                    let rfields = self.layouter.flattened_fields(custom, ctor, rhs)?;
                    let fields = ctor
                        .params
                        .iter()
                        .zip(lfields.iter().zip(&rfields))
                        .map(|(param, (l, r))| self.equal(param, l, r))
                        .collect::<Result<Vec<_>, _>>()?;
                    conjuncts.push(Expr::or(negate(active), Expr::conjoin(fields)));
                }
                Ok(Expr::conjoin(conjuncts))
            }
            _ => Ok(Expr::conjoin(
                lhs.iter()
                    .zip(rhs)
                    .map(|(l, r)| Expr::eq(l.clone(), r.clone())),
            )),
        }
    }

    /// The condition under which `pattern` matches the laid-out `value`, and
    /// the slots of the variables it binds.
    fn pattern(
        &self,
        pattern: &Pattern,
        ty: &Type,
        value: &[Expr],
        conditions: &mut Vec<Expr>,
        scope: &mut Scope,
    ) -> Result<(), TranslationError> {
        match pattern {
            Pattern::Wildcard(name) => {
                scope.insert(name.clone(), value.to_vec());
            }
            Pattern::Value(ctor, fields) => {
                conditions.push(self.layouter.select_expr(ty, ctor, value)?);
                if let Type::Custom(custom) = ty {
                    let known = custom_constructor(custom, &ctor.name)?;
                    let slots = self.layouter.flattened_fields(custom, known, value)?;
                    for ((sub, param), slots) in fields.iter().zip(&known.params).zip(slots) {
                        self.pattern(sub, param, &slots, conditions, scope)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn translate_match(
        &self,
        e: &Expr,
        scrutinees: &[Expr],
        arms: &[MatchArm],
        scope: &Scope,
    ) -> Result<Vec<Expr>, TranslationError> {
        let values = scrutinees
            .iter()
            .map(|s| Ok((s.ty(), self.translate(s, scope)?)))
            .collect::<Result<Vec<_>, TranslationError>>()?;
        let mut translated = vec![];
        for arm in arms {
            let mut conditions = vec![];
            let mut inner = scope.clone();
            for (pattern, (ty, value)) in arm.patterns.iter().zip(&values) {
                self.pattern(pattern, ty, value, &mut conditions, &mut inner)?;
            }
            translated.push((
                Expr::conjoin(conditions),
                self.translate(&arm.result, &inner)?,
            ));
        }
        // the last arm is the fallback
        let Some((_, mut result)) = translated.pop() else {
            return Err(TranslationError::EmptyMatch(e.to_string()));
        };
        for (cond, slots) in translated.into_iter().rev() {
            result = slots
                .into_iter()
                .zip(result)
                .map(|(then, else_)| Expr::ite(cond.clone(), then, else_))
                .collect();
        }
        Ok(result)
    }

    fn translate_sum(
        &self,
        invocation: &CompoundInvocation,
        body: &Expr,
        op: &SumOp,
        scope: &Scope,
    ) -> Result<Vec<Expr>, TranslationError> {
        let invocation = CompoundInvocation::new(
            invocation
                .invocations()
                .iter()
                .map(|inv| self.invocation(inv, scope))
                .collect::<Result<_, _>>()?,
        );
        match op {
            SumOp::Simple(_) | SumOp::Inlined(_) => Ok(vec![Expr::sum(
                invocation,
                self.single(body, scope)?,
                op.clone(),
            )]),
            SumOp::Custom(custom) => {
                let accs = self.layouter.translate_binder(&custom.acc);
                if accs.len() == 1 && accs[0] == custom.acc {
                    let op = SumOp::Custom(CustomSum::new(
                        &custom.name,
                        custom.acc.clone(),
                        self.single(&custom.start, scope)?,
                    ));
                    return Ok(vec![Expr::sum(invocation, self.single(body, scope)?, op)]);
                }
                let starts = self.translate(&custom.start, scope)?;
                let in_body = scope.update(
                    custom.acc.name.clone(),
                    accs.iter()
                        .map(|b| Expr::Var(VarKind::Local, b.clone()))
                        .collect(),
                );
                let bodies = self.translate(body, &in_body)?;
                let family = Arc::new(SumFamily {
                    name: custom.name.clone(),
                    invocation: invocation.clone(),
                    accs,
                    starts,
                    bodies,
                });
                log::trace!(
                    "{} became a family of {} members",
                    custom.name,
                    family.accs.len()
                );
                Ok((0..family.accs.len())
                    .map(|member| {
                        Expr::sum(
                            invocation.clone(),
                            family.bodies[member].clone(),
                            SumOp::Inlined(InlinedSum {
                                family: family.clone(),
                                member,
                            }),
                        )
                    })
                    .collect())
            }
        }
    }
}

fn custom_constructor<'a>(
    custom: &'a Arc<CustomType>,
    name: &str,
) -> Result<&'a Constructor, TranslationError> {
    custom
        .constructor(name)
        .ok_or_else(|| TranslationError::UnknownConstructor {
            ty: Type::Custom(custom.clone()),
            constructor: name.to_string(),
        })
}

fn negate(e: Expr) -> Expr {
    match e {
        Expr::Cmp(CmpOp::Eq, lhs, rhs) => Expr::Cmp(CmpOp::Neq, lhs, rhs),
        _ => Expr::not(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::DiscriminantStrategy;
    use horn::semantics::{eval, Assignment, Value};

    fn option() -> Arc<CustomType> {
        CustomType::new(
            "Option",
            vec![
                Constructor::new("None", &[]),
                Constructor::new("Some", &[Type::Int]),
            ],
        )
    }

    fn inliner() -> TypeInliner {
        TypeInliner::default()
    }

    fn eval_single(e: &Expr) -> Value {
        let slots = inliner().translate(e, &Scope::new()).unwrap();
        assert_eq!(slots.len(), 1);
        eval(&slots[0], &Assignment::new()).unwrap()
    }

    fn unwrap_or(value: Expr, default: i64) -> Expr {
        Expr::Match {
            scrutinees: vec![value],
            arms: vec![
                MatchArm {
                    patterns: vec![Pattern::Value(
                        Constructor::new("Some", &[Type::Int]),
                        vec![Pattern::Wildcard("v".to_string())],
                    )],
                    result: Expr::local("v", &Type::Int),
                },
                MatchArm {
                    patterns: vec![Pattern::Wildcard("_".to_string())],
                    result: Expr::int(default),
                },
            ],
        }
    }

    #[test]
    fn test_construct_and_match() {
        let some = Expr::construct(&option(), "Some", vec![Expr::int(4)]);
        let none = Expr::construct(&option(), "None", vec![]);
        assert_eq!(eval_single(&unwrap_or(some, 0)), Value::from(4));
        assert_eq!(eval_single(&unwrap_or(none, 7)), Value::from(7));
    }

    #[test]
    fn test_match_on_free_variable() {
        let o = Expr::free("o", &Type::Custom(option()));
        let slots = inliner().translate(&unwrap_or(o, 0), &Scope::new()).unwrap();
        insta::assert_display_snapshot!(slots[0], @"if o?0 == 1 then o?1 else 0");
    }

    #[test]
    fn test_equality_ignores_inactive_fields() {
        let inliner = inliner();
        let ty = Type::Custom(option());
        // two Nones with different garbage in the Some slot
        let lhs = vec![Expr::int(0), Expr::int(3)];
        let rhs = vec![Expr::int(0), Expr::int(9)];
        let eq = inliner.equal(&ty, &lhs, &rhs).unwrap();
        assert_eq!(eval(&eq, &Assignment::new()), Ok(Value::from(true)));
        let lhs = vec![Expr::int(1), Expr::int(3)];
        let rhs = vec![Expr::int(1), Expr::int(9)];
        let eq = inliner.equal(&ty, &lhs, &rhs).unwrap();
        assert_eq!(eval(&eq, &Assignment::new()), Ok(Value::from(false)));
    }

    #[test]
    fn test_neq_of_constructed_values() {
        let some = |n| Expr::construct(&option(), "Some", vec![Expr::int(n)]);
        assert_eq!(eval_single(&Expr::neq(some(1), some(2))), Value::from(true));
        assert_eq!(eval_single(&Expr::eq(some(1), some(1))), Value::from(true));
    }

    #[test]
    fn test_arrays_of_custom_types() {
        let ty = Type::array(Type::Custom(option()));
        let a = Expr::free("a", &ty);
        let stored = Expr::store(
            a,
            Expr::int(0),
            Expr::construct(&option(), "Some", vec![Expr::int(5)]),
        );
        let slots = inliner().translate(&stored, &Scope::new()).unwrap();
        assert_eq!(slots.len(), 2);
        insta::assert_display_snapshot!(slots[0], @"a?0[0 := 1]");
        insta::assert_display_snapshot!(slots[1], @"a?1[0 := 5]");
    }

    #[test]
    fn test_clause_free_vars_and_predicates() {
        let ty = Type::Custom(option());
        let p = Predicate::new("P", &[], &[ty.clone(), Type::Int]);
        let clause = Clause::new(
            vec![],
            Atom::new(&p, vec![], vec![Expr::free("o", &ty), Expr::free("n", &Type::Int)]),
            BTreeMap::from([("o".to_string(), ty), ("n".to_string(), Type::Int)]),
        );
        let flat = inliner().clause(&clause).unwrap();
        assert_eq!(flat.conclusion.predicate.args, vec![Type::Int; 3]);
        assert_eq!(
            flat.free_vars.keys().collect::<Vec<_>>(),
            vec!["n", "o?0", "o?1"]
        );
        insta::assert_display_snapshot!(flat, @"forall n:int, o?0:int, o?1:int. P(o?0, o?1, n)");
    }

    #[test]
    fn test_custom_sum_becomes_family() {
        let inliner = TypeInliner::new(TypeLayouter::new(DiscriminantStrategy::Boolean));
        let ty = Type::Custom(option());
        let acc = Binder::new("best", &ty);
        let op = CustomSum::new("keep", acc, Expr::construct(&option(), "None", vec![]));
        let f = horn::syntax::SelectorFunction::new("interval", &[Type::Int, Type::Int], &[Type::Int]);
        let sum = Expr::sum(
            CompoundInvocation::single(Invocation::new(
                &f,
                vec![Binder::new("i", &Type::Int)],
                vec![Expr::int(0), Expr::int(2)],
            )),
            Expr::construct(&option(), "Some", vec![Expr::param("i", &Type::Int)]),
            SumOp::Custom(op),
        );
        let slots = inliner.translate(&sum, &Scope::new()).unwrap();
        assert_eq!(slots.len(), 2);
        let Expr::Sum { op: SumOp::Inlined(first), .. } = &slots[0] else {
            panic!("expected an inlined aggregation")
        };
        let Expr::Sum { op: SumOp::Inlined(second), .. } = &slots[1] else {
            panic!("expected an inlined aggregation")
        };
        assert_eq!(first.family, second.family);
        assert_eq!(first.family.starts, vec![Expr::false_(), Expr::int(0)]);
        assert_eq!((first.member, second.member), (0, 1));
    }
}
