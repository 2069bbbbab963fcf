// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Unrolling of aggregations over selector function invocations.
//!
//! An aggregation is replaced by the combination of one instance of its body
//! per enumerated binding, in enumeration order. The members of a flattened
//! custom aggregation refer to each other's accumulators, so a whole family
//! is unrolled at once and memoized in a [`FamilyCache`].

use horn::{
    semantics::Assignment,
    syntax::{CompoundInvocation, Expr, SumFamily, SumOp, VarKind},
    term::subst::{substitute, Substitution},
};
use std::{collections::HashMap, sync::Arc};

use crate::{
    error::TranslationError,
    selector::{join_distinct, SelectorRegistry},
};

/// Progress of one family under one ambient binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FamilyState {
    /// The family is being unrolled
    Pending,
    /// The unrolled expression of every member, by member index
    Filled(Vec<Expr>),
}

/// Unrolled families, keyed by the ambient binding they were unrolled under.
///
/// Each entry moves from absent to [`FamilyState::Pending`] to
/// [`FamilyState::Filled`] exactly once. The cache is not meant to be shared
/// between threads; it lives for the instantiation of one clause.
#[derive(Clone, Debug, Default)]
pub struct FamilyCache {
    entries: HashMap<Assignment, HashMap<Arc<SumFamily>, FamilyState>>,
}

impl FamilyCache {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// The state of a family under an ambient binding, if it was reserved.
    pub fn state(&self, ambient: &Assignment, family: &Arc<SumFamily>) -> Option<&FamilyState> {
        self.entries.get(ambient)?.get(family)
    }

    /// Mark a family as being unrolled.
    pub fn reserve(
        &mut self,
        ambient: &Assignment,
        family: &Arc<SumFamily>,
    ) -> Result<(), TranslationError> {
        match self.state(ambient, family) {
            Some(FamilyState::Pending) => Err(TranslationError::FamilyPending(family.name.clone())),
            Some(FamilyState::Filled(_)) => {
                Err(TranslationError::FamilyFilledTwice(family.name.clone()))
            }
            None => {
                self.entries
                    .entry(ambient.clone())
                    .or_default()
                    .insert(family.clone(), FamilyState::Pending);
                Ok(())
            }
        }
    }

    /// Record the unrolled members of a family.
    pub fn fill(
        &mut self,
        ambient: &Assignment,
        family: &Arc<SumFamily>,
        members: Vec<Expr>,
    ) -> Result<(), TranslationError> {
        assert_eq!(members.len(), family.accs.len());
        if let Some(FamilyState::Filled(_)) = self.state(ambient, family) {
            return Err(TranslationError::FamilyFilledTwice(family.name.clone()));
        }
        self.entries
            .entry(ambient.clone())
            .or_default()
            .insert(family.clone(), FamilyState::Filled(members));
        Ok(())
    }

    /// The unrolled expression of one member of a filled family.
    pub fn member(
        &self,
        ambient: &Assignment,
        family: &Arc<SumFamily>,
        member: usize,
    ) -> Result<&Expr, TranslationError> {
        match self.state(ambient, family) {
            Some(FamilyState::Filled(members)) => Ok(&members[member]),
            _ => Err(TranslationError::FamilyNotFilled(family.name.clone())),
        }
    }
}

/// Substitutes bound parameters and unrolls aggregations within one clause.
pub struct Instantiator<'r> {
    registry: &'r SelectorRegistry,
    families: FamilyCache,
}

impl<'r> Instantiator<'r> {
    /// A fresh instantiator with an empty family cache.
    pub fn new(registry: &'r SelectorRegistry) -> Self {
        Instantiator {
            registry,
            families: FamilyCache::new(),
        }
    }

    /// Replace every variable bound by `env` with its value and unroll every
    /// aggregation. Free variables are left alone.
    pub fn instantiate(&mut self, e: &Expr, env: &Assignment) -> Result<Expr, TranslationError> {
        match e {
            Expr::Var(VarKind::Local | VarKind::Param, binder) => Ok(env
                .get(&binder.name)
                .map(|v| v.to_expr())
                .unwrap_or_else(|| e.clone())),
            Expr::Sum {
                invocation,
                body,
                op,
            } => self.unroll(invocation, body, op, env),
            _ => e.try_map_children(|child| self.instantiate(child, env)),
        }
    }

    /// Unroll one aggregation under the ambient bindings.
    pub fn unroll(
        &mut self,
        invocation: &CompoundInvocation,
        body: &Expr,
        op: &SumOp,
        env: &Assignment,
    ) -> Result<Expr, TranslationError> {
        let registry = self.registry;
        match op {
            SumOp::Simple(simple) => {
                let mut acc = simple.start();
                for binding in registry.invoke(env, invocation) {
                    let inner = join_distinct(env, &binding?)?;
                    let next = self.instantiate(body, &inner)?;
                    acc = simple.combine(acc, next);
                }
                Ok(acc)
            }
            SumOp::Custom(custom) => {
                let mut acc = self.instantiate(&custom.start, env)?;
                for binding in registry.invoke(env, invocation) {
                    let inner = join_distinct(env, &binding?)?;
                    let next = self.instantiate(body, &inner)?;
                    let s = Substitution::from([((VarKind::Local, custom.acc.name.clone()), acc)]);
                    acc = substitute(&next, &s);
                }
                Ok(acc)
            }
            SumOp::Inlined(inlined) => {
                if self.families.state(env, &inlined.family).is_none() {
                    self.unroll_family(&inlined.family, env)?;
                }
                self.families
                    .member(env, &inlined.family, inlined.member)
                    .cloned()
            }
        }
    }

    /// Unroll all members of a family together. In every iteration each
    /// member's body sees the accumulators of the previous iteration.
    fn unroll_family(
        &mut self,
        family: &Arc<SumFamily>,
        env: &Assignment,
    ) -> Result<(), TranslationError> {
        self.families.reserve(env, family)?;
        let registry = self.registry;
        let mut accs = family
            .starts
            .iter()
            .map(|start| self.instantiate(start, env))
            .collect::<Result<Vec<_>, _>>()?;
        let mut iterations = 0;
        for binding in registry.invoke(env, &family.invocation) {
            let inner = join_distinct(env, &binding?)?;
            let s: Substitution = family
                .accs
                .iter()
                .zip(&accs)
                .map(|(b, e)| ((VarKind::Local, b.name.clone()), e.clone()))
                .collect();
            accs = family
                .bodies
                .iter()
                .map(|body| Ok(substitute(&self.instantiate(body, &inner)?, &s)))
                .collect::<Result<Vec<_>, TranslationError>>()?;
            iterations += 1;
        }
        log::trace!(
            "unrolled family {} over {iterations} bindings",
            family.name
        );
        self.families.fill(env, family, accs)
    }
}
