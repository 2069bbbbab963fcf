// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Enumeration of selector function invocations.
//!
//! Selector functions are implemented outside the compiler and registered by
//! name in a [`SelectorRegistry`]. Providers must be deterministic and finite:
//! the order in which they yield elements is the order in which aggregations
//! are unrolled and rules are instantiated.

use horn::{
    semantics::{eval, Assignment, Value},
    syntax::{CompoundInvocation, Invocation, Type},
};
use itertools::Itertools;
use num_bigint::BigInt;
use std::{collections::HashMap, fmt, sync::Arc};

use crate::error::TranslationError;

/// One element yielded by a selector function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selected {
    /// A single primitive, bound to an invocation with one parameter
    Scalar(Value),
    /// A tuple of primitives, one per parameter of the invocation
    Tuple(Vec<Value>),
}

impl fmt::Display for Selected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selected::Scalar(v) => write!(f, "{v}"),
            Selected::Tuple(vs) => write!(f, "({})", vs.iter().join(", ")),
        }
    }
}

/// The implementation of a selector function: given argument values, the
/// finite list of elements to enumerate, or a message describing a failure.
pub type Provider = Arc<dyn Fn(&[Value]) -> Result<Vec<Selected>, String> + Send + Sync>;

/// A name-indexed table of selector function implementations.
#[derive(Clone, Default)]
pub struct SelectorRegistry {
    providers: HashMap<String, Provider>,
}

impl fmt::Debug for SelectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.providers.keys().sorted())
            .finish()
    }
}

fn int_arg(args: &[Value], i: usize) -> Result<&BigInt, String> {
    match args.get(i) {
        Some(Value::Int(n)) => Ok(n),
        Some(v) => Err(format!("argument {i} should be an integer, got {v}")),
        None => Err(format!("missing argument {i}")),
    }
}

impl SelectorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in selector functions:
    /// `interval(lo, hi)` enumerates the integers in `[lo, hi)` and
    /// `booleans()` enumerates `false` then `true`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("interval", |args| {
            let lo = int_arg(args, 0)?;
            let hi = int_arg(args, 1)?;
            let mut values = vec![];
            let mut i = lo.clone();
            while &i < hi {
                values.push(Selected::Scalar(Value::Int(i.clone())));
                i += BigInt::from(1);
            }
            Ok(values)
        });
        registry.register("booleans", |_| {
            Ok(vec![
                Selected::Scalar(Value::Bool(false)),
                Selected::Scalar(Value::Bool(true)),
            ])
        });
        registry
    }

    /// Register a provider. The first registration of a name wins: returns
    /// false (and drops `provider`) if the name is already taken.
    pub fn register(
        &mut self,
        name: &str,
        provider: impl Fn(&[Value]) -> Result<Vec<Selected>, String> + Send + Sync + 'static,
    ) -> bool {
        if self.providers.contains_key(name) {
            log::debug!("ignoring second registration of selector function {name}");
            return false;
        }
        self.providers.insert(name.to_string(), Arc::new(provider));
        true
    }

    /// Whether a provider is registered under the name.
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Enumerate a single invocation, evaluating its arguments under the
    /// ambient bindings. The returned bindings contain only the invocation's
    /// own parameters.
    pub fn invoke_single(
        &self,
        ambient: &Assignment,
        invocation: &Invocation,
    ) -> Result<Vec<Assignment>, TranslationError> {
        let function = &invocation.function;
        if function.is_unit() {
            return Ok(vec![Assignment::new()]);
        }
        let provider = self
            .providers
            .get(&function.name)
            .ok_or_else(|| TranslationError::MissingProvider(function.name.clone()))?;
        let args = invocation
            .args
            .iter()
            .map(|arg| eval(arg, ambient))
            .collect::<Result<Vec<_>, _>>()?;
        let selected = provider(&args).map_err(|message| TranslationError::ProviderFailed {
            function: function.name.clone(),
            message,
        })?;
        log::trace!(
            "{}({}) yielded {} elements",
            function.name,
            args.iter().join(", "),
            selected.len()
        );
        selected
            .into_iter()
            .map(|s| bind(invocation, s))
            .collect()
    }

    /// Enumerate a compound invocation as a dependent product: every binding
    /// of the first invocation is extended with every binding of the rest,
    /// enumerated with the first binding in scope.
    ///
    /// The enumeration is lazy; later providers are called as the iterator is
    /// advanced. Every call re-runs the providers.
    pub fn invoke<'a>(
        &'a self,
        ambient: &Assignment,
        compound: &'a CompoundInvocation,
    ) -> Box<dyn Iterator<Item = Result<Assignment, TranslationError>> + 'a> {
        self.invoke_from(ambient.clone(), compound.invocations())
    }

    fn invoke_from<'a>(
        &'a self,
        ambient: Assignment,
        invocations: &'a [Invocation],
    ) -> Box<dyn Iterator<Item = Result<Assignment, TranslationError>> + 'a> {
        let Some((first, rest)) = invocations.split_first() else {
            return Box::new(std::iter::once(Ok(Assignment::new())));
        };
        let bindings = match self.invoke_single(&ambient, first) {
            Ok(bindings) => bindings,
            Err(err) => return Box::new(std::iter::once(Err(err))),
        };
        Box::new(bindings.into_iter().flat_map(
            move |binding| -> Box<dyn Iterator<Item = Result<Assignment, TranslationError>> + 'a> {
                let inner = match join_distinct(&ambient, &binding) {
                    Ok(inner) => inner,
                    Err(err) => return Box::new(std::iter::once(Err(err))),
                };
                Box::new(
                    self.invoke_from(inner, rest)
                        .map(move |r| r.and_then(|more| join_distinct(&binding, &more))),
                )
            },
        ))
    }
}

/// Union of two name-disjoint bindings.
pub fn join_distinct(a: &Assignment, b: &Assignment) -> Result<Assignment, TranslationError> {
    if let Some(name) = b.keys().find(|name| a.contains_key(*name)) {
        return Err(TranslationError::DuplicateBinding(name.clone()));
    }
    Ok(a.clone().union(b.clone()))
}

fn describe(types: &[Type]) -> String {
    match types {
        [ty] => ty.to_string(),
        _ => format!("({})", types.iter().join(", ")),
    }
}

/// Convert one yielded element to a binding of the invocation's parameters.
fn bind(invocation: &Invocation, selected: Selected) -> Result<Assignment, TranslationError> {
    let names = &invocation.bindings;
    let declared: Vec<Type> = names.iter().map(|b| b.ty.clone()).collect();
    let malformed = |found: &Selected| TranslationError::MalformedSelection {
        function: invocation.function.name.clone(),
        expected: describe(&declared),
        found: found.to_string(),
    };
    let values = match (&selected, names.len()) {
        (Selected::Scalar(v @ (Value::Int(_) | Value::Bool(_))), 1) => vec![v.clone()],
        (Selected::Tuple(vs), n) if n != 1 && vs.len() == n => vs.clone(),
        _ => return Err(malformed(&selected)),
    };
    let returns = &invocation.function.returns;
    let type_ok = values.iter().enumerate().all(|(i, v)| {
        let ty = v.ty();
        ty == declared[i] && (returns.len() != values.len() || ty == returns[i])
    });
    if !type_ok {
        return Err(malformed(&selected));
    }
    Ok(names
        .iter()
        .zip(values)
        .map(|(b, v)| (b.name.clone(), v))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use horn::syntax::{Binder, Expr, SelectorFunction};

    fn registry() -> SelectorRegistry {
        let mut registry = SelectorRegistry::with_builtins();
        // {1, 2, 3} for even arguments, {5} for odd ones
        registry.register("choices", |args| {
            let n = int_arg(args, 0)?;
            let values: Vec<i64> = if n % BigInt::from(2) == BigInt::from(0) {
                vec![1, 2, 3]
            } else {
                vec![5]
            };
            Ok(values
                .into_iter()
                .map(|v| Selected::Scalar(Value::from(v)))
                .collect())
        });
        registry.register("pairs", |_| {
            Ok(vec![
                Selected::Tuple(vec![Value::from(1), Value::from(true)]),
                Selected::Tuple(vec![Value::from(2), Value::from(false)]),
            ])
        });
        registry
    }

    fn interval(name: &str, lo: Expr, hi: Expr) -> Invocation {
        let f = SelectorFunction::new("interval", &[Type::Int, Type::Int], &[Type::Int]);
        Invocation::new(&f, vec![Binder::new(name, &Type::Int)], vec![lo, hi])
    }

    fn choices(name: &str, arg: Expr) -> Invocation {
        let f = SelectorFunction::new("choices", &[Type::Int], &[Type::Int]);
        Invocation::new(&f, vec![Binder::new(name, &Type::Int)], vec![arg])
    }

    fn run(compound: &CompoundInvocation) -> Result<Vec<Assignment>, TranslationError> {
        registry().invoke(&Assignment::new(), compound).collect()
    }

    #[test]
    fn test_unit_yields_one_empty_binding() {
        let all = run(&CompoundInvocation::unit()).unwrap();
        assert_eq!(all, vec![Assignment::new()]);
    }

    #[test]
    fn test_dependent_product() {
        let compound = CompoundInvocation::new(vec![
            interval("a", Expr::int(0), Expr::int(5)),
            choices("b", Expr::param("a", &Type::Int)),
        ]);
        let all = run(&compound).unwrap();
        assert_eq!(all.len(), 3 + 1 + 3 + 1 + 3);
        assert_eq!(
            all[3],
            Assignment::from(vec![
                ("a".to_string(), Value::from(1)),
                ("b".to_string(), Value::from(5)),
            ])
        );
    }

    #[test]
    fn test_independent_product() {
        let compound = CompoundInvocation::new(vec![
            interval("a", Expr::int(0), Expr::int(5)),
            choices("b", Expr::int(0)),
        ]);
        assert_eq!(run(&compound).unwrap().len(), 5 * 3);
    }

    #[test]
    fn test_ambient_bindings_reach_arguments() {
        let registry = registry();
        let inv = interval("i", Expr::int(0), Expr::param("n", &Type::Int));
        let ambient = Assignment::unit("n".to_string(), Value::from(3));
        let all = registry.invoke_single(&ambient, &inv).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].get("i"), Some(&Value::from(2)));
    }

    #[test]
    fn test_tuples() {
        let f = SelectorFunction::new("pairs", &[], &[Type::Int, Type::Bool]);
        let inv = Invocation::new(
            &f,
            vec![Binder::new("x", &Type::Int), Binder::new("y", &Type::Bool)],
            vec![],
        );
        let all = registry().invoke_single(&Assignment::new(), &inv).unwrap();
        assert_eq!(all[1].get("y"), Some(&Value::from(false)));

        // a tuple provider used with a single binding is malformed
        let one = Invocation::new(&f, vec![Binder::new("x", &Type::Int)], vec![]);
        assert!(matches!(
            registry().invoke_single(&Assignment::new(), &one),
            Err(TranslationError::MalformedSelection { .. })
        ));
    }

    #[test]
    fn test_wrong_type_is_malformed() {
        let f = SelectorFunction::new("booleans", &[], &[Type::Int]);
        let inv = Invocation::new(&f, vec![Binder::new("x", &Type::Int)], vec![]);
        assert!(matches!(
            registry().invoke_single(&Assignment::new(), &inv),
            Err(TranslationError::MalformedSelection { .. })
        ));
    }

    #[test]
    fn test_duplicate_binding_fails() {
        let compound = CompoundInvocation::new(vec![
            interval("a", Expr::int(0), Expr::int(2)),
            interval("a", Expr::int(0), Expr::int(2)),
        ]);
        assert_eq!(
            run(&compound),
            Err(TranslationError::DuplicateBinding("a".to_string()))
        );
    }

    #[test]
    fn test_missing_provider() {
        let f = SelectorFunction::new("nowhere", &[], &[Type::Int]);
        let inv = Invocation::new(&f, vec![Binder::new("x", &Type::Int)], vec![]);
        assert_eq!(
            run(&CompoundInvocation::single(inv)),
            Err(TranslationError::MissingProvider("nowhere".to_string()))
        );
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = registry();
        assert!(!registry.register("interval", |_| Ok(vec![])));
        let inv = interval("i", Expr::int(0), Expr::int(4));
        let all = registry.invoke_single(&Assignment::new(), &inv).unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_provider_failure() {
        let inv = interval("i", Expr::true_(), Expr::int(4));
        assert!(matches!(
            registry().invoke_single(&Assignment::new(), &inv),
            Err(TranslationError::ProviderFailed { .. })
        ));
    }
}
