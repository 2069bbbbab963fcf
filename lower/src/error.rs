// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Errors raised while lowering rules.
//!
//! None of these are recoverable: the first one aborts the compilation run.

use horn::{semantics::EvalError, syntax::Type};
use thiserror::Error;

/// An error encountered during translation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// A constant sub-expression could not be evaluated.
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// No provider is registered for the selector function.
    #[error("no provider is registered for selector function {0}")]
    MissingProvider(String),
    /// The provider itself reported a failure.
    #[allow(missing_docs)]
    #[error("selector function {function} failed: {message}")]
    ProviderFailed { function: String, message: String },
    /// A provider yielded an element that does not fit the invocation's
    /// bindings or the function's declared return types.
    #[allow(missing_docs)]
    #[error("selector function {function} yielded {found}, expected {expected}")]
    MalformedSelection {
        function: String,
        expected: String,
        found: String,
    },
    /// The same parameter name was bound twice in one enumeration.
    #[error("parameter {0} is bound more than once")]
    DuplicateBinding(String),

    /// A family member was read before the family was unrolled.
    #[error("sum family {0} was read before it was filled")]
    FamilyNotFilled(String),
    /// A family was unrolled twice for the same bindings.
    #[error("sum family {0} was filled twice")]
    FamilyFilledTwice(String),
    /// A family's unrolling depends on itself.
    #[error("sum family {0} is already being unrolled")]
    FamilyPending(String),

    /// Arrays have no constructors to test for.
    #[error("cannot test a value of type {0} for a constructor")]
    SelectOnArray(Type),
    /// A pattern or construction names a constructor the type does not have.
    #[allow(missing_docs)]
    #[error("type {ty} has no constructor {constructor}")]
    UnknownConstructor { ty: Type, constructor: String },
    /// An operation was applied to the wrong number of parameters or arguments.
    #[allow(missing_docs)]
    #[error("operation {operation} expected {expected} {what} but found {found}")]
    OperationArity {
        operation: String,
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// A match had no arms to translate.
    #[error("match over {0} has no arms")]
    EmptyMatch(String),
    /// A clause mentions a free variable missing from its declarations.
    #[error("free variable {0} is not declared by its clause")]
    UndeclaredFreeVar(String),
    /// The final rules still contain constructs that should have been lowered.
    #[allow(missing_docs)]
    #[error("rule {rule} is not flattened: {reason}")]
    NotFlattened { rule: String, reason: String },
    /// A name was defined twice across compilation units.
    #[allow(missing_docs)]
    #[error("{kind} {name} is defined more than once")]
    Redefined { kind: &'static str, name: String },

    /// Attach the rule being translated to an error.
    #[allow(missing_docs)]
    #[error("in rule {rule}: {source}")]
    InRule {
        rule: String,
        #[source]
        source: Box<TranslationError>,
    },
}

impl TranslationError {
    /// Wrap the error with the name of the rule it arose in. Errors that
    /// already name a rule are left alone.
    pub fn in_rule(self, rule: &str) -> Self {
        match self {
            TranslationError::InRule { .. } | TranslationError::NotFlattened { .. } => self,
            _ => TranslationError::InRule {
                rule: rule.to_string(),
                source: Box::new(self),
            },
        }
    }
}
