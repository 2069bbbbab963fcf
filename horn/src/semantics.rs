// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Values of base types and evaluation of closed expressions.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, Zero};
use std::sync::Arc;
use thiserror::Error;

use crate::syntax::*;

/// A value of a primitive type or an array of them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    #[allow(missing_docs)]
    Int(BigInt),
    #[allow(missing_docs)]
    Bool(bool),
    #[allow(missing_docs)]
    Array(ArrayValue),
}

/// A total array: a default element plus finitely many overridden indices.
///
/// Overrides equal to the default are never stored, so equal arrays have equal
/// representations.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrayValue {
    init: Arc<Value>,
    overrides: im::OrdMap<BigInt, Value>,
}

impl ArrayValue {
    /// The array with every element equal to `init`.
    pub fn new(init: Value) -> Self {
        ArrayValue {
            init: Arc::new(init),
            overrides: im::OrdMap::new(),
        }
    }

    /// The element at `index`.
    pub fn select(&self, index: &BigInt) -> &Value {
        self.overrides.get(index).unwrap_or(&self.init)
    }

    /// The array updated at `index`.
    pub fn store(&self, index: BigInt, value: Value) -> Self {
        let overrides = if value == *self.init {
            self.overrides.without(&index)
        } else {
            self.overrides.update(index, value)
        };
        ArrayValue {
            init: self.init.clone(),
            overrides,
        }
    }
}

/// An assignment maps the names of bound variables to values.
pub type Assignment = im::OrdMap<String, Value>;

/// Errors raised while evaluating an expression to a [`Value`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// A bound variable has no value in the assignment
    #[error("variable {0} is not bound")]
    Unbound(String),
    /// Free variables never have a compile-time value
    #[error("free variable {0} has no compile-time value")]
    FreeVariable(String),
    /// The expression kind is only meaningful before lowering
    #[error("cannot evaluate {0} to a constant")]
    NotConstant(&'static str),
    #[allow(missing_docs)]
    #[error("division by zero")]
    DivisionByZero,
    /// A sub-expression produced a value of the wrong type
    #[error("expected {expected}, found {found}")]
    Mismatch {
        #[allow(missing_docs)]
        expected: &'static str,
        #[allow(missing_docs)]
        found: Value,
    },
}

impl Value {
    /// The type of the value. Arrays take the type of their default element.
    pub fn ty(&self) -> Type {
        match self {
            Value::Int(_) => Type::Int,
            Value::Bool(_) => Type::Bool,
            Value::Array(a) => Type::array(a.init.ty()),
        }
    }

    /// Convert the value to a literal expression: numerals, `true`/`false`,
    /// and arrays as a chain of stores over an initializer.
    pub fn to_expr(&self) -> Expr {
        match self {
            Value::Int(n) => Expr::Int(n.clone()),
            Value::Bool(b) => Expr::Bool(*b),
            Value::Array(a) => a
                .overrides
                .iter()
                .fold(Expr::array_init(a.init.to_expr()), |arr, (i, v)| {
                    Expr::store(arr, Expr::Int(i.clone()), v.to_expr())
                }),
        }
    }

    /// The inverse of [`Value::to_expr`]: `None` if the expression is not a
    /// literal.
    pub fn from_literal(e: &Expr) -> Option<Value> {
        match e {
            Expr::Int(n) => Some(Value::Int(n.clone())),
            Expr::Bool(b) => Some(Value::Bool(*b)),
            Expr::ArrayInit(init) => Some(Value::Array(ArrayValue::new(Self::from_literal(init)?))),
            Expr::Store {
                array,
                index,
                value,
            } => match (Self::from_literal(array)?, index.as_ref()) {
                (Value::Array(a), Expr::Int(i)) => {
                    Some(Value::Array(a.store(i.clone(), Self::from_literal(value)?)))
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn as_int(&self) -> Result<&BigInt, EvalError> {
        match self {
            Value::Int(n) => Ok(n),
            _ => Err(EvalError::Mismatch {
                expected: "an integer",
                found: self.clone(),
            }),
        }
    }

    fn as_bool(&self) -> Result<bool, EvalError> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(EvalError::Mismatch {
                expected: "a boolean",
                found: self.clone(),
            }),
        }
    }

    fn as_array(&self) -> Result<&ArrayValue, EvalError> {
        match self {
            Value::Array(a) => Ok(a),
            _ => Err(EvalError::Mismatch {
                expected: "an array",
                found: self.clone(),
            }),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(BigInt::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Euclidean division and remainder: the remainder is never negative.
fn div_rem_euclid(a: &BigInt, b: &BigInt) -> Result<(BigInt, BigInt), EvalError> {
    if b.is_zero() {
        return Err(EvalError::DivisionByZero);
    }
    let r = a.mod_floor(&b.abs());
    let q = (a - &r) / b;
    Ok((q, r))
}

fn eval_int_op(op: IntOp, x: &BigInt, y: &BigInt) -> Result<BigInt, EvalError> {
    Ok(match op {
        IntOp::Add => x + y,
        IntOp::Sub => x - y,
        IntOp::Mul => x * y,
        IntOp::Div => div_rem_euclid(x, y)?.0,
        IntOp::Mod => div_rem_euclid(x, y)?.1,
        IntOp::BvAnd => x & y,
        IntOp::BvXor => x ^ y,
        IntOp::BvOr => x | y,
    })
}

fn eval_cmp(op: CmpOp, x: &Value, y: &Value) -> Result<bool, EvalError> {
    Ok(match op {
        CmpOp::Eq => x == y,
        CmpOp::Neq => x != y,
        CmpOp::Gt => x.as_int()? > y.as_int()?,
        CmpOp::Lt => x.as_int()? < y.as_int()?,
        CmpOp::Ge => x.as_int()? >= y.as_int()?,
        CmpOp::Le => x.as_int()? <= y.as_int()?,
    })
}

/// Evaluate an expression whose variables are all bound by the assignment.
///
/// Only the constructs that survive lowering are supported: sums,
/// applications, constructors and matches are rejected with
/// [`EvalError::NotConstant`]. Named constants are evaluated once and cached.
pub fn eval(e: &Expr, assignment: &Assignment) -> Result<Value, EvalError> {
    match e {
        Expr::Int(n) => Ok(Value::Int(n.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::ArrayInit(init) => Ok(Value::Array(ArrayValue::new(eval(init, assignment)?))),
        Expr::Var(VarKind::Free, binder) => Err(EvalError::FreeVariable(binder.name.clone())),
        Expr::Var(_, binder) => assignment
            .get(&binder.name)
            .cloned()
            .ok_or_else(|| EvalError::Unbound(binder.name.clone())),
        Expr::IntOp(op, x, y) => {
            let x = eval(x, assignment)?;
            let y = eval(y, assignment)?;
            Ok(Value::Int(eval_int_op(*op, x.as_int()?, y.as_int()?)?))
        }
        Expr::BoolOp(op, x, y) => {
            let x = eval(x, assignment)?.as_bool()?;
            match (op, x) {
                (BoolOp::And, false) => Ok(Value::Bool(false)),
                (BoolOp::Or, true) => Ok(Value::Bool(true)),
                _ => Ok(Value::Bool(eval(y, assignment)?.as_bool()?)),
            }
        }
        Expr::Cmp(op, x, y) => {
            let x = eval(x, assignment)?;
            let y = eval(y, assignment)?;
            Ok(Value::Bool(eval_cmp(*op, &x, &y)?))
        }
        Expr::Select { array, index } => {
            let array = eval(array, assignment)?;
            let index = eval(index, assignment)?;
            Ok(array.as_array()?.select(index.as_int()?).clone())
        }
        Expr::Store {
            array,
            index,
            value,
        } => {
            let array = eval(array, assignment)?;
            let index = eval(index, assignment)?;
            let value = eval(value, assignment)?;
            Ok(Value::Array(
                array.as_array()?.store(index.as_int()?.clone(), value),
            ))
        }
        Expr::Ite { cond, then, else_ } => {
            if eval(cond, assignment)?.as_bool()? {
                eval(then, assignment)
            } else {
                eval(else_, assignment)
            }
        }
        Expr::Not(x) => Ok(Value::Bool(!eval(x, assignment)?.as_bool()?)),
        Expr::BvNot(x) => Ok(Value::Int(!eval(x, assignment)?.as_int()?.clone())),
        Expr::Const(c) => c.resolve_with(|value| eval(value, &Assignment::new())),
        Expr::Sum { .. } => Err(EvalError::NotConstant("an aggregation")),
        Expr::App { .. } => Err(EvalError::NotConstant("an operation application")),
        Expr::Construct { .. } => Err(EvalError::NotConstant("a constructor application")),
        Expr::Match { .. } => Err(EvalError::NotConstant("a match")),
    }
}
