// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Constant folding and boolean simplification.

use horn::{
    semantics::{eval, Assignment},
    syntax::{BoolOp, CmpOp, Expr, IntOp, Rule},
};
use num_bigint::BigInt;
use num_traits::{One, Zero};

use super::try_map_rule_exprs;

fn is_int(e: &Expr, pred: impl Fn(&BigInt) -> bool) -> bool {
    matches!(e, Expr::Int(n) if pred(n))
}

/// Identities that hold whatever the non-literal operand is.
fn identities(e: Expr) -> Expr {
    match e {
        Expr::BoolOp(op, lhs, rhs) => match (op, *lhs, *rhs) {
            (BoolOp::And, Expr::Bool(true), x) | (BoolOp::And, x, Expr::Bool(true)) => x,
            (BoolOp::And, Expr::Bool(false), _) | (BoolOp::And, _, Expr::Bool(false)) => {
                Expr::false_()
            }
            (BoolOp::Or, Expr::Bool(false), x) | (BoolOp::Or, x, Expr::Bool(false)) => x,
            (BoolOp::Or, Expr::Bool(true), _) | (BoolOp::Or, _, Expr::Bool(true)) => {
                Expr::true_()
            }
            (_, lhs, rhs) if lhs == rhs => lhs,
            (op, lhs, rhs) => Expr::BoolOp(op, Box::new(lhs), Box::new(rhs)),
        },
        Expr::IntOp(op, lhs, rhs) => match (op, *lhs, *rhs) {
            (IntOp::Add, x, zero) | (IntOp::Add, zero, x) if is_int(&zero, BigInt::is_zero) => x,
            (IntOp::Sub, x, zero) if is_int(&zero, BigInt::is_zero) => x,
            (IntOp::Mul, x, one) | (IntOp::Mul, one, x) if is_int(&one, BigInt::is_one) => x,
            (op, lhs, rhs) => Expr::IntOp(op, Box::new(lhs), Box::new(rhs)),
        },
        Expr::Cmp(op, lhs, rhs) if lhs == rhs => match op {
            CmpOp::Eq | CmpOp::Le | CmpOp::Ge => Expr::true_(),
            CmpOp::Neq | CmpOp::Lt | CmpOp::Gt => Expr::false_(),
        },
        Expr::Ite { cond, then, else_ } => match *cond {
            Expr::Bool(true) => *then,
            Expr::Bool(false) => *else_,
            _ if then == else_ => *then,
            cond => Expr::Ite {
                cond: Box::new(cond),
                then,
                else_,
            },
        },
        Expr::Not(inner) => match *inner {
            Expr::Cmp(CmpOp::Eq, lhs, rhs) => Expr::Cmp(CmpOp::Neq, lhs, rhs),
            Expr::Cmp(CmpOp::Neq, lhs, rhs) => Expr::Cmp(CmpOp::Eq, lhs, rhs),
            inner => Expr::not(inner),
        },
        e => e,
    }
}

/// Fold `e` bottom-up. A node whose children are all literals is replaced by
/// its value unless evaluating it fails (for example on division by zero),
/// in which case it is kept as is. Named constants are replaced by their
/// values.
pub fn fold_expr(e: &Expr) -> Expr {
    let e = e.map_children(fold_expr);
    if !e.is_literal() && e.children().iter().all(|c| c.is_literal()) {
        if let Ok(value) = eval(&e, &Assignment::new()) {
            return value.to_expr();
        }
    }
    identities(e)
}

/// Fold every expression of the rule.
pub fn fold(rule: Rule) -> Rule {
    match try_map_rule_exprs(&rule, |e| Ok::<_, std::convert::Infallible>(fold_expr(e))) {
        Ok(rule) => rule,
        Err(never) => match never {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horn::syntax::{ConstDecl, Type};

    #[test]
    fn test_literal_subtrees() {
        let x = Expr::free("x", &Type::Int);
        let e = Expr::add(x.clone(), Expr::mul(Expr::int(2), Expr::add(Expr::int(1), Expr::int(2))));
        assert_eq!(fold_expr(&e), Expr::add(x, Expr::int(6)));
    }

    #[test]
    fn test_division_by_zero_is_kept() {
        let e = Expr::int_op(IntOp::Div, Expr::int(1), Expr::int(0));
        assert_eq!(fold_expr(&e), e);
    }

    #[test]
    fn test_constants() {
        let n = ConstDecl::new("N", Expr::mul(Expr::int(6), Expr::int(7)));
        let x = Expr::free("x", &Type::Int);
        let e = Expr::lt(x.clone(), Expr::Const(n));
        assert_eq!(fold_expr(&e), Expr::lt(x, Expr::int(42)));
    }

    #[test]
    fn test_boolean_identities() {
        let b = Expr::free("b", &Type::Bool);
        let x = Expr::free("x", &Type::Int);
        assert_eq!(fold_expr(&Expr::and(Expr::true_(), b.clone())), b);
        assert_eq!(fold_expr(&Expr::and(b.clone(), Expr::false_())), Expr::false_());
        assert_eq!(fold_expr(&Expr::or(Expr::false_(), b.clone())), b);
        assert_eq!(
            fold_expr(&Expr::or(b.clone(), Expr::lt(Expr::int(0), Expr::int(1)))),
            Expr::true_()
        );
        assert_eq!(
            fold_expr(&Expr::ite(Expr::eq(Expr::int(1), Expr::int(1)), x.clone(), Expr::int(0))),
            x
        );
        assert_eq!(fold_expr(&Expr::not(Expr::not(b.clone()))), b);
        assert_eq!(
            fold_expr(&Expr::not(Expr::eq(x.clone(), Expr::int(3)))),
            Expr::neq(x.clone(), Expr::int(3))
        );
        assert_eq!(fold_expr(&Expr::eq(x.clone(), x.clone())), Expr::true_());
        assert_eq!(fold_expr(&Expr::add(Expr::int(0), x.clone())), x);
    }

    #[test]
    fn test_unrolled_sum_collapses() {
        let x = Expr::free("x", &Type::Int);
        // x * 1 + (0 + 0 * 10 + 1 * 10 + 2 * 10)
        let sum = [0, 1, 2].into_iter().fold(Expr::int(0), |acc, i| {
            Expr::add(acc, Expr::mul(Expr::int(i), Expr::int(10)))
        });
        let e = Expr::add(Expr::mul(x.clone(), Expr::int(1)), sum);
        assert_eq!(fold_expr(&e).to_string(), "x + 30");
    }
}
