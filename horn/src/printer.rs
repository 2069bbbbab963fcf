// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Human-readable rendering of the AST, used for traces and diagnostics.

use itertools::Itertools;
use std::fmt;

use crate::{semantics::Value, syntax::*};

fn precedence(e: &Expr) -> usize {
    match e {
        Expr::Ite { .. } | Expr::Sum { .. } | Expr::Match { .. } => 5,
        Expr::BoolOp(BoolOp::Or, _, _) => 10,
        Expr::BoolOp(BoolOp::And, _, _) => 20,
        Expr::Cmp(..) => 30,
        Expr::IntOp(IntOp::BvOr, _, _) => 40,
        Expr::IntOp(IntOp::BvXor, _, _) => 45,
        Expr::IntOp(IntOp::BvAnd, _, _) => 50,
        Expr::IntOp(IntOp::Add | IntOp::Sub, _, _) => 60,
        Expr::IntOp(IntOp::Mul | IntOp::Div | IntOp::Mod, _, _) => 70,
        Expr::Not(_) | Expr::BvNot(_) => 80,
        Expr::Int(_)
        | Expr::Bool(_)
        | Expr::ArrayInit(_)
        | Expr::Var(..)
        | Expr::Select { .. }
        | Expr::Store { .. }
        | Expr::App { .. }
        | Expr::Construct { .. }
        | Expr::Const(_) => 1000,
    }
}

fn parens(add_parens: bool, s: String) -> String {
    if add_parens {
        format!("({s})")
    } else {
        s
    }
}

fn list(es: &[Expr]) -> String {
    es.iter().map(expr).join(", ")
}

fn binder(b: &Binder) -> String {
    format!("{}:{}", b.name, b.ty)
}

fn pattern(p: &Pattern) -> String {
    match p {
        Pattern::Wildcard(name) => name.clone(),
        Pattern::Value(ctor, fields) if fields.is_empty() => ctor.name.clone(),
        Pattern::Value(ctor, fields) => {
            format!("{}({})", ctor.name, fields.iter().map(pattern).join(", "))
        }
    }
}

fn sum_op(op: &SumOp) -> String {
    match op {
        SumOp::Simple(SimpleSum::Add) => "add".to_string(),
        SumOp::Simple(SimpleSum::Mul) => "mul".to_string(),
        SumOp::Simple(SimpleSum::And) => "and".to_string(),
        SumOp::Simple(SimpleSum::Or) => "or".to_string(),
        SumOp::Custom(custom) => custom.name.clone(),
        SumOp::Inlined(inlined) => format!("{}#{}", inlined.family.name, inlined.member),
    }
}

/// Render an expression with as few parentheses as the precedence allows.
pub fn expr(e: &Expr) -> String {
    match e {
        Expr::Int(n) => n.to_string(),
        Expr::Bool(b) => b.to_string(),
        Expr::ArrayInit(init) => format!("[{}]", expr(init)),
        Expr::Var(_, b) => b.name.clone(),
        Expr::Const(c) => c.name.clone(),
        Expr::IntOp(op, lhs, rhs) => {
            let op = match op {
                IntOp::Add => "+",
                IntOp::Sub => "-",
                IntOp::Mul => "*",
                IntOp::Div => "/",
                IntOp::Mod => "%",
                IntOp::BvAnd => "&",
                IntOp::BvXor => "^",
                IntOp::BvOr => "|",
            };
            binary(e, op, lhs, rhs)
        }
        Expr::BoolOp(op, lhs, rhs) => {
            let op = match op {
                BoolOp::And => "&&",
                BoolOp::Or => "||",
            };
            binary(e, op, lhs, rhs)
        }
        Expr::Cmp(op, lhs, rhs) => {
            let op = match op {
                CmpOp::Gt => ">",
                CmpOp::Lt => "<",
                CmpOp::Ge => ">=",
                CmpOp::Le => "<=",
                CmpOp::Eq => "==",
                CmpOp::Neq => "!=",
            };
            // comparisons do not chain
            let lhs = parens(precedence(e) >= precedence(lhs), expr(lhs));
            let rhs = parens(precedence(e) >= precedence(rhs), expr(rhs));
            format!("{lhs} {op} {rhs}")
        }
        Expr::Select { array, index } => {
            let array = parens(precedence(e) > precedence(array), expr(array));
            format!("{array}[{}]", expr(index))
        }
        Expr::Store {
            array,
            index,
            value,
        } => {
            let array = parens(precedence(e) > precedence(array), expr(array));
            format!("{array}[{} := {}]", expr(index), expr(value))
        }
        Expr::Ite { cond, then, else_ } => {
            let cond = expr(cond);
            let then = parens(precedence(e) >= precedence(then), expr(then));
            let else_ = parens(precedence(e) > precedence(else_), expr(else_));
            format!("if {cond} then {then} else {else_}")
        }
        Expr::Sum {
            invocation,
            body,
            op,
        } => format!("{} for {invocation}: {}", sum_op(op), expr(body)),
        Expr::App { op, params, args } if params.is_empty() => {
            format!("{}({})", op.name, list(args))
        }
        Expr::App { op, params, args } => {
            format!("{}{{{}}}({})", op.name, list(params), list(args))
        }
        Expr::Construct { ctor, fields, .. } if fields.is_empty() => ctor.name.clone(),
        Expr::Construct { ctor, fields, .. } => format!("{}({})", ctor.name, list(fields)),
        Expr::Match { scrutinees, arms } => {
            let arms = arms
                .iter()
                .map(|arm| {
                    format!(
                        "{} => {}",
                        arm.patterns.iter().map(pattern).join(", "),
                        expr(&arm.result)
                    )
                })
                .join("; ");
            format!("match ({}) {{ {arms} }}", list(scrutinees))
        }
        Expr::Not(arg) => format!("!{}", parens(precedence(e) > precedence(arg), expr(arg))),
        Expr::BvNot(arg) => format!("~{}", parens(precedence(e) > precedence(arg), expr(arg))),
    }
}

/// All binary operators are left associative.
fn binary(e: &Expr, op: &str, lhs: &Expr, rhs: &Expr) -> String {
    let left = parens(precedence(e) > precedence(lhs), expr(lhs));
    let right = parens(precedence(e) >= precedence(rhs), expr(rhs));
    format!("{left} {op} {right}")
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Custom(ty) => write!(f, "{}", ty.name),
            Type::Array(element) => write!(f, "array<{element}>"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", expr(self))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_expr())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}) in {}({})",
            self.bindings.iter().map(|b| &b.name).join(", "),
            self.function.name,
            list(&self.args)
        )
    }
}

impl fmt::Display for CompoundInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.invocations().iter().join(", "))
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            write!(f, "{}({})", self.predicate.name, list(&self.args))
        } else {
            write!(
                f,
                "{}{{{}}}({})",
                self.predicate.name,
                list(&self.params),
                list(&self.args)
            )
        }
    }
}

impl fmt::Display for Proposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Proposition::Predicate(atom) => write!(f, "{atom}"),
            Proposition::Expr(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.free_vars.is_empty() {
            let binders = self
                .free_vars
                .iter()
                .map(|(name, ty)| binder(&Binder::new(name, ty)))
                .join(", ");
            write!(f, "forall {binders}. ")?;
        }
        if !self.premises.is_empty() {
            write!(f, "{} => ", self.premises.iter().join(", "))?;
        }
        write!(f, "{}", self.conclusion)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.invocation.is_unit() {
            write!(f, "rule {}:", self.name)?;
        } else {
            write!(f, "rule {} for {}:", self.name, self.invocation)?;
        }
        for clause in &self.clauses {
            write!(f, "\n  {clause}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn x() -> Expr {
        Expr::free("x", &Type::Int)
    }

    #[test]
    fn test_precedence() {
        let e = Expr::mul(Expr::add(x(), Expr::int(1)), Expr::int(2));
        insta::assert_display_snapshot!(e, @"(x + 1) * 2");
        let e = Expr::sub(x(), Expr::sub(Expr::int(1), Expr::int(2)));
        insta::assert_display_snapshot!(e, @"x - (1 - 2)");
        let e = Expr::and(
            Expr::lt(x(), Expr::int(3)),
            Expr::or(Expr::true_(), Expr::false_()),
        );
        insta::assert_display_snapshot!(e, @"x < 3 && (true || false)");
        let e = Expr::not(Expr::eq(x(), Expr::int(0)));
        insta::assert_display_snapshot!(e, @"!(x == 0)");
    }

    #[test]
    fn test_arrays_and_ite() {
        let a = Expr::free("a", &Type::array(Type::Int));
        let e = Expr::select(Expr::store(a, Expr::int(1), x()), Expr::int(1));
        insta::assert_display_snapshot!(e, @"a[1 := x][1]");
        let e = Expr::ite(
            Expr::true_(),
            Expr::array_init(Expr::int(0)),
            Expr::array_init(Expr::int(1)),
        );
        insta::assert_display_snapshot!(e, @"if true then [0] else [1]");
    }

    #[test]
    fn test_sum() {
        let f = SelectorFunction::new("interval", &[Type::Int, Type::Int], &[Type::Int]);
        let e = Expr::sum(
            CompoundInvocation::single(Invocation::new(
                &f,
                vec![Binder::new("i", &Type::Int)],
                vec![Expr::int(0), Expr::int(3)],
            )),
            Expr::mul(Expr::param("i", &Type::Int), Expr::int(2)),
            SumOp::Simple(SimpleSum::Add),
        );
        insta::assert_display_snapshot!(e, @"add for (i) in interval(0, 3): i * 2");
    }

    #[test]
    fn test_clause_and_rule() {
        let p = Predicate::new("P", &[Type::Int], &[Type::Int]);
        let q = Predicate::new("Q", &[], &[Type::Int]);
        let clause = Clause::new(
            vec![
                Proposition::Predicate(Atom::new(&q, vec![], vec![x()])),
                Proposition::Expr(Expr::lt(x(), Expr::int(5))),
            ],
            Atom::new(&p, vec![Expr::int(1)], vec![Expr::add(x(), Expr::int(1))]),
            BTreeMap::from([("x".to_string(), Type::Int)]),
        );
        insta::assert_display_snapshot!(clause, @"forall x:int. Q(x), x < 5 => P{1}(x + 1)");
        let rule = Rule::new("step", CompoundInvocation::unit(), vec![clause]);
        insta::assert_display_snapshot!(rule, @r###"
        rule step:
          forall x:int. Q(x), x < 5 => P{1}(x + 1)
        "###);
    }

    #[test]
    fn test_types() {
        let option = CustomType::new(
            "Option",
            vec![
                Constructor::new("None", &[]),
                Constructor::new("Some", &[Type::Int]),
            ],
        );
        let ty = Type::array(Type::Custom(option.clone()));
        insta::assert_display_snapshot!(ty, @"array<Option>");
        let e = Expr::construct(&option, "Some", vec![Expr::int(3)]);
        insta::assert_display_snapshot!(e, @"Some(3)");
    }
}
