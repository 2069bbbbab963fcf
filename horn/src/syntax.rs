// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The AST for types, expressions, clauses and rules.

use itertools::Itertools;
use num_bigint::BigInt;
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    hash::{Hash, Hasher},
    sync::{Arc, OnceLock},
};

use crate::semantics::Value;

/// A type of the specification language.
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord)]
pub enum Type {
    /// Unbounded integers
    Int,
    /// Booleans
    Bool,
    /// A user-declared algebraic data type
    Custom(Arc<CustomType>),
    /// An array indexed by integers
    Array(Box<Type>),
}

impl Type {
    /// Smart constructor for an array type.
    pub fn array(element: Type) -> Self {
        Self::Array(Box::new(element))
    }

    /// Integers and booleans.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Int | Type::Bool)
    }

    /// Primitive types and (possibly nested) arrays of them, i.e., the types a
    /// fully flattened clause may mention.
    pub fn is_base(&self) -> bool {
        match self {
            Type::Int | Type::Bool => true,
            Type::Array(element) => element.is_base(),
            Type::Custom(_) => false,
        }
    }
}

/// A user-declared algebraic data type.
///
/// Custom types are identified by their declaration name: two declarations
/// with identical constructors are still different types.
#[derive(Clone, Debug)]
pub struct CustomType {
    /// The declared name
    pub name: String,
    /// The constructors, in declaration order
    pub constructors: Vec<Constructor>,
}

impl CustomType {
    /// Declare a new custom type.
    pub fn new(name: &str, constructors: Vec<Constructor>) -> Arc<Self> {
        Arc::new(CustomType {
            name: name.to_string(),
            constructors,
        })
    }

    /// The declaration index of the given constructor, if it belongs to this type.
    pub fn constructor_index(&self, ctor: &Constructor) -> Option<usize> {
        self.constructors.iter().position(|c| c == ctor)
    }

    /// Look up a constructor by name.
    pub fn constructor(&self, name: &str) -> Option<&Constructor> {
        self.constructors.iter().find(|c| c.name == name)
    }
}

impl PartialEq for CustomType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for CustomType {}

impl Hash for CustomType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

impl PartialOrd for CustomType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CustomType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

/// A constructor of a custom type. Integers and booleans also have
/// constructors for the purpose of pattern matching: their names are numerals
/// and `true`/`false` respectively.
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord)]
pub struct Constructor {
    /// The constructor name
    pub name: String,
    /// The types of the constructor's fields
    pub params: Vec<Type>,
}

impl Constructor {
    /// Smart constructor for a constructor taking references.
    pub fn new(name: &str, params: &[Type]) -> Self {
        Constructor {
            name: name.to_string(),
            params: params.to_vec(),
        }
    }

    /// The pattern constructor of an integer literal.
    pub fn numeral(value: i64) -> Self {
        Self::new(&value.to_string(), &[])
    }

    /// The pattern constructor of a boolean literal.
    pub fn boolean(value: bool) -> Self {
        Self::new(if value { "true" } else { "false" }, &[])
    }
}

/// A name together with its type.
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord)]
pub struct Binder {
    /// Bound name
    pub name: String,
    /// Type for this binder
    pub ty: Type,
}

impl Binder {
    /// Smart constructor for a Binder that takes arguments by reference.
    pub fn new(name: &str, ty: &Type) -> Self {
        Binder {
            name: name.to_string(),
            ty: ty.clone(),
        }
    }
}

/// The three kinds of named variable references.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord)]
pub enum VarKind {
    /// A variable bound by an enclosing construct: an operation argument, a
    /// match pattern or the accumulator of a custom aggregation
    Local,
    /// A variable universally quantified over its clause
    Free,
    /// A parameter bound by a selector function invocation
    Param,
}

/// Integer-valued binary operators
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord)]
pub enum IntOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BvAnd,
    BvXor,
    BvOr,
}

/// Boolean-valued binary connectives
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord)]
pub enum BoolOp {
    And,
    Or,
}

/// Comparisons
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord)]
pub enum CmpOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Neq,
}

/// A typed expression.
///
/// Every expression knows its own type (see [`Expr::ty`]), which is computed
/// structurally from its children.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub enum Expr {
    /// An integer literal
    Int(BigInt),
    /// A boolean literal
    Bool(bool),
    /// An array whose every element is the given initializer
    ArrayInit(Box<Expr>),
    /// A reference to a named variable
    Var(VarKind, Binder),
    /// Integer arithmetic and bitwise operations
    IntOp(IntOp, Box<Expr>, Box<Expr>),
    /// Boolean connectives
    BoolOp(BoolOp, Box<Expr>, Box<Expr>),
    /// Comparisons
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
    /// Array read
    #[allow(missing_docs)]
    Select { array: Box<Expr>, index: Box<Expr> },
    /// Functional array update
    #[allow(missing_docs)]
    Store {
        array: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
    },
    /// If-then-else
    Ite {
        /// A boolean conditional
        cond: Box<Expr>,
        /// Value of the Ite when `cond` is true
        then: Box<Expr>,
        /// Value of the Ite when `cond` is false
        else_: Box<Expr>,
    },
    /// Bounded aggregation of `body` over every binding the invocation yields
    #[allow(missing_docs)]
    Sum {
        invocation: CompoundInvocation,
        body: Box<Expr>,
        op: SumOp,
    },
    /// Application of a user-defined operation
    #[allow(missing_docs)]
    App {
        op: Arc<Operation>,
        params: Vec<Expr>,
        args: Vec<Expr>,
    },
    /// Application of a constructor of a custom type
    #[allow(missing_docs)]
    Construct {
        ty: Arc<CustomType>,
        ctor: Constructor,
        fields: Vec<Expr>,
    },
    /// Pattern matching over one or more scrutinees. The arms are tried in
    /// order; the type of the match is the type of the first arm's result.
    #[allow(missing_docs)]
    Match {
        scrutinees: Vec<Expr>,
        arms: Vec<MatchArm>,
    },
    /// Boolean negation
    Not(Box<Expr>),
    /// Bitwise negation
    BvNot(Box<Expr>),
    /// A reference to a named constant
    Const(Arc<ConstDecl>),
}

/// One arm of a [`Expr::Match`]: one pattern per scrutinee and a result.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct MatchArm {
    #[allow(missing_docs)]
    pub patterns: Vec<Pattern>,
    #[allow(missing_docs)]
    pub result: Expr,
}

/// A pattern in a match arm.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub enum Pattern {
    /// Matches values built with the constructor whose fields match the
    /// sub-patterns
    Value(Constructor, Vec<Pattern>),
    /// Matches anything and binds it to the name
    Wildcard(String),
}

/// A named constant. Its value is computed at most once.
#[derive(Debug)]
pub struct ConstDecl {
    /// The constant's name
    pub name: String,
    /// The defining expression, which must not depend on any variable
    pub value: Expr,
    resolved: OnceLock<Value>,
}

impl ConstDecl {
    /// Declare a new constant.
    pub fn new(name: &str, value: Expr) -> Arc<Self> {
        Arc::new(ConstDecl {
            name: name.to_string(),
            value,
            resolved: OnceLock::new(),
        })
    }

    /// The cached value, if it has been computed already.
    pub fn resolved(&self) -> Option<&Value> {
        self.resolved.get()
    }

    /// Return the cached value, computing it with `f` on first use.
    pub fn resolve_with<E>(&self, f: impl FnOnce(&Expr) -> Result<Value, E>) -> Result<Value, E> {
        if let Some(v) = self.resolved.get() {
            return Ok(v.clone());
        }
        let v = f(&self.value)?;
        // a concurrent resolution computes the same value, so losing the race is harmless
        let _ = self.resolved.set(v.clone());
        Ok(v)
    }
}

impl PartialEq for ConstDecl {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value
    }
}

impl Eq for ConstDecl {}

impl Hash for ConstDecl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.value.hash(state);
    }
}

/// A named expression template.
///
/// Arguments are substituted positionally at the call site; parameters are
/// compile-time values that end up bound by selector function invocations.
#[derive(PartialEq, Eq, Debug, Hash)]
pub struct Operation {
    #[allow(missing_docs)]
    pub name: String,
    #[allow(missing_docs)]
    pub body: Expr,
    /// Bound as [`VarKind::Param`] in the body
    pub params: Vec<Binder>,
    /// Bound as [`VarKind::Local`] in the body
    pub args: Vec<Binder>,
}

impl Operation {
    /// Declare a new operation.
    pub fn new(name: &str, params: Vec<Binder>, args: Vec<Binder>, body: Expr) -> Arc<Self> {
        Arc::new(Operation {
            name: name.to_string(),
            body,
            params,
            args,
        })
    }
}

/// How a [`Expr::Sum`] combines the instances of its body.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub enum SumOp {
    /// A commutative combinator with a fixed start value
    Simple(SimpleSum),
    /// A user aggregation that threads an accumulator through the iterations
    Custom(Arc<CustomSum>),
    /// One primitive slot of a custom aggregation whose accumulator was
    /// flattened; all members of the family are unrolled together
    Inlined(InlinedSum),
}

/// The built-in aggregations.
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord)]
pub enum SimpleSum {
    Add,
    Mul,
    And,
    Or,
}

impl SimpleSum {
    /// The identity element the aggregation starts from.
    pub fn start(&self) -> Expr {
        match self {
            SimpleSum::Add => Expr::int(0),
            SimpleSum::Mul => Expr::int(1),
            SimpleSum::And => Expr::true_(),
            SimpleSum::Or => Expr::false_(),
        }
    }

    /// Combine the accumulated expression with one more instance of the body.
    pub fn combine(&self, acc: Expr, next: Expr) -> Expr {
        match self {
            SimpleSum::Add => Expr::add(acc, next),
            SimpleSum::Mul => Expr::mul(acc, next),
            SimpleSum::And => Expr::and(acc, next),
            SimpleSum::Or => Expr::or(acc, next),
        }
    }

    /// The type of the aggregated value.
    pub fn ty(&self) -> Type {
        match self {
            SimpleSum::Add | SimpleSum::Mul => Type::Int,
            SimpleSum::And | SimpleSum::Or => Type::Bool,
        }
    }
}

/// A user aggregation. The body of the sum refers to the accumulator as a
/// [`VarKind::Local`] variable; each iteration's instance of the body becomes
/// the accumulator of the next.
#[derive(PartialEq, Eq, Debug, Hash)]
pub struct CustomSum {
    #[allow(missing_docs)]
    pub name: String,
    /// The accumulator
    pub acc: Binder,
    /// The initial accumulator, possibly depending on selector parameters
    pub start: Expr,
}

impl CustomSum {
    /// Declare a new custom aggregation.
    pub fn new(name: &str, acc: Binder, start: Expr) -> Arc<Self> {
        Arc::new(CustomSum {
            name: name.to_string(),
            acc,
            start,
        })
    }
}

/// The flattened form of one [`CustomSum`] application: one accumulator,
/// start element and body per primitive slot. Bodies may refer to any of the
/// accumulators.
///
/// Two applications of the same operation over different selector
/// invocations are different families.
#[derive(PartialEq, Eq, Debug, Hash)]
pub struct SumFamily {
    #[allow(missing_docs)]
    pub name: String,
    /// The invocation every member enumerates
    pub invocation: CompoundInvocation,
    #[allow(missing_docs)]
    pub accs: Vec<Binder>,
    #[allow(missing_docs)]
    pub starts: Vec<Expr>,
    #[allow(missing_docs)]
    pub bodies: Vec<Expr>,
}

/// A member of a [`SumFamily`].
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct InlinedSum {
    #[allow(missing_docs)]
    pub family: Arc<SumFamily>,
    /// The slot this member stands for
    pub member: usize,
}

impl SumOp {
    /// The type of the aggregated value.
    pub fn ty(&self) -> Type {
        match self {
            SumOp::Simple(op) => op.ty(),
            SumOp::Custom(op) => op.acc.ty.clone(),
            SumOp::Inlined(op) => op.family.accs[op.member].ty.clone(),
        }
    }
}

/// The name of the selector function that yields exactly one empty binding.
pub const UNIT: &str = "unit";

/// An externally implemented finite enumerator.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct SelectorFunction {
    #[allow(missing_docs)]
    pub name: String,
    /// Types of the arguments passed to the enumerator
    pub params: Vec<Type>,
    /// Types of the components of each yielded element
    pub returns: Vec<Type>,
}

impl SelectorFunction {
    /// Declare a new selector function.
    pub fn new(name: &str, params: &[Type], returns: &[Type]) -> Arc<Self> {
        Arc::new(SelectorFunction {
            name: name.to_string(),
            params: params.to_vec(),
            returns: returns.to_vec(),
        })
    }

    /// The selector function that needs no enumeration.
    pub fn unit() -> Arc<Self> {
        Self::new(UNIT, &[], &[])
    }

    /// Whether this is the [`UNIT`] function.
    pub fn is_unit(&self) -> bool {
        self.name == UNIT && self.params.is_empty() && self.returns.is_empty()
    }
}

/// A call of a selector function that binds its results to parameters.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct Invocation {
    #[allow(missing_docs)]
    pub function: Arc<SelectorFunction>,
    /// Bound as [`VarKind::Param`] in the scope of the invocation
    pub bindings: Vec<Binder>,
    /// Arguments passed to the enumerator, evaluated under the ambient bindings
    pub args: Vec<Expr>,
}

impl Invocation {
    /// Smart constructor for an invocation.
    pub fn new(function: &Arc<SelectorFunction>, bindings: Vec<Binder>, args: Vec<Expr>) -> Self {
        Invocation {
            function: function.clone(),
            bindings,
            args,
        }
    }

    /// The invocation of [`SelectorFunction::unit`].
    pub fn unit() -> Self {
        Self::new(&SelectorFunction::unit(), vec![], vec![])
    }
}

/// A non-empty sequence of invocations forming a dependent product: the
/// arguments of later invocations may refer to parameters bound by earlier ones.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct CompoundInvocation(Vec<Invocation>);

impl CompoundInvocation {
    /// Compose the given invocations left to right. Panics if empty.
    pub fn new(invocations: Vec<Invocation>) -> Self {
        assert!(
            !invocations.is_empty(),
            "compound invocations must not be empty"
        );
        CompoundInvocation(invocations)
    }

    /// A compound of a single invocation.
    pub fn single(invocation: Invocation) -> Self {
        Self::new(vec![invocation])
    }

    /// The compound that yields exactly one empty binding.
    pub fn unit() -> Self {
        Self::single(Invocation::unit())
    }

    #[allow(missing_docs)]
    pub fn invocations(&self) -> &[Invocation] {
        &self.0
    }

    /// Whether no enumeration is needed.
    pub fn is_unit(&self) -> bool {
        self.0.iter().all(|inv| inv.function.is_unit())
    }

    /// All parameters bound by the compound, in order.
    pub fn bound(&self) -> impl Iterator<Item = &Binder> {
        self.0.iter().flat_map(|inv| inv.bindings.iter())
    }
}

/// A relation symbol. Predicates are compared by value.
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord)]
pub struct Predicate {
    #[allow(missing_docs)]
    pub name: String,
    /// Types of the compile-time parameters
    pub params: Vec<Type>,
    /// Types of the arguments
    pub args: Vec<Type>,
}

impl Predicate {
    /// Smart constructor for a predicate.
    pub fn new(name: &str, params: &[Type], args: &[Type]) -> Self {
        Predicate {
            name: name.to_string(),
            params: params.to_vec(),
            args: args.to_vec(),
        }
    }
}

/// A predicate applied to parameter and argument expressions.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct Atom {
    #[allow(missing_docs)]
    pub predicate: Predicate,
    #[allow(missing_docs)]
    pub params: Vec<Expr>,
    #[allow(missing_docs)]
    pub args: Vec<Expr>,
}

impl Atom {
    /// Smart constructor for an atom.
    pub fn new(predicate: &Predicate, params: Vec<Expr>, args: Vec<Expr>) -> Self {
        Atom {
            predicate: predicate.clone(),
            params,
            args,
        }
    }

    /// Parameters followed by arguments.
    pub fn exprs(&self) -> impl Iterator<Item = &Expr> {
        self.params.iter().chain(self.args.iter())
    }

    /// Rebuild the atom with every parameter and argument replaced by `f(e)`.
    pub fn try_map_exprs<E>(
        &self,
        mut f: impl FnMut(&Expr) -> Result<Expr, E>,
    ) -> Result<Atom, E> {
        Ok(Atom {
            predicate: self.predicate.clone(),
            params: self.params.iter().map(&mut f).collect::<Result<_, E>>()?,
            args: self.args.iter().map(&mut f).collect::<Result<_, E>>()?,
        })
    }
}

/// A premise of a clause.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub enum Proposition {
    /// A predicate application
    Predicate(Atom),
    /// A boolean constraint
    Expr(Expr),
}

impl Proposition {
    /// Destruct the proposition into its atom, if it is a predicate application.
    pub fn atom(&self) -> Option<&Atom> {
        match self {
            Proposition::Predicate(atom) => Some(atom),
            Proposition::Expr(_) => None,
        }
    }
}

/// A Horn clause `premises => conclusion`, universally quantified over its
/// free variables.
///
/// Every [`VarKind::Free`] variable mentioned in the clause must be declared
/// in `free_vars`.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct Clause {
    #[allow(missing_docs)]
    pub premises: Vec<Proposition>,
    #[allow(missing_docs)]
    pub conclusion: Atom,
    #[allow(missing_docs)]
    pub free_vars: BTreeMap<String, Type>,
}

impl Clause {
    /// Smart constructor for a clause.
    pub fn new(
        premises: Vec<Proposition>,
        conclusion: Atom,
        free_vars: BTreeMap<String, Type>,
    ) -> Self {
        Clause {
            premises,
            conclusion,
            free_vars,
        }
    }

    /// All expressions of the clause: premises first, then the conclusion.
    pub fn exprs(&self) -> impl Iterator<Item = &Expr> {
        self.premises
            .iter()
            .flat_map(|p| -> Box<dyn Iterator<Item = &Expr>> {
                match p {
                    Proposition::Predicate(atom) => Box::new(atom.exprs()),
                    Proposition::Expr(e) => Box::new(std::iter::once(e)),
                }
            })
            .chain(self.conclusion.exprs())
    }

    /// Rebuild the clause with every expression replaced by `f(e)`, keeping
    /// the free variable declarations.
    pub fn try_map_exprs<E>(
        &self,
        mut f: impl FnMut(&Expr) -> Result<Expr, E>,
    ) -> Result<Clause, E> {
        let premises = self
            .premises
            .iter()
            .map(|p| {
                Ok(match p {
                    Proposition::Predicate(atom) => Proposition::Predicate(atom.try_map_exprs(&mut f)?),
                    Proposition::Expr(e) => Proposition::Expr(f(e)?),
                })
            })
            .collect::<Result<_, E>>()?;
        Ok(Clause {
            premises,
            conclusion: self.conclusion.try_map_exprs(&mut f)?,
            free_vars: self.free_vars.clone(),
        })
    }

    /// The atoms among the premises.
    pub fn premise_atoms(&self) -> impl Iterator<Item = &Atom> {
        self.premises.iter().filter_map(Proposition::atom)
    }

    /// Free variables that occur in the clause but are missing from (or
    /// declared with a different type in) `free_vars`.
    pub fn undeclared_free_vars(&self) -> Vec<Binder> {
        self.exprs()
            .flat_map(|e| e.vars(VarKind::Free))
            .filter(|b| self.free_vars.get(&b.name) != Some(&b.ty))
            .unique()
            .collect()
    }
}

/// The unit moved through the translation pipeline.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct Rule {
    #[allow(missing_docs)]
    pub name: String,
    /// The rule's enumeration context
    pub invocation: CompoundInvocation,
    #[allow(missing_docs)]
    pub clauses: Vec<Clause>,
}

impl Rule {
    /// Smart constructor for a rule.
    pub fn new(name: &str, invocation: CompoundInvocation, clauses: Vec<Clause>) -> Self {
        Rule {
            name: name.to_string(),
            invocation,
            clauses,
        }
    }
}

/// Smart constructors for Expr. Children are taken by value.
impl Expr {
    /// Smart constructor for an integer literal.
    pub fn int(value: i64) -> Self {
        Self::Int(BigInt::from(value))
    }

    /// Smart constructor for Bool(true)
    pub fn true_() -> Self {
        Self::Bool(true)
    }

    /// Smart constructor for Bool(false)
    pub fn false_() -> Self {
        Self::Bool(false)
    }

    /// Smart constructor for a variable reference.
    pub fn var(kind: VarKind, name: &str, ty: &Type) -> Self {
        Self::Var(kind, Binder::new(name, ty))
    }

    /// Smart constructor for a [`VarKind::Local`] reference.
    pub fn local(name: &str, ty: &Type) -> Self {
        Self::var(VarKind::Local, name, ty)
    }

    /// Smart constructor for a [`VarKind::Free`] reference.
    pub fn free(name: &str, ty: &Type) -> Self {
        Self::var(VarKind::Free, name, ty)
    }

    /// Smart constructor for a [`VarKind::Param`] reference.
    pub fn param(name: &str, ty: &Type) -> Self {
        Self::var(VarKind::Param, name, ty)
    }

    /// Smart constructor for an array with every element equal to `init`.
    pub fn array_init(init: Expr) -> Self {
        Self::ArrayInit(Box::new(init))
    }

    #[allow(missing_docs)]
    pub fn int_op(op: IntOp, lhs: Expr, rhs: Expr) -> Self {
        Self::IntOp(op, Box::new(lhs), Box::new(rhs))
    }

    #[allow(missing_docs)]
    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Self::int_op(IntOp::Add, lhs, rhs)
    }

    #[allow(missing_docs)]
    pub fn sub(lhs: Expr, rhs: Expr) -> Self {
        Self::int_op(IntOp::Sub, lhs, rhs)
    }

    #[allow(missing_docs)]
    pub fn mul(lhs: Expr, rhs: Expr) -> Self {
        Self::int_op(IntOp::Mul, lhs, rhs)
    }

    #[allow(missing_docs)]
    pub fn and(lhs: Expr, rhs: Expr) -> Self {
        Self::BoolOp(BoolOp::And, Box::new(lhs), Box::new(rhs))
    }

    #[allow(missing_docs)]
    pub fn or(lhs: Expr, rhs: Expr) -> Self {
        Self::BoolOp(BoolOp::Or, Box::new(lhs), Box::new(rhs))
    }

    /// Left-nested conjunction; `true` when empty.
    pub fn conjoin(es: impl IntoIterator<Item = Expr>) -> Self {
        es.into_iter()
            .reduce(Self::and)
            .unwrap_or_else(Self::true_)
    }

    /// Left-nested disjunction; `false` when empty.
    pub fn disjoin(es: impl IntoIterator<Item = Expr>) -> Self {
        es.into_iter().reduce(Self::or).unwrap_or_else(Self::false_)
    }

    #[allow(missing_docs)]
    pub fn cmp(op: CmpOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Cmp(op, Box::new(lhs), Box::new(rhs))
    }

    #[allow(missing_docs)]
    pub fn eq(lhs: Expr, rhs: Expr) -> Self {
        Self::cmp(CmpOp::Eq, lhs, rhs)
    }

    #[allow(missing_docs)]
    pub fn neq(lhs: Expr, rhs: Expr) -> Self {
        Self::cmp(CmpOp::Neq, lhs, rhs)
    }

    #[allow(missing_docs)]
    pub fn lt(lhs: Expr, rhs: Expr) -> Self {
        Self::cmp(CmpOp::Lt, lhs, rhs)
    }

    /// Smart constructor for not. Cancels double negation.
    pub fn not(e: Expr) -> Self {
        match e {
            Self::Not(inner) => *inner,
            _ => Self::Not(Box::new(e)),
        }
    }

    #[allow(missing_docs)]
    pub fn ite(cond: Expr, then: Expr, else_: Expr) -> Self {
        Self::Ite {
            cond: Box::new(cond),
            then: Box::new(then),
            else_: Box::new(else_),
        }
    }

    #[allow(missing_docs)]
    pub fn select(array: Expr, index: Expr) -> Self {
        Self::Select {
            array: Box::new(array),
            index: Box::new(index),
        }
    }

    #[allow(missing_docs)]
    pub fn store(array: Expr, index: Expr, value: Expr) -> Self {
        Self::Store {
            array: Box::new(array),
            index: Box::new(index),
            value: Box::new(value),
        }
    }

    #[allow(missing_docs)]
    pub fn sum(invocation: CompoundInvocation, body: Expr, op: SumOp) -> Self {
        Self::Sum {
            invocation,
            body: Box::new(body),
            op,
        }
    }

    #[allow(missing_docs)]
    pub fn app(op: &Arc<Operation>, params: Vec<Expr>, args: Vec<Expr>) -> Self {
        Self::App {
            op: op.clone(),
            params,
            args,
        }
    }

    /// Apply the constructor of `ty` with the given name. Panics if `ty` has no
    /// such constructor.
    pub fn construct(ty: &Arc<CustomType>, ctor: &str, fields: Vec<Expr>) -> Self {
        let ctor = ty
            .constructor(ctor)
            .unwrap_or_else(|| panic!("{} has no constructor {ctor}", ty.name))
            .clone();
        Self::Construct {
            ty: ty.clone(),
            ctor,
            fields,
        }
    }
}

/// Utilities for getting information about a given [`Expr`]
impl Expr {
    /// The type of the expression.
    ///
    /// Panics on ill-typed trees (e.g. selecting from a non-array), which the
    /// front end never produces.
    pub fn ty(&self) -> Type {
        match self {
            Expr::Int(_) | Expr::IntOp(..) | Expr::BvNot(_) => Type::Int,
            Expr::Bool(_) | Expr::BoolOp(..) | Expr::Cmp(..) | Expr::Not(_) => Type::Bool,
            Expr::ArrayInit(init) => Type::array(init.ty()),
            Expr::Var(_, binder) => binder.ty.clone(),
            Expr::Select { array, .. } => match array.ty() {
                Type::Array(element) => *element,
                ty => panic!("select from a value of type {ty}"),
            },
            Expr::Store { array, .. } => array.ty(),
            Expr::Ite { then, .. } => then.ty(),
            Expr::Sum { op, .. } => op.ty(),
            Expr::App { op, .. } => op.body.ty(),
            Expr::Construct { ty, .. } => Type::Custom(ty.clone()),
            Expr::Match { arms, .. } => arms[0].result.ty(),
            Expr::Const(c) => c.value.ty(),
        }
    }

    /// Whether the expression is a literal value (see [`Value::from_literal`]).
    pub fn is_literal(&self) -> bool {
        Value::from_literal(self).is_some()
    }
}
