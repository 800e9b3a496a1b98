use std::fmt;
use std::sync::Arc;

use itertools::Itertools;
use num::ToPrimitive;
use ordered_float::OrderedFloat;

use crate::relational;

/// The result type of an expression, as far as the algebra cares about it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterizedType {
    Boolean,
    Int,
    Double,
    Char,
    String,
    /// Any reference type, by name.
    Object(Arc<str>),
    /// An unbound type parameter; accepted wherever a boolean is.
    TypeParameter(Arc<str>),
}

impl ParameterizedType {
    pub fn is_boolean(&self) -> bool {
        matches!(self, ParameterizedType::Boolean)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ParameterizedType::Int | ParameterizedType::Double)
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, ParameterizedType::Int)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            ParameterizedType::Boolean
                | ParameterizedType::Int
                | ParameterizedType::Double
                | ParameterizedType::Char
        )
    }

    pub fn is_type_parameter(&self) -> bool {
        matches!(self, ParameterizedType::TypeParameter(_))
    }

    /// The type of `a + b` or `a * b`.
    pub fn widen(&self, other: &ParameterizedType) -> ParameterizedType {
        if self.is_discrete() && other.is_discrete() {
            ParameterizedType::Int
        } else {
            ParameterizedType::Double
        }
    }
}

impl fmt::Display for ParameterizedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterizedType::Boolean => write!(f, "boolean"),
            ParameterizedType::Int => write!(f, "int"),
            ParameterizedType::Double => write!(f, "double"),
            ParameterizedType::Char => write!(f, "char"),
            ParameterizedType::String => write!(f, "String"),
            ParameterizedType::Object(name) | ParameterizedType::TypeParameter(name) => {
                write!(f, "{}", name)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariableKind {
    /// `this_scope` is set when the field is read through `this`.
    Field { this_scope: bool },
    Parameter,
    Local,
    ArrayElement,
}

/// An opaque reference to something the analyser tracks. The algebra only
/// compares, hashes and orders variables.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    pub name: Arc<str>,
    pub kind: VariableKind,
    pub ty: ParameterizedType,
}

impl Variable {
    pub fn new(name: &str, kind: VariableKind, ty: ParameterizedType) -> Self {
        Self {
            name: name.into(),
            kind,
            ty,
        }
    }

    pub fn local(name: &str, ty: ParameterizedType) -> Self {
        Self::new(name, VariableKind::Local, ty)
    }

    pub fn parameter(name: &str, ty: ParameterizedType) -> Self {
        Self::new(name, VariableKind::Parameter, ty)
    }

    pub fn field(name: &str, ty: ParameterizedType) -> Self {
        Self::new(name, VariableKind::Field { this_scope: true }, ty)
    }

    pub fn is_field(&self) -> bool {
        matches!(self.kind, VariableKind::Field { .. })
    }
}

/// Type tags and constant builders shared by everything that builds values.
#[derive(Clone, Debug)]
pub struct Primitives {
    boolean: ParameterizedType,
    int: ParameterizedType,
    double: ParameterizedType,
    string: ParameterizedType,
}

impl Default for Primitives {
    fn default() -> Self {
        Self {
            boolean: ParameterizedType::Boolean,
            int: ParameterizedType::Int,
            double: ParameterizedType::Double,
            string: ParameterizedType::String,
        }
    }
}

impl Primitives {
    pub fn boolean_type(&self) -> &ParameterizedType {
        &self.boolean
    }

    pub fn int_type(&self) -> &ParameterizedType {
        &self.int
    }

    pub fn double_type(&self) -> &ParameterizedType {
        &self.double
    }

    pub fn string_type(&self) -> &ParameterizedType {
        &self.string
    }

    /// Whether a value of this type may appear as a clause of And/Or.
    pub fn accepts_boolean(&self, ty: &ParameterizedType) -> bool {
        ty == &self.boolean || ty.is_type_parameter()
    }

    pub fn int_or_double(&self, value: f64) -> Expression {
        Expression::int_or_double(value)
    }
}

/// A canonical boolean/arithmetic expression.
///
/// Values are immutable; children sit behind `Arc` so clones are cheap and
/// trees can be shared between threads. The constructors in `arithmetic`,
/// `relational`, `negation`, `inline` and `clauses` keep every node in its
/// canonical shape; building variants by hand bypasses that.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expression {
    Boolean(bool),
    Int(i64),
    Double(OrderedFloat<f64>),
    Char(char),
    Str(Arc<str>),
    Null,
    Variable(Variable),
    Sum(Arc<Expression>, Arc<Expression>),
    Product(Arc<Expression>, Arc<Expression>),
    Equals(Arc<Expression>, Arc<Expression>),
    GreaterThanZero {
        expression: Arc<Expression>,
        allow_equals: bool,
    },
    Negation(Arc<Expression>),
    And(Arc<[Expression]>),
    Or(Arc<[Expression]>),
    InlineConditional {
        condition: Arc<Expression>,
        if_true: Arc<Expression>,
        if_false: Arc<Expression>,
    },
    /// Not computable yet.
    Unknown(ParameterizedType),
    /// Neutral placeholder; dropped by the clause engine.
    Empty,
}

pub const TRUE: Expression = Expression::Boolean(true);
pub const FALSE: Expression = Expression::Boolean(false);

impl Expression {
    pub fn int(value: i64) -> Self {
        Expression::Int(value)
    }

    pub fn double(value: f64) -> Self {
        Expression::Double(OrderedFloat(value))
    }

    pub fn boolean(value: bool) -> Self {
        Expression::Boolean(value)
    }

    pub fn string(value: &str) -> Self {
        Expression::Str(value.into())
    }

    pub fn variable(variable: Variable) -> Self {
        Expression::Variable(variable)
    }

    /// An `Int` when `value` is integral and fits, a `Double` otherwise.
    pub fn int_or_double(value: f64) -> Self {
        if value.fract() == 0.0 {
            if let Some(i) = value.to_i64() {
                return Expression::Int(i);
            }
        }
        Expression::double(value)
    }

    pub(crate) fn sum_node(lhs: Expression, rhs: Expression) -> Self {
        Expression::Sum(Arc::new(lhs), Arc::new(rhs))
    }

    pub(crate) fn product_node(lhs: Expression, rhs: Expression) -> Self {
        Expression::Product(Arc::new(lhs), Arc::new(rhs))
    }

    pub(crate) fn equals_node(lhs: Expression, rhs: Expression) -> Self {
        Expression::Equals(Arc::new(lhs), Arc::new(rhs))
    }

    pub(crate) fn negation_node(inner: Expression) -> Self {
        Expression::Negation(Arc::new(inner))
    }

    pub(crate) fn greater_than_zero_node(expression: Expression, allow_equals: bool) -> Self {
        Expression::GreaterThanZero {
            expression: Arc::new(expression),
            allow_equals,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Expression::Int(_) | Expression::Double(_))
    }

    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Expression::Boolean(_)
                | Expression::Int(_)
                | Expression::Double(_)
                | Expression::Char(_)
                | Expression::Str(_)
                | Expression::Null
        )
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Expression::Unknown(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Expression::Empty)
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Expression::Boolean(true))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Expression::Boolean(false))
    }

    pub fn double_value(&self) -> Option<f64> {
        match self {
            Expression::Int(i) => Some(*i as f64),
            Expression::Double(d) => Some(d.into_inner()),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.double_value() == Some(0.0)
    }

    pub fn is_one(&self) -> bool {
        self.double_value() == Some(1.0)
    }

    pub fn is_minus_one(&self) -> bool {
        self.double_value() == Some(-1.0)
    }

    pub fn is_discrete(&self) -> bool {
        self.return_type().is_discrete()
    }

    pub fn is_numeric_type(&self) -> bool {
        self.return_type().is_numeric()
    }

    /// The clauses of an And or Or node.
    pub fn clauses(&self) -> Option<&[Expression]> {
        match self {
            Expression::And(clauses) | Expression::Or(clauses) => Some(clauses),
            _ => None,
        }
    }

    pub fn return_type(&self) -> ParameterizedType {
        match self {
            Expression::Boolean(_)
            | Expression::Equals(..)
            | Expression::GreaterThanZero { .. }
            | Expression::And(_)
            | Expression::Or(_) => ParameterizedType::Boolean,
            Expression::Int(_) => ParameterizedType::Int,
            Expression::Double(_) => ParameterizedType::Double,
            Expression::Char(_) => ParameterizedType::Char,
            Expression::Str(_) => ParameterizedType::String,
            Expression::Null => ParameterizedType::Object("null".into()),
            Expression::Variable(v) => v.ty.clone(),
            Expression::Sum(l, r) | Expression::Product(l, r) => {
                l.return_type().widen(&r.return_type())
            }
            Expression::Negation(inner) => inner.return_type(),
            Expression::InlineConditional {
                if_true, if_false, ..
            } => {
                if matches!(**if_true, Expression::Null) {
                    if_false.return_type()
                } else {
                    if_true.return_type()
                }
            }
            Expression::Unknown(ty) => ty.clone(),
            Expression::Empty => ParameterizedType::TypeParameter("?".into()),
        }
    }

    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Sum(l, r) | Expression::Product(l, r) | Expression::Equals(l, r) => {
                vec![&**l, &**r]
            }
            Expression::GreaterThanZero { expression, .. } => vec![&**expression],
            Expression::Negation(inner) => vec![&**inner],
            Expression::And(clauses) | Expression::Or(clauses) => clauses.iter().collect(),
            Expression::InlineConditional {
                condition,
                if_true,
                if_false,
            } => vec![&**condition, &**if_true, &**if_false],
            _ => vec![],
        }
    }

    /// Pre-order traversal; children are visited when `f` returns true.
    pub fn visit(&self, f: &mut impl FnMut(&Expression) -> bool) {
        if f(self) {
            for child in self.children() {
                child.visit(f);
            }
        }
    }

    /// The variables in the expression, in order of first appearance.
    pub fn variables(&self) -> Vec<Variable> {
        let mut vars: Vec<Variable> = vec![];
        self.visit(&mut |e| {
            if let Expression::Variable(v) = e {
                if !vars.contains(v) {
                    vars.push(v.clone());
                }
            }
            true
        });
        vars
    }

    /// Size measure used to stop the clause engine from working on huge inputs.
    pub fn complexity(&self) -> usize {
        match self {
            Expression::And(clauses) => 1 + clauses.iter().map(|c| c.complexity()).sum::<usize>(),
            Expression::Or(clauses) => 2 + clauses.iter().map(|c| c.complexity()).sum::<usize>(),
            _ => 1 + self.children().iter().map(|c| c.complexity()).sum::<usize>(),
        }
    }

    fn needs_parentheses(&self) -> bool {
        matches!(
            self,
            Expression::Sum(..)
                | Expression::And(_)
                | Expression::Or(_)
                | Expression::InlineConditional { .. }
                | Expression::Equals(..)
                | Expression::GreaterThanZero { .. }
        )
    }
}

struct Operand<'a>(&'a Expression);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.needs_parentheses() {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

fn fmt_bound(b: f64) -> String {
    match Expression::int_or_double(b) {
        Expression::Int(i) => i.to_string(),
        _ => b.to_string(),
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Boolean(b) => write!(f, "{}", b),
            Expression::Int(i) => write!(f, "{}", i),
            Expression::Double(d) => write!(f, "{:?}", d.into_inner()),
            Expression::Char(c) => write!(f, "'{}'", c),
            Expression::Str(s) => write!(f, "\"{}\"", s),
            Expression::Null => write!(f, "null"),
            Expression::Variable(v) => write!(f, "{}", v.name),
            Expression::Sum(l, r) => write!(f, "{} + {}", l, Operand(r)),
            Expression::Product(l, r) => write!(f, "{} * {}", Operand(l), Operand(r)),
            Expression::Equals(l, r) => write!(f, "{} == {}", Operand(l), Operand(r)),
            Expression::GreaterThanZero {
                expression,
                allow_equals,
            } => {
                let xb = relational::extract(expression);
                let op = match (xb.less_than, allow_equals) {
                    (false, true) => ">=",
                    (false, false) => ">",
                    (true, true) => "<=",
                    (true, false) => "<",
                };
                write!(f, "{} {} {}", Operand(&xb.x), op, fmt_bound(xb.b))
            }
            Expression::Negation(inner) => match &**inner {
                Expression::Equals(l, r) => write!(f, "{} != {}", Operand(l), Operand(r)),
                e if e.is_numeric_type() => write!(f, "-{}", Operand(e)),
                e => write!(f, "!{}", Operand(e)),
            },
            Expression::And(clauses) => {
                write!(f, "{}", clauses.iter().map(|c| Operand(c).to_string()).join(" && "))
            }
            Expression::Or(clauses) => {
                write!(f, "{}", clauses.iter().map(|c| Operand(c).to_string()).join(" || "))
            }
            Expression::InlineConditional {
                condition,
                if_true,
                if_false,
            } => write!(
                f,
                "{} ? {} : {}",
                Operand(condition),
                Operand(if_true),
                Operand(if_false)
            ),
            Expression::Unknown(ty) => write!(f, "<unknown:{}>", ty),
            Expression::Empty => write!(f, "<empty>"),
        }
    }
}
