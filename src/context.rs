use crate::expression::{Expression, Primitives};
use crate::HashSet;

/// Bounds on how much work the clause engine does per call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Inputs whose summed complexity exceeds this are only flattened,
    /// sorted and deduplicated.
    pub complexity: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self { complexity: 200 }
    }
}

impl Limits {
    pub fn unbounded() -> Self {
        Self {
            complexity: usize::MAX,
        }
    }
}

/// What the algebra needs to know about the surrounding analysis.
pub trait EvaluationContext {
    fn primitives(&self) -> &Primitives;

    /// True when the context can prove that `expression` never evaluates to null.
    fn is_not_null(&self, expression: &Expression) -> bool;

    fn limits(&self) -> &Limits;
}

/// A context backed by an explicit set of expressions known to be non-null.
#[derive(Clone, Debug, Default)]
pub struct SimpleContext {
    primitives: Primitives,
    limits: Limits,
    not_null: HashSet<Expression>,
}

impl SimpleContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_not_null(mut self, expression: Expression) -> Self {
        self.not_null.insert(expression);
        self
    }

    pub fn add_not_null(&mut self, expression: Expression) {
        self.not_null.insert(expression);
    }
}

impl EvaluationContext for SimpleContext {
    fn primitives(&self) -> &Primitives {
        &self.primitives
    }

    fn is_not_null(&self, expression: &Expression) -> bool {
        match expression {
            Expression::Null | Expression::Unknown(_) | Expression::Empty => false,
            e if e.is_constant() => true,
            Expression::Variable(v) if v.ty.is_primitive() => true,
            Expression::Sum(..)
            | Expression::Product(..)
            | Expression::Equals(..)
            | Expression::GreaterThanZero { .. }
            | Expression::And(_)
            | Expression::Or(_) => true,
            e => self.not_null.contains(e),
        }
    }

    fn limits(&self) -> &Limits {
        &self.limits
    }
}
