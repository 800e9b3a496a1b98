//! Read-only extraction of individual clauses from a condition.
//!
//! A [`Filter`] walks And/Or/Negation structure and hands every other node to
//! a list of matchers. Matched nodes are collected under a key; the rest of
//! the condition is rebuilt from what no matcher wanted.

use std::hash::Hash;

use crate::clauses::{self, Polarity};
use crate::context::EvaluationContext;
use crate::expression::{Expression, Variable, VariableKind, FALSE, TRUE};
use crate::negation::negate;
use crate::relational;
use crate::IndexMap;

/// Which clause kinds the filter descends into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    /// And and Or.
    All,
    /// And only.
    Accept,
    /// Or only.
    Reject,
}

impl std::str::FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            _ => Err(format!("invalid filter mode: {}", s)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilterResult<K: Hash + Eq> {
    pub accepted: IndexMap<K, Expression>,
    pub rest: Expression,
}

/// Decides whether a single (non-And, non-Or, non-Negation) node is wanted,
/// and under which key.
pub trait FilterMethod<K> {
    fn apply(&self, value: &Expression) -> Option<(K, Expression)>;
}

impl<K, F> FilterMethod<K> for F
where
    F: Fn(&Expression) -> Option<(K, Expression)>,
{
    fn apply(&self, value: &Expression) -> Option<(K, Expression)> {
        self(value)
    }
}

/// What is left of a sub-expression; `None` when matchers consumed all of it.
struct Partial<K> {
    accepted: IndexMap<K, Expression>,
    rest: Option<Expression>,
}

pub struct Filter<'a> {
    context: &'a dyn EvaluationContext,
    mode: FilterMode,
    default_rest: Expression,
}

impl<'a> Filter<'a> {
    pub fn new(context: &'a dyn EvaluationContext, mode: FilterMode) -> Self {
        let default_rest = if mode == FilterMode::Reject { FALSE } else { TRUE };
        Self {
            context,
            mode,
            default_rest,
        }
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// The rest reported when nothing is left: `false` when rejecting, `true`
    /// otherwise.
    pub fn default_rest(&self) -> &Expression {
        &self.default_rest
    }

    /// Splits `value` into the clauses the first matching method accepts and
    /// the rest. `value` itself is not modified.
    pub fn filter<K: Hash + Eq + Clone>(
        &self,
        value: &Expression,
        methods: &[&dyn FilterMethod<K>],
    ) -> FilterResult<K> {
        match self.internal(value, methods) {
            Some(partial) => FilterResult {
                accepted: partial.accepted,
                rest: partial.rest.unwrap_or_else(|| self.default_rest.clone()),
            },
            None => FilterResult {
                accepted: IndexMap::default(),
                rest: value.clone(),
            },
        }
    }

    fn internal<K: Hash + Eq + Clone>(
        &self,
        value: &Expression,
        methods: &[&dyn FilterMethod<K>],
    ) -> Option<Partial<K>> {
        match value {
            Expression::Negation(inner) => {
                let partial = self.internal(inner, methods)?;
                let accepted = partial
                    .accepted
                    .into_iter()
                    .map(|(k, v)| (k, negate(self.context, &v)))
                    .collect();
                let rest = partial.rest.map(|r| negate(self.context, &r));
                Some(Partial { accepted, rest })
            }
            Expression::And(clauses) if self.mode != FilterMode::Reject => {
                Some(self.process(clauses, Polarity::And, methods))
            }
            Expression::Or(clauses) if self.mode != FilterMode::Accept => {
                Some(self.process(clauses, Polarity::Or, methods))
            }
            Expression::And(_) | Expression::Or(_) | Expression::Unknown(_) => None,
            _ => {
                let (key, accepted) = methods.iter().find_map(|m| m.apply(value))?;
                let mut map = IndexMap::default();
                map.insert(key, accepted);
                Some(Partial {
                    accepted: map,
                    rest: None,
                })
            }
        }
    }

    fn process<K: Hash + Eq + Clone>(
        &self,
        clauses: &[Expression],
        polarity: Polarity,
        methods: &[&dyn FilterMethod<K>],
    ) -> Partial<K> {
        let mut accepted = IndexMap::default();
        let mut rests = vec![];
        for clause in clauses {
            match self.internal(clause, methods) {
                Some(partial) => {
                    for (k, v) in partial.accepted {
                        accepted.entry(k).or_insert(v);
                    }
                    rests.extend(partial.rest);
                }
                None => rests.push(clause.clone()),
            }
        }
        let rest = if rests.is_empty() {
            None
        } else {
            Some(clauses::combine(self.context, polarity, rests))
        };
        Partial { accepted, rest }
    }
}

fn this_field(e: &Expression) -> Option<&Variable> {
    match e {
        Expression::Variable(v) if v.kind == (VariableKind::Field { this_scope: true }) => Some(v),
        _ => None,
    }
}

/// Accepts clauses about exactly one field of `this`: `field == constant`,
/// bounds on a single field, and boolean fields. Keyed by the field.
pub fn individual_field_clause(value: &Expression) -> Option<(Variable, Expression)> {
    match value {
        Expression::Equals(l, r) => {
            let field = this_field(r).or_else(|| this_field(l))?;
            let other = if this_field(r).is_some() { l } else { r };
            if other.is_constant() {
                Some((field.clone(), value.clone()))
            } else {
                None
            }
        }
        Expression::GreaterThanZero { expression, .. } => {
            let xb = relational::extract(expression);
            let field = this_field(&xb.x)?;
            Some((field.clone(), value.clone()))
        }
        Expression::Variable(v) if this_field(value).is_some() && v.ty.is_boolean() => {
            Some((v.clone(), value.clone()))
        }
        _ => None,
    }
}

/// Accepts `null == v`, and through negation `null != v`. Keyed by `v`.
pub fn individual_null_or_not_null_clause(value: &Expression) -> Option<(Variable, Expression)> {
    match value {
        Expression::Equals(l, r) if matches!(**l, Expression::Null) => match &**r {
            Expression::Variable(v) => Some((v.clone(), value.clone())),
            _ => None,
        },
        _ => None,
    }
}

/// Accepts nodes equal to `target`, keyed by the node itself.
pub fn exact_value(target: Expression) -> impl Fn(&Expression) -> Option<(Expression, Expression)> {
    move |value: &Expression| {
        if *value == target {
            Some((value.clone(), value.clone()))
        } else {
            None
        }
    }
}
