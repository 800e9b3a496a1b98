//! The And/Or clause engine.
//!
//! Both connectives share one fixpoint loop: flatten, sort with
//! [`order::compare`], then scan the sorted list once, deciding for every
//! value what to do given the previously kept clause. Comparisons are also
//! checked against every kept comparison on the same expression. Rules for Or
//! are the duals of the rules for And (inner kind and constants swapped). The
//! loop repeats until a pass makes no change.

use std::fmt;

use crate::arithmetic::sum_of;
use crate::context::EvaluationContext;
use crate::error::{Error, Result};
use crate::expression::Expression;
use crate::negation::negate;
use crate::order;
use crate::relational::{self, equals};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Polarity {
    And,
    Or,
}

impl Polarity {
    pub fn dual(self) -> Self {
        match self {
            Polarity::And => Polarity::Or,
            Polarity::Or => Polarity::And,
        }
    }

    /// `true` for And, `false` for Or.
    pub fn identity(self) -> Expression {
        Expression::Boolean(self == Polarity::And)
    }

    /// `false` for And, `true` for Or.
    pub fn absorbing(self) -> Expression {
        Expression::Boolean(self.absorbing_value())
    }

    fn absorbing_value(self) -> bool {
        self == Polarity::Or
    }

    /// The clauses of `e` when it is a node of this kind.
    pub fn members(self, e: &Expression) -> Option<&[Expression]> {
        match (self, e) {
            (Polarity::And, Expression::And(clauses)) | (Polarity::Or, Expression::Or(clauses)) => {
                Some(clauses)
            }
            _ => None,
        }
    }

    fn wrap(self, clauses: Vec<Expression>) -> Expression {
        match self {
            Polarity::And => Expression::And(clauses.into()),
            Polarity::Or => Expression::Or(clauses.into()),
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::And => write!(f, "and"),
            Polarity::Or => write!(f, "or"),
        }
    }
}

/// The conjunction of `values`.
pub fn and(context: &dyn EvaluationContext, values: &[Expression]) -> Result<Expression> {
    Clauses::new(Polarity::And).append(context, values)
}

/// The disjunction of `values`.
pub fn or(context: &dyn EvaluationContext, values: &[Expression]) -> Result<Expression> {
    Clauses::new(Polarity::Or).append(context, values)
}

/// An And or Or under construction: existing clauses that new values are
/// appended to.
#[derive(Clone, Debug)]
pub struct Clauses {
    polarity: Polarity,
    existing: Vec<Expression>,
}

impl Clauses {
    pub fn new(polarity: Polarity) -> Self {
        Self {
            polarity,
            existing: vec![],
        }
    }

    /// Starts from `expression`; its clauses are taken over when it is a node
    /// of the same kind.
    pub fn of(polarity: Polarity, expression: &Expression) -> Self {
        let existing = match polarity.members(expression) {
            Some(clauses) => clauses.to_vec(),
            None => vec![expression.clone()],
        };
        Self { polarity, existing }
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn len(&self) -> usize {
        self.existing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.existing.is_empty()
    }

    /// Combines the existing clauses with `values`. Fails when a value is not
    /// boolean.
    pub fn append(&self, context: &dyn EvaluationContext, values: &[Expression]) -> Result<Expression> {
        for value in values {
            if value.is_empty() {
                continue;
            }
            let ty = value.return_type();
            if !context.primitives().accepts_boolean(&ty) {
                return Err(Error::InvalidArgument(format!(
                    "{} expects boolean clauses, got `{}` of type {}",
                    self.polarity, value, ty
                )));
            }
        }
        if self.existing.is_empty() && values.len() == 1 && self.polarity.members(&values[0]).is_some() {
            return Ok(values[0].clone());
        }
        let mut all = self.existing.clone();
        all.extend_from_slice(values);
        Ok(combine(context, self.polarity, all))
    }
}

/// Same as [`Clauses::append`] on an empty list, without type checks.
pub(crate) fn combine(
    context: &dyn EvaluationContext,
    polarity: Polarity,
    values: Vec<Expression>,
) -> Expression {
    let limit = context.limits().complexity;
    let mut concat = values;
    loop {
        concat = flatten(polarity, concat);
        if concat.iter().any(Expression::is_unknown) {
            return Expression::Unknown(context.primitives().boolean_type().clone());
        }
        let complexity: usize = concat.iter().map(Expression::complexity).sum();
        if complexity > limit {
            log::debug!(
                "{} over {} clauses has complexity {} > {}, not reducing",
                polarity,
                concat.len(),
                complexity,
                limit
            );
            return reduced(polarity, concat);
        }

        concat.sort_by(order::compare);
        if concat.contains(&polarity.absorbing()) {
            return polarity.absorbing();
        }
        concat.retain(|v| !matches!(v, Expression::Boolean(_)));

        let mut pass = Pass {
            context,
            polarity,
            accepted: Vec::with_capacity(concat.len()),
            changes: false,
        };
        for value in concat {
            match pass.analyse(&value) {
                Action::Skip => pass.changes = true,
                Action::Add => pass.accepted.push(value),
                Action::AddChange => {
                    pass.accepted.push(value);
                    pass.changes = true;
                }
                Action::Replace => {
                    pass.set_last(value);
                    pass.changes = true;
                }
                Action::Constant(b) => {
                    log::trace!("{} reduced to {}", polarity, b);
                    return Expression::Boolean(b);
                }
            }
        }
        concat = pass.accepted;
        if !pass.changes {
            break;
        }
    }
    finalize(context, polarity, concat)
}

fn flatten(polarity: Polarity, values: Vec<Expression>) -> Vec<Expression> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        push_flat(polarity, value, &mut out);
    }
    out
}

fn push_flat(polarity: Polarity, value: Expression, out: &mut Vec<Expression>) {
    if let Some(members) = polarity.members(&value) {
        for member in members.iter() {
            push_flat(polarity, member.clone(), out);
        }
        return;
    }
    if !value.is_empty() {
        out.push(value);
    }
}

/// Result of the cheap path for inputs that are too large to reduce.
fn reduced(polarity: Polarity, mut concat: Vec<Expression>) -> Expression {
    concat.sort_by(order::compare);
    concat.dedup();
    if concat.contains(&polarity.absorbing()) {
        return polarity.absorbing();
    }
    concat.retain(|v| !matches!(v, Expression::Boolean(_)));
    match concat.len() {
        0 => polarity.identity(),
        1 => concat.remove(0),
        _ => polarity.wrap(concat),
    }
}

fn finalize(context: &dyn EvaluationContext, polarity: Polarity, mut concat: Vec<Expression>) -> Expression {
    match concat.len() {
        0 => return polarity.identity(),
        1 => return concat.remove(0),
        _ => {}
    }
    if polarity == Polarity::Or {
        if let Some(pos) = concat.iter().position(|e| matches!(e, Expression::And(_))) {
            let first_and = concat.remove(pos);
            if let Some(distributed) = distribute(context, &first_and, &concat) {
                log::debug!("distributed {} over {} disjuncts", first_and, concat.len());
                return distributed;
            }
            concat.insert(pos, first_and);
        }
    }
    polarity.wrap(concat)
}

/// `(a & b) | rest` as `(a | rest) & (b | rest)`, unless that gets too big.
fn distribute(
    context: &dyn EvaluationContext,
    first_and: &Expression,
    rest: &[Expression],
) -> Option<Expression> {
    let conjuncts = Polarity::And.members(first_and)?;
    let rest_complexity: usize = rest.iter().map(Expression::complexity).sum();
    let estimate: usize = conjuncts
        .iter()
        .map(|c| 2 + rest_complexity + c.complexity())
        .sum();
    if estimate > context.limits().complexity {
        return None;
    }
    let components = conjuncts
        .iter()
        .map(|c| {
            let mut disjuncts = rest.to_vec();
            disjuncts.push(c.clone());
            combine(context, Polarity::Or, disjuncts)
        })
        .collect();
    Some(combine(context, Polarity::And, components))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    /// Drop the value.
    Skip,
    /// Keep the value.
    Add,
    /// Keep the value and run another pass.
    AddChange,
    /// The value takes the place of the kept clause it was compared with.
    Replace,
    /// The whole result is this constant.
    Constant(bool),
}

struct Pass<'a> {
    context: &'a dyn EvaluationContext,
    polarity: Polarity,
    accepted: Vec<Expression>,
    changes: bool,
}

impl Pass<'_> {
    fn set_last(&mut self, value: Expression) {
        match self.accepted.last_mut() {
            Some(last) => *last = value,
            None => self.accepted.push(value),
        }
    }

    fn is_and(&self) -> bool {
        self.polarity == Polarity::And
    }

    fn absorbing(&self) -> Action {
        Action::Constant(self.polarity.absorbing_value())
    }

    fn analyse(&mut self, value: &Expression) -> Action {
        let prev = self.accepted.last().cloned();
        if let Some(prev) = &prev {
            if prev == value {
                return Action::Skip;
            }
            if matches!(value, Expression::Negation(inner) if **inner == *prev) {
                return self.absorbing();
            }
            if let Some(action) = self.inline_absorption(prev, value) {
                return action;
            }
        }
        if let Some(action) = self.inner_clause(prev.as_ref(), value) {
            return action;
        }
        if let Some(prev) = &prev {
            if let Some(action) = self.equality_expansion(prev, value) {
                return action;
            }
        }
        if let Some(action) = self.relational(value) {
            return action;
        }
        Action::Add
    }

    /// Pairs a comparison with every kept comparison, latest first, until a
    /// rule reduces the pair. `Replace` overwrites the kept one in place.
    fn relational(&mut self, value: &Expression) -> Option<Action> {
        if !is_relational(value) {
            return None;
        }
        for at in (0..self.accepted.len()).rev() {
            let kept = self.accepted[at].clone();
            if !is_relational(&kept) {
                continue;
            }
            let action = match self.equalities(at, &kept, value) {
                Some(action) => Some(action),
                None => self.bounds(at, &kept, value),
            };
            match action {
                None | Some(Action::Add) => {}
                Some(Action::Replace) => {
                    self.accepted[at] = value.clone();
                    return Some(Action::Skip);
                }
                Some(action) => return Some(action),
            }
        }
        None
    }

    /// `a & (a ? b : c)` is `a & b`; `(a ? b : c) & !a` is `c & !a`.
    fn inline_absorption(&mut self, prev: &Expression, value: &Expression) -> Option<Action> {
        if let Expression::InlineConditional {
            condition,
            if_true,
            if_false,
        } = value
        {
            if **condition == *prev {
                let kept = if self.is_and() { if_true } else { if_false };
                self.accepted.push((**kept).clone());
                return Some(Action::Skip);
            }
        }
        if let Expression::InlineConditional {
            condition,
            if_true,
            if_false,
        } = prev
        {
            if **condition == negate(self.context, value) {
                let kept = if self.is_and() { if_false } else { if_true };
                self.set_last((**kept).clone());
                return Some(Action::AddChange);
            }
        }
        None
    }

    /// Rules for a value of the inner kind (an Or inside an And, or the
    /// reverse).
    fn inner_clause(&mut self, prev: Option<&Expression>, value: &Expression) -> Option<Action> {
        let dual = self.polarity.dual();
        let members = dual.members(value)?;
        if members.len() == 1 {
            self.accepted.push(members[0].clone());
            return Some(Action::Skip);
        }

        let remaining: Vec<Expression> = members
            .iter()
            .filter(|m| !self.accepted.contains(&negate(self.context, m)))
            .cloned()
            .collect();
        if remaining.len() < members.len() {
            if remaining.is_empty() {
                return Some(self.absorbing());
            }
            let smaller = combine(self.context, dual, remaining);
            log::trace!("{} loses members contradicted by kept clauses: {}", value, smaller);
            self.accepted.push(smaller);
            return Some(Action::Skip);
        }

        let subsumed = self.accepted.iter().any(|e| {
            members.contains(e)
                || dual
                    .members(e)
                    .map_or(false, |ms| ms.iter().all(|m| members.contains(m)))
        });
        if subsumed {
            return Some(Action::Skip);
        }

        let before = self.accepted.len();
        self.accepted.retain(|e| {
            !dual
                .members(e)
                .map_or(false, |ms| members.iter().all(|m| ms.contains(m)))
        });
        if self.accepted.len() < before {
            return Some(Action::AddChange);
        }

        // (a | b) & (a | !b) is a
        let prev_members = prev.and_then(|p| dual.members(p))?;
        if members.len() != prev_members.len() {
            return None;
        }
        let mut common = vec![];
        let mut opposite = 0;
        for m in members {
            if prev_members.contains(m) {
                common.push(m.clone());
            } else if prev_members.contains(&negate(self.context, m)) {
                opposite += 1;
            }
        }
        if opposite == 1 && !common.is_empty() && common.len() + 1 == members.len() {
            let merged = combine(self.context, dual, common);
            self.set_last(merged);
            return Some(Action::Skip);
        }
        None
    }

    /// `x == k & (d1 | d2 ...)` where every `di` is about `x`: drops the
    /// disjuncts that contradict `x == k`. Dual for Or with `x != k`.
    fn equality_expansion(&mut self, prev: &Expression, value: &Expression) -> Option<Action> {
        let pinned = if self.is_and() {
            equal_constant(prev)
        } else {
            not_equal_constant(prev)
        };
        let (_, x) = pinned?;
        let dual = self.polarity.dual();
        let members = dual.members(value)?;
        if !members.iter().all(|m| subject(m) == *x) {
            return None;
        }
        let absorbing = self.polarity.absorbing();
        let mut kept = vec![];
        for m in members {
            let combined = combine(self.context, self.polarity, vec![prev.clone(), m.clone()]);
            if combined == *prev {
                return Some(Action::Skip);
            }
            if combined != absorbing {
                kept.push(m.clone());
            }
        }
        if kept.is_empty() {
            return Some(self.absorbing());
        }
        if kept.len() == members.len() {
            return None;
        }
        let smaller = combine(self.context, dual, kept);
        self.accepted.push(smaller);
        Some(Action::Skip)
    }

    fn equalities(&mut self, at: usize, prev: &Expression, value: &Expression) -> Option<Action> {
        let and = self.is_and();
        // x != k1 & x == k2
        if let (Some((k1, x1)), Some((k2, x2))) = (not_equal_constant(prev), equal_constant(value)) {
            if x1 == x2 && !same_value(k1, k2) {
                return Some(if and { Action::Replace } else { Action::Skip });
            }
        }
        // x == k1 & x == k2
        if let (Some((k1, x1)), Some((k2, x2))) = (equal_constant(prev), equal_constant(value)) {
            if x1 == x2 && !same_value(k1, k2) {
                return Some(if and { Action::Constant(false) } else { Action::Add });
            }
        }
        // x == k1 & x != k2
        if let (Some((k1, x1)), Some((k2, x2))) = (equal_constant(prev), not_equal_constant(value)) {
            if x1 == x2 && !same_value(k1, k2) {
                return Some(if and { Action::Skip } else { Action::Replace });
            }
        }
        // x != k1 & x != k2
        if let (Some((k1, x1)), Some((k2, x2))) = (not_equal_constant(prev), not_equal_constant(value)) {
            if x1 == x2 && !same_value(k1, k2) {
                return Some(if and { Action::Add } else { Action::Constant(true) });
            }
        }
        if let Expression::GreaterThanZero {
            expression,
            allow_equals,
        } = value
        {
            // x == k & bound on x
            if let Some((k, x)) = equal_constant(prev) {
                let y = k.double_value()?;
                let xb = relational::extract(expression);
                if xb.x != *x {
                    return None;
                }
                let inside = xb.accepts(y, *allow_equals);
                return Some(match (and, inside) {
                    (true, true) => Action::Skip,
                    (true, false) => Action::Constant(false),
                    (false, true) => Action::Replace,
                    (false, false) => match widen(expression, *allow_equals, y) {
                        Some(widened) => {
                            log::trace!("{} | {} widened to {}", prev, value, widened);
                            self.accepted[at] = widened;
                            Action::Skip
                        }
                        None => Action::Add,
                    },
                });
            }
            // x != k & bound on x
            if let Some((k, x)) = not_equal_constant(prev) {
                let y = k.double_value()?;
                let xb = relational::extract(expression);
                if xb.x != *x {
                    return None;
                }
                let inside = xb.accepts(y, *allow_equals);
                if !and {
                    return Some(if inside { Action::Constant(true) } else { Action::Skip });
                }
                if !inside {
                    return Some(Action::Replace);
                }
                if *allow_equals && y == xb.b {
                    let tightened = tighten(expression);
                    log::trace!("{} & {} tightened to {}", prev, value, tightened);
                    self.accepted[at] = tightened;
                    return Some(Action::Skip);
                }
            }
        }
        None
    }

    /// Two bounds on the same expression, or on an expression and its negation.
    fn bounds(&mut self, at: usize, prev: &Expression, value: &Expression) -> Option<Action> {
        let (
            Expression::GreaterThanZero {
                expression: e1,
                allow_equals: a1,
            },
            Expression::GreaterThanZero {
                expression: e2,
                allow_equals: a2,
            },
        ) = (prev, value)
        else {
            return None;
        };
        let xb1 = relational::extract(e1);
        let xb2 = relational::extract(e2);
        let reverse = if xb1.x == xb2.x {
            false
        } else if xb1.x == crate::arithmetic::negate_numeric(&xb2.x) {
            true
        } else {
            return None;
        };
        let b1 = xb1.b;
        let b2 = if reverse { -xb2.b } else { xb2.b };
        let lt1 = xb1.less_than;
        let lt2 = xb2.less_than != reverse;

        if lt1 == lt2 {
            if b1 == b2 {
                // on a tie the And keeps the strict bound, the Or the inclusive one
                return Some(match (self.is_and(), *a1) {
                    (true, true) | (false, false) => Action::Replace,
                    (true, false) | (false, true) => Action::Skip,
                });
            }
            let prev_is_tighter = if lt1 { b1 < b2 } else { b1 > b2 };
            return Some(if prev_is_tighter == self.is_and() {
                Action::Skip
            } else {
                Action::Replace
            });
        }

        let (lower, lower_inclusive, upper, upper_inclusive) = if lt1 {
            (b2, *a2, b1, *a1)
        } else {
            (b1, *a1, b2, *a2)
        };
        if self.is_and() {
            if lower < upper {
                return Some(Action::Add);
            }
            if lower == upper && lower_inclusive && upper_inclusive {
                let pinned = equals(
                    self.context,
                    &self.context.primitives().int_or_double(b1),
                    &xb1.x,
                );
                log::trace!("{} & {} pinned to {}", prev, value, pinned);
                self.accepted[at] = pinned;
                return Some(Action::Skip);
            }
            return Some(Action::Constant(false));
        }

        let integral = xb1.x.is_discrete()
            && lower.fract() == 0.0
            && upper.fract() == 0.0
            && lower_inclusive
            && upper_inclusive;
        let covers = if integral {
            lower <= upper + 1.0
        } else {
            lower < upper || (lower == upper && (lower_inclusive || upper_inclusive))
        };
        if covers {
            return Some(Action::Constant(true));
        }
        // x <= k - 1 | x >= k + 1 is x != k
        let gap = if integral {
            lower == upper + 2.0
        } else {
            lower == upper && !lower_inclusive && !upper_inclusive
        };
        if !gap {
            return Some(Action::Add);
        }
        let k = if integral { upper + 1.0 } else { lower };
        let excluded = negate(
            self.context,
            &equals(self.context, &self.context.primitives().int_or_double(k), &xb1.x),
        );
        log::trace!("{} | {} left out {}", prev, value, excluded);
        self.accepted[at] = excluded;
        Some(Action::Skip)
    }
}

/// `k == x` with a constant `k`.
fn equal_constant(e: &Expression) -> Option<(&Expression, &Expression)> {
    match e {
        Expression::Equals(k, x) if k.is_constant() => Some((k, x)),
        _ => None,
    }
}

/// `k != x` with a constant `k`.
fn not_equal_constant(e: &Expression) -> Option<(&Expression, &Expression)> {
    match e {
        Expression::Negation(inner) => equal_constant(inner),
        _ => None,
    }
}

fn same_value(k1: &Expression, k2: &Expression) -> bool {
    match (k1.double_value(), k2.double_value()) {
        (Some(a), Some(b)) => a == b,
        _ => k1 == k2,
    }
}

/// The expression a relational clause is about.
fn subject(e: &Expression) -> Expression {
    match e {
        Expression::Equals(_, x) => (**x).clone(),
        Expression::GreaterThanZero { expression, .. } => relational::extract(expression).x,
        Expression::Negation(inner) => subject(inner),
        _ => e.clone(),
    }
}

/// The strict version of an inclusive bound.
fn tighten(expression: &Expression) -> Expression {
    if expression.is_discrete() {
        Expression::greater_than_zero_node(sum_of(expression, &Expression::int(-1)), true)
    } else {
        Expression::greater_than_zero_node(expression.clone(), false)
    }
}

/// The bound one step wider so that it takes in `y`, when `y` lies just
/// outside it.
fn widen(expression: &Expression, allow_equals: bool, y: f64) -> Option<Expression> {
    let xb = relational::extract(expression);
    if expression.is_discrete() {
        let next = if xb.less_than { xb.b + 1.0 } else { xb.b - 1.0 };
        if !allow_equals || y.fract() != 0.0 || y != next {
            return None;
        }
        Some(Expression::greater_than_zero_node(
            sum_of(expression, &Expression::int(1)),
            true,
        ))
    } else if !allow_equals && y == xb.b {
        Some(Expression::greater_than_zero_node(expression.clone(), true))
    } else {
        None
    }
}

fn is_relational(e: &Expression) -> bool {
    match e {
        Expression::Equals(..) | Expression::GreaterThanZero { .. } => true,
        Expression::Negation(inner) => matches!(**inner, Expression::Equals(..)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Limits, SimpleContext};
    use crate::expression::{ParameterizedType, Variable, FALSE, TRUE};
    use crate::inline::inline_conditional;
    use crate::relational::{greater, less};

    fn boolean(name: &str) -> Expression {
        Expression::variable(Variable::local(name, ParameterizedType::Boolean))
    }

    fn int_var(name: &str) -> Expression {
        Expression::variable(Variable::local(name, ParameterizedType::Int))
    }

    fn eq(ctx: &SimpleContext, k: i64, x: &Expression) -> Expression {
        equals(ctx, &Expression::int(k), x)
    }

    fn ge(ctx: &SimpleContext, x: &Expression, k: i64) -> Expression {
        greater(ctx, x, &Expression::int(k), true)
    }

    fn le(ctx: &SimpleContext, x: &Expression, k: i64) -> Expression {
        less(ctx, x, &Expression::int(k), true)
    }

    #[test]
    fn empty_and_single() {
        let ctx = SimpleContext::new();
        let a = boolean("a");
        assert_eq!(and(&ctx, &[]).unwrap(), TRUE);
        assert_eq!(or(&ctx, &[]).unwrap(), FALSE);
        assert_eq!(and(&ctx, &[a.clone()]).unwrap(), a);
        assert_eq!(and(&ctx, &[a.clone(), a.clone()]).unwrap(), a);
        assert_eq!(and(&ctx, &[a.clone(), TRUE]).unwrap(), a);
        assert_eq!(or(&ctx, &[a.clone(), FALSE]).unwrap(), a);
    }

    #[test]
    fn non_boolean_clause_is_rejected() {
        let ctx = SimpleContext::new();
        let err = and(&ctx, &[boolean("a"), Expression::int(3)]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn contradiction_and_tautology() {
        let ctx = SimpleContext::new();
        let a = boolean("a");
        let not_a = negate(&ctx, &a);
        assert_eq!(and(&ctx, &[a.clone(), not_a.clone()]).unwrap(), FALSE);
        assert_eq!(or(&ctx, &[not_a, a]).unwrap(), TRUE);
    }

    #[test]
    fn commutative_and_flattened() {
        let ctx = SimpleContext::new();
        let (a, b, c) = (boolean("a"), boolean("b"), boolean("c"));
        let ab = and(&ctx, &[a.clone(), b.clone()]).unwrap();
        assert_eq!(ab, and(&ctx, &[b.clone(), a.clone()]).unwrap());
        let abc = and(&ctx, &[ab, c.clone()]).unwrap();
        assert_eq!(abc, Expression::And(vec![a, b, c].into()));
    }

    #[test]
    fn unknown_of_a_non_boolean_type_is_rejected() {
        let ctx = SimpleContext::new();
        let unknown_int = Expression::Unknown(ParameterizedType::Int);
        let err = and(&ctx, &[boolean("a"), unknown_int.clone()]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(or(&ctx, &[unknown_int]).is_err());
        let unknown_t = Expression::Unknown(ParameterizedType::TypeParameter("T".into()));
        assert!(and(&ctx, &[boolean("a"), unknown_t]).unwrap().is_unknown());
    }

    #[test]
    fn unknown_propagates() {
        let ctx = SimpleContext::new();
        let u = Expression::Unknown(ParameterizedType::Boolean);
        assert!(and(&ctx, &[boolean("a"), u.clone()]).unwrap().is_unknown());
        assert!(or(&ctx, &[FALSE, u]).unwrap().is_unknown());
    }

    #[test]
    fn absorption_and_resolution() {
        let ctx = SimpleContext::new();
        let (a, b) = (boolean("a"), boolean("b"));
        let a_or_b = or(&ctx, &[a.clone(), b.clone()]).unwrap();
        assert_eq!(and(&ctx, &[a.clone(), a_or_b.clone()]).unwrap(), a);

        let a_or_not_b = or(&ctx, &[a.clone(), negate(&ctx, &b)]).unwrap();
        assert_eq!(and(&ctx, &[a_or_b.clone(), a_or_not_b]).unwrap(), a);

        // !a & (a | b) is !a & b
        let not_a = negate(&ctx, &a);
        assert_eq!(
            and(&ctx, &[not_a.clone(), a_or_b]).unwrap(),
            and(&ctx, &[not_a, b]).unwrap()
        );
    }

    #[test]
    fn resolution_needs_matching_clauses() {
        let ctx = SimpleContext::new();
        let (a, b, c) = (boolean("a"), boolean("b"), boolean("c"));
        let abc = or(&ctx, &[a.clone(), b.clone(), c]).unwrap();
        let a_not_b = or(&ctx, &[a.clone(), negate(&ctx, &b)]).unwrap();
        let result = and(&ctx, &[abc, a_not_b]).unwrap();
        assert_ne!(result, a);
    }

    #[test]
    fn smaller_inner_clause_subsumes_larger() {
        let ctx = SimpleContext::new();
        let (a, b, c) = (boolean("a"), boolean("b"), boolean("c"));
        let ab = or(&ctx, &[a.clone(), b.clone()]).unwrap();
        let abc = or(&ctx, &[a, b, c]).unwrap();
        assert_eq!(and(&ctx, &[abc, ab.clone()]).unwrap(), ab);
    }

    #[test]
    fn or_distributes_over_and() {
        let ctx = SimpleContext::new();
        let (a, b, c) = (boolean("a"), boolean("b"), boolean("c"));
        let ab = and(&ctx, &[a.clone(), b.clone()]).unwrap();
        let result = or(&ctx, &[ab, c.clone()]).unwrap();
        let expected = and(
            &ctx,
            &[
                or(&ctx, &[a, c.clone()]).unwrap(),
                or(&ctx, &[b, c]).unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(result, expected);
    }

    #[test]
    fn equalities_on_one_variable() {
        let ctx = SimpleContext::new();
        let x = int_var("x");
        let eq3 = eq(&ctx, 3, &x);
        let eq4 = eq(&ctx, 4, &x);
        let ne3 = negate(&ctx, &eq3);
        let ne4 = negate(&ctx, &eq4);
        assert_eq!(and(&ctx, &[eq3.clone(), eq4.clone()]).unwrap(), FALSE);
        assert_eq!(and(&ctx, &[ne3.clone(), eq4.clone()]).unwrap(), eq4);
        assert_eq!(and(&ctx, &[eq3.clone(), ne4.clone()]).unwrap(), eq3);
        assert_eq!(or(&ctx, &[ne3.clone(), eq4]).unwrap(), ne3);
        assert_eq!(or(&ctx, &[eq3, ne4.clone()]).unwrap(), ne4);
        // x != 3 | x != 4 holds for every x
        assert_eq!(or(&ctx, &[ne3.clone(), ne4.clone()]).unwrap(), TRUE);
        assert_eq!(
            and(&ctx, &[ne3.clone(), ne4.clone()]).unwrap(),
            Expression::And(vec![ne3, ne4].into())
        );
        let b = boolean("b");
        let ne0 = negate(&ctx, &eq(&ctx, 0, &x));
        let ne6 = negate(&ctx, &eq(&ctx, 6, &x));
        assert_eq!(or(&ctx, &[b, ne0, ne6]).unwrap(), TRUE);
    }

    #[test]
    fn equality_against_bounds() {
        let ctx = SimpleContext::new();
        let x = int_var("x");
        let eq3 = eq(&ctx, 3, &x);
        assert_eq!(and(&ctx, &[eq3.clone(), ge(&ctx, &x, 5)]).unwrap(), FALSE);
        assert_eq!(and(&ctx, &[eq3.clone(), ge(&ctx, &x, 1)]).unwrap(), eq3);
        assert_eq!(or(&ctx, &[eq3.clone(), ge(&ctx, &x, 1)]).unwrap(), ge(&ctx, &x, 1));
        assert_eq!(
            or(&ctx, &[eq3.clone(), ge(&ctx, &x, 5)]).unwrap(),
            Expression::Or(vec![eq3, ge(&ctx, &x, 5)].into())
        );
    }

    #[test]
    fn not_equal_against_bounds() {
        let ctx = SimpleContext::new();
        let x = int_var("x");
        let ne3 = negate(&ctx, &eq(&ctx, 3, &x));
        // x != 3 & x >= 3 is x >= 4
        assert_eq!(and(&ctx, &[ne3.clone(), ge(&ctx, &x, 3)]).unwrap(), ge(&ctx, &x, 4));
        // x != 3 & x <= 3 is x <= 2
        assert_eq!(and(&ctx, &[ne3.clone(), le(&ctx, &x, 3)]).unwrap(), le(&ctx, &x, 2));
        assert_eq!(and(&ctx, &[ne3.clone(), ge(&ctx, &x, 5)]).unwrap(), ge(&ctx, &x, 5));
        assert_eq!(or(&ctx, &[ne3.clone(), ge(&ctx, &x, 1)]).unwrap(), TRUE);
        assert_eq!(or(&ctx, &[ne3.clone(), ge(&ctx, &x, 5)]).unwrap(), ne3);
        assert_eq!(or(&ctx, &[ne3.clone(), le(&ctx, &x, 3)]).unwrap(), TRUE);
        assert_eq!(or(&ctx, &[ne3.clone(), le(&ctx, &x, 1)]).unwrap(), ne3);
    }

    #[test]
    fn equality_next_to_a_bound_widens_it() {
        let ctx = SimpleContext::new();
        let x = int_var("x");
        let eq3 = eq(&ctx, 3, &x);
        // x == 3 | x <= 2 is x <= 3
        assert_eq!(or(&ctx, &[eq3.clone(), le(&ctx, &x, 2)]).unwrap(), le(&ctx, &x, 3));
        // x == 3 | x >= 4 is x >= 3
        assert_eq!(or(&ctx, &[eq3.clone(), ge(&ctx, &x, 4)]).unwrap(), ge(&ctx, &x, 3));
        assert_eq!(
            or(&ctx, &[eq3.clone(), le(&ctx, &x, 1)]).unwrap(),
            Expression::Or(vec![eq3, le(&ctx, &x, 1)].into())
        );
        // widening chains across passes
        let run = or(&ctx, &[eq(&ctx, 0, &x), eq(&ctx, 1, &x), ge(&ctx, &x, 2)]).unwrap();
        assert_eq!(run, ge(&ctx, &x, 0));

        let d = Expression::variable(Variable::local("d", ParameterizedType::Double));
        let three = Expression::double(3.0);
        let d_eq = equals(&ctx, &three, &d);
        assert_eq!(
            or(&ctx, &[d_eq.clone(), less(&ctx, &d, &three, false)]).unwrap(),
            less(&ctx, &d, &three, true)
        );
        assert_eq!(
            or(&ctx, &[d_eq, greater(&ctx, &d, &three, false)]).unwrap(),
            greater(&ctx, &d, &three, true)
        );
    }

    #[test]
    fn comparisons_meet_across_other_clauses() {
        let ctx = SimpleContext::new();
        let x = int_var("x");
        // x == 2 sorts next to x >= 4, not next to x <= 1
        let e = or(&ctx, &[eq(&ctx, 2, &x), le(&ctx, &x, 1), ge(&ctx, &x, 4)]).unwrap();
        assert_eq!(e, negate(&ctx, &eq(&ctx, 3, &x)));
        let ne1 = negate(&ctx, &eq(&ctx, 1, &x));
        let e = and(&ctx, &[ne1, ge(&ctx, &x, 0), le(&ctx, &x, 1)]).unwrap();
        assert_eq!(e, eq(&ctx, 0, &x));
    }

    #[test]
    fn single_value_gap_is_a_disequality() {
        let ctx = SimpleContext::new();
        let x = int_var("x");
        // x <= 3 | x >= 5 is x != 4
        let gap = or(&ctx, &[le(&ctx, &x, 3), ge(&ctx, &x, 5)]).unwrap();
        assert_eq!(gap, negate(&ctx, &eq(&ctx, 4, &x)));
        assert_eq!(negate(&ctx, &gap), and(&ctx, &[ge(&ctx, &x, 4), le(&ctx, &x, 4)]).unwrap());
        let wide = or(&ctx, &[le(&ctx, &x, 2), ge(&ctx, &x, 5)]).unwrap();
        assert!(matches!(wide, Expression::Or(_)));

        let d = Expression::variable(Variable::local("d", ParameterizedType::Double));
        let three = Expression::double(3.0);
        let around = or(&ctx, &[less(&ctx, &d, &three, false), greater(&ctx, &d, &three, false)]).unwrap();
        let k = ctx.primitives().int_or_double(3.0);
        assert_eq!(around, negate(&ctx, &equals(&ctx, &k, &d)));
    }

    #[test]
    fn intervals_merge() {
        let ctx = SimpleContext::new();
        let x = int_var("x");
        assert_eq!(and(&ctx, &[ge(&ctx, &x, 4), le(&ctx, &x, 3)]).unwrap(), FALSE);
        assert_eq!(and(&ctx, &[ge(&ctx, &x, 3), le(&ctx, &x, 3)]).unwrap(), eq(&ctx, 3, &x));
        assert_eq!(and(&ctx, &[ge(&ctx, &x, 3), ge(&ctx, &x, 5)]).unwrap(), ge(&ctx, &x, 5));
        assert_eq!(and(&ctx, &[le(&ctx, &x, 3), le(&ctx, &x, 5)]).unwrap(), le(&ctx, &x, 3));
        assert_eq!(or(&ctx, &[ge(&ctx, &x, 3), ge(&ctx, &x, 5)]).unwrap(), ge(&ctx, &x, 3));
        assert_eq!(or(&ctx, &[le(&ctx, &x, 3), le(&ctx, &x, 5)]).unwrap(), le(&ctx, &x, 5));
        assert_eq!(or(&ctx, &[le(&ctx, &x, 4), ge(&ctx, &x, 5)]).unwrap(), TRUE);
        let gap = or(&ctx, &[le(&ctx, &x, 2), ge(&ctx, &x, 5)]).unwrap();
        assert!(matches!(gap, Expression::Or(_)));
    }

    #[test]
    fn opposite_bounds_pin_to_zero() {
        let ctx = SimpleContext::new();
        let x = int_var("x");
        let y = int_var("y");
        // x - y >= 0 & y - x >= 0 is x == y
        let xy = greater(&ctx, &x, &y, true);
        let yx = greater(&ctx, &y, &x, true);
        assert_eq!(and(&ctx, &[xy, yx]).unwrap(), equals(&ctx, &x, &y));
    }

    #[test]
    fn equality_expansion_drops_impossible_disjuncts() {
        let ctx = SimpleContext::new();
        let x = int_var("x");
        let eq3 = eq(&ctx, 3, &x);
        let options = or(&ctx, &[eq(&ctx, 4, &x), eq(&ctx, 5, &x)]).unwrap();
        assert_eq!(and(&ctx, &[eq3.clone(), options]).unwrap(), FALSE);
        let bounds = or(&ctx, &[ge(&ctx, &x, 10), le(&ctx, &x, 5)]).unwrap();
        assert_eq!(and(&ctx, &[eq3.clone(), bounds]).unwrap(), eq3);
    }

    #[test]
    fn inline_conditional_absorption() {
        let ctx = SimpleContext::new();
        let a = boolean("a");
        let x = int_var("x");
        let cond = inline_conditional(&ctx, &a, &eq(&ctx, 1, &x), &eq(&ctx, 2, &x));
        assert!(matches!(cond, Expression::InlineConditional { .. }));
        assert_eq!(
            and(&ctx, &[a.clone(), cond.clone()]).unwrap(),
            and(&ctx, &[a.clone(), eq(&ctx, 1, &x)]).unwrap()
        );
        let not_a = negate(&ctx, &a);
        assert_eq!(
            and(&ctx, &[cond, not_a.clone()]).unwrap(),
            and(&ctx, &[not_a, eq(&ctx, 2, &x)]).unwrap()
        );
    }

    #[test]
    fn append_to_existing_clauses() {
        let ctx = SimpleContext::new();
        let (a, b) = (boolean("a"), boolean("b"));
        let ab = and(&ctx, &[a.clone(), b.clone()]).unwrap();
        let clauses = Clauses::of(Polarity::And, &ab);
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses.append(&ctx, &[negate(&ctx, &a)]).unwrap(), FALSE);
        assert_eq!(clauses.append(&ctx, &[a]).unwrap(), ab);
    }

    #[test]
    fn canonical_input_is_kept() {
        let ctx = SimpleContext::new();
        let (a, b) = (boolean("a"), boolean("b"));
        let x = int_var("x");
        let e = and(&ctx, &[a, or(&ctx, &[b, eq(&ctx, 3, &x)]).unwrap(), ge(&ctx, &x, 0)]).unwrap();
        assert_eq!(and(&ctx, &[e.clone()]).unwrap(), e);
        assert_eq!(or(&ctx, &[e.clone()]).unwrap(), e);
    }

    #[test]
    fn complexity_guard_only_sorts() {
        let ctx = SimpleContext::new().with_limits(Limits { complexity: 2 });
        let a = boolean("a");
        let b = boolean("b");
        let not_a = negate(&ctx, &a);
        let result = and(&ctx, &[b.clone(), not_a.clone(), a.clone(), b]).unwrap();
        // a and !a survive because the rules are not run
        assert!(matches!(result, Expression::And(ref cs) if cs.len() == 3));
    }
}
