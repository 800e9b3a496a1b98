//! Equality and `>= 0` comparisons.

use std::cmp::Ordering;

use crate::arithmetic::{self, expand_terms, negate_numeric, sum_of};
use crate::context::EvaluationContext;
use crate::expression::{Expression, FALSE, TRUE};
use crate::inline;
use crate::order;

/// A bound read off a `GreaterThanZero`: `x >= b` (or `x <= b` when
/// `less_than` is set). Strictness stays on the node.
#[derive(Clone, Debug, PartialEq)]
pub struct XB {
    pub x: Expression,
    pub b: f64,
    pub less_than: bool,
}

impl XB {
    /// Whether the value `y` lies inside the bound.
    pub fn accepts(&self, y: f64, allow_equals: bool) -> bool {
        match (self.less_than, allow_equals) {
            (true, true) => y <= self.b,
            (true, false) => y < self.b,
            (false, true) => y >= self.b,
            (false, false) => y > self.b,
        }
    }
}

/// Reads the bound expressed by `expression >= 0`.
pub fn extract(expression: &Expression) -> XB {
    if let Some(d) = numeric_part_of_lhs(expression) {
        let v = non_numeric_part_of_lhs(expression);
        return match v {
            Expression::Negation(x) => XB {
                x: (*x).clone(),
                b: d,
                less_than: true,
            },
            _ => XB {
                x: v,
                b: -d,
                less_than: false,
            },
        };
    }
    match expression {
        Expression::Negation(x) => XB {
            x: (**x).clone(),
            b: 0.0,
            less_than: true,
        },
        _ => XB {
            x: expression.clone(),
            b: 0.0,
            less_than: false,
        },
    }
}

/// The leftmost constant of a canonical sum.
pub fn numeric_part_of_lhs(e: &Expression) -> Option<f64> {
    match e {
        Expression::Sum(l, _) if l.is_numeric() => l.double_value(),
        Expression::Sum(l, _) => numeric_part_of_lhs(l),
        _ => None,
    }
}

/// A canonical sum without its leftmost constant.
pub fn non_numeric_part_of_lhs(e: &Expression) -> Expression {
    match e {
        Expression::Sum(l, r) if l.is_numeric() => (**r).clone(),
        Expression::Sum(l, r) if numeric_part_of_lhs(l).is_some() => {
            Expression::sum_node(non_numeric_part_of_lhs(l), (**r).clone())
        }
        _ => e.clone(),
    }
}

/// `l == r` in canonical form.
pub fn equals(context: &dyn EvaluationContext, l: &Expression, r: &Expression) -> Expression {
    if l == r {
        return TRUE;
    }
    if l.is_unknown() || r.is_unknown() {
        return Expression::Unknown(context.primitives().boolean_type().clone());
    }
    match (l, r) {
        (Expression::Null, other) | (other, Expression::Null) => {
            if other.is_constant() || context.is_not_null(other) {
                return FALSE;
            }
        }
        _ => {}
    }
    if l.is_constant() && r.is_constant() {
        return Expression::Boolean(constants_equal(l, r));
    }
    if let Some(rewritten) = try_inline(context, l, r).or_else(|| try_inline(context, r, l)) {
        return rewritten;
    }
    if l.is_numeric_type() && r.is_numeric_type() {
        return numeric_equals(context, l, r);
    }
    if order::compare(l, r) == Ordering::Greater {
        Expression::equals_node(r.clone(), l.clone())
    } else {
        Expression::equals_node(l.clone(), r.clone())
    }
}

fn constants_equal(l: &Expression, r: &Expression) -> bool {
    match (l.double_value(), r.double_value()) {
        (Some(a), Some(b)) => a == b,
        _ => l == r,
    }
}

fn try_inline(context: &dyn EvaluationContext, c: &Expression, e: &Expression) -> Option<Expression> {
    match e {
        Expression::InlineConditional { .. }
            if c.is_constant() || matches!(c, Expression::InlineConditional { .. }) =>
        {
            inline::equals_inline(context, c, e)
        }
        _ => None,
    }
}

fn numeric_equals(context: &dyn EvaluationContext, l: &Expression, r: &Expression) -> Expression {
    let left = expand_terms(l);
    let mut right = expand_terms(r);
    let mut left_only = vec![];
    let mut common = 0;
    for term in left {
        match right.iter().position(|t| *t == term) {
            Some(pos) => {
                right.remove(pos);
                common += 1;
            }
            None => left_only.push(term),
        }
    }
    if common > 0 {
        return match (left_only.is_empty(), right.is_empty()) {
            (true, true) => TRUE,
            (false, true) => equals_zero(arithmetic::wrap_in_sum(left_only)),
            (true, false) => equals_zero(arithmetic::wrap_in_sum(right)),
            (false, false) => equals(
                context,
                &arithmetic::wrap_in_sum(left_only),
                &arithmetic::wrap_in_sum(right),
            ),
        };
    }

    let mut terms = left_only;
    terms.extend(right.iter().map(negate_numeric));
    equals_zero(arithmetic::wrap_in_sum(arithmetic::collect_terms(terms)))
}

/// `term == 0`, with the constant (if any) moved to the left.
fn equals_zero(term: Expression) -> Expression {
    match term {
        c if c.is_numeric() => Expression::Boolean(c.is_zero()),
        Expression::Negation(x) => Expression::equals_node(Expression::int(0), (*x).clone()),
        Expression::Product(k, x) if k.is_numeric() => {
            Expression::equals_node(Expression::int(0), (*x).clone())
        }
        Expression::Sum(..) => {
            let collected = arithmetic::collect_terms(expand_terms(&term));
            if collected.len() < 2 {
                return equals_zero(arithmetic::wrap_in_sum(collected));
            }
            let first = collected[0].clone();
            let rest = arithmetic::wrap_in_sum(collected[1..].to_vec());
            // k + rest == 0 with rest leading on a negation reads better as k == -rest
            if first.is_numeric() {
                if matches!(collected[1], Expression::Negation(_)) {
                    Expression::equals_node(first, negate_numeric(&rest))
                } else {
                    Expression::equals_node(arithmetic::negate_constant(&first), rest)
                }
            } else if let Expression::Negation(y) = &first {
                Expression::equals_node((**y).clone(), rest)
            } else {
                Expression::equals_node(first, negate_numeric(&rest))
            }
        }
        t => Expression::equals_node(Expression::int(0), t),
    }
}

/// `l > r`, or `l >= r` when `allow_equals` is set.
pub fn greater(
    _context: &dyn EvaluationContext,
    l: &Expression,
    r: &Expression,
    allow_equals: bool,
) -> Expression {
    greater_of(l, r, allow_equals)
}

/// `l < r`, or `l <= r` when `allow_equals` is set.
pub fn less(
    _context: &dyn EvaluationContext,
    l: &Expression,
    r: &Expression,
    allow_equals: bool,
) -> Expression {
    greater_of(r, l, allow_equals)
}

pub(crate) fn greater_of(l: &Expression, r: &Expression, allow_equals: bool) -> Expression {
    if l == r {
        return Expression::Boolean(allow_equals);
    }
    if l.is_unknown() || r.is_unknown() {
        return Expression::Unknown(crate::expression::ParameterizedType::Boolean);
    }
    let difference = sum_of(l, &negate_numeric(r));
    greater_than_zero(difference, allow_equals)
}

fn greater_than_zero(difference: Expression, allow_equals: bool) -> Expression {
    if let Some(d) = difference.double_value() {
        return Expression::Boolean(if allow_equals { d >= 0.0 } else { d > 0.0 });
    }
    if difference.is_unknown() {
        return Expression::Unknown(crate::expression::ParameterizedType::Boolean);
    }
    if !allow_equals && difference.is_discrete() {
        // integers: e > 0 is e - 1 >= 0
        let tightened = sum_of(&difference, &Expression::int(-1));
        return Expression::greater_than_zero_node(tightened, true);
    }
    Expression::greater_than_zero_node(difference, allow_equals)
}

/// `!(expression >= 0)` is `-expression > 0`; strictness flips.
pub fn negate_greater_than_zero(expression: &Expression, allow_equals: bool) -> Expression {
    greater_than_zero(negate_numeric(expression), !allow_equals)
}

/// `a + -b` becomes `a == b`; anything else is compared with zero.
pub fn is_zero(context: &dyn EvaluationContext, expression: &Expression) -> Expression {
    equals(context, expression, &Expression::int(0))
}
