//! A deterministic total order over expressions.
//!
//! The clause engine only inspects neighbours, so the order is built to put
//! related clauses next to each other: `a`, `2 * a`, `c ? x : y` (with `c`
//! ordered as `a`) and `!a` are adjacent, and all equalities and bounds on
//! the same variable form one run, equalities first.

use std::cmp::Ordering;

use crate::expression::Expression;
use crate::relational;

/// Compares two expressions. Returns `Equal` exactly when they are `==`.
pub fn compare(a: &Expression, b: &Expression) -> Ordering {
    if std::ptr::eq(a, b) {
        return Ordering::Equal;
    }
    compare_core(core(a), core(b))
        .then_with(|| wrapper_rank(a).cmp(&wrapper_rank(b)))
        .then_with(|| compare_wrapped(a, b))
}

/// The node an expression is ordered by.
fn core(e: &Expression) -> &Expression {
    match e {
        Expression::Negation(inner) => core(inner),
        Expression::InlineConditional { condition, .. } => core(condition),
        Expression::Product(k, x) if k.is_numeric() => core(x),
        _ => e,
    }
}

fn wrapper_rank(e: &Expression) -> u8 {
    match e {
        Expression::Product(k, _) if k.is_numeric() => 1,
        Expression::InlineConditional { .. } => 2,
        Expression::Negation(_) => 3,
        _ => 0,
    }
}

fn compare_wrapped(a: &Expression, b: &Expression) -> Ordering {
    match (a, b) {
        (Expression::Product(k1, x1), Expression::Product(k2, x2)) => {
            compare(x1, x2).then_with(|| compare(k1, k2))
        }
        (
            Expression::InlineConditional {
                condition: c1,
                if_true: t1,
                if_false: f1,
            },
            Expression::InlineConditional {
                condition: c2,
                if_true: t2,
                if_false: f2,
            },
        ) => compare(c1, c2)
            .then_with(|| compare(t1, t2))
            .then_with(|| compare(f1, f2)),
        (Expression::Negation(x1), Expression::Negation(x2)) => compare(x1, x2),
        // both plain: equal cores means equal nodes
        _ => Ordering::Equal,
    }
}

fn rank(e: &Expression) -> u8 {
    match e {
        Expression::Boolean(_) => 0,
        Expression::Int(_) | Expression::Double(_) => 1,
        Expression::Char(_) => 2,
        Expression::Str(_) => 3,
        Expression::Null => 4,
        Expression::Variable(_) => 5,
        Expression::Product(..) => 6,
        Expression::Sum(..) => 7,
        Expression::Equals(..) | Expression::GreaterThanZero { .. } => 8,
        Expression::Or(_) => 9,
        Expression::And(_) => 10,
        Expression::Unknown(_) => 11,
        // wrappers never reach here as cores, but keep the order total
        Expression::Negation(_) => 12,
        Expression::InlineConditional { .. } => 13,
        Expression::Empty => 14,
    }
}

/// The variable part a relational node is grouped by.
fn relational_key(e: &Expression) -> Option<Expression> {
    match e {
        Expression::Equals(_, r) => Some((**r).clone()),
        Expression::GreaterThanZero { expression, .. } => Some(relational::extract(expression).x),
        _ => None,
    }
}

fn compare_core(a: &Expression, b: &Expression) -> Ordering {
    let by_rank = rank(a).cmp(&rank(b));
    if by_rank != Ordering::Equal {
        return by_rank;
    }
    match (a, b) {
        (Expression::Boolean(x), Expression::Boolean(y)) => x.cmp(y),
        (Expression::Int(x), Expression::Int(y)) => x.cmp(y),
        (Expression::Double(x), Expression::Double(y)) => x.cmp(y),
        (Expression::Int(_), Expression::Double(_)) | (Expression::Double(_), Expression::Int(_)) => {
            let (x, y) = (a.double_value(), b.double_value());
            x.partial_cmp(&y)
                .unwrap_or(Ordering::Equal)
                .then_with(|| matches!(a, Expression::Double(_)).cmp(&matches!(b, Expression::Double(_))))
        }
        (Expression::Char(x), Expression::Char(y)) => x.cmp(y),
        (Expression::Str(x), Expression::Str(y)) => x.cmp(y),
        (Expression::Variable(x), Expression::Variable(y)) => x.cmp(y),
        (Expression::Product(l1, r1), Expression::Product(l2, r2))
        | (Expression::Sum(l1, r1), Expression::Sum(l2, r2)) => {
            compare(r1, r2).then_with(|| compare(l1, l2))
        }
        (Expression::Equals(..), _) | (Expression::GreaterThanZero { .. }, _) => {
            compare_relational(a, b)
        }
        (Expression::And(x), Expression::And(y)) | (Expression::Or(x), Expression::Or(y)) => {
            compare_lists(x, y)
        }
        (Expression::Unknown(x), Expression::Unknown(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn compare_relational(a: &Expression, b: &Expression) -> Ordering {
    let key = match (relational_key(a), relational_key(b)) {
        (Some(ka), Some(kb)) => compare(&ka, &kb),
        _ => Ordering::Equal,
    };
    key.then_with(|| match (a, b) {
        (Expression::Equals(l1, r1), Expression::Equals(l2, r2)) => {
            compare(r1, r2).then_with(|| compare(l1, l2))
        }
        (Expression::Equals(..), _) => Ordering::Less,
        (_, Expression::Equals(..)) => Ordering::Greater,
        (
            Expression::GreaterThanZero {
                expression: e1,
                allow_equals: a1,
            },
            Expression::GreaterThanZero {
                expression: e2,
                allow_equals: a2,
            },
        ) => compare(e1, e2).then_with(|| a1.cmp(a2)),
        _ => Ordering::Equal,
    })
}

fn compare_lists(x: &[Expression], y: &[Expression]) -> Ordering {
    for (a, b) in x.iter().zip(y.iter()) {
        let c = compare(a, b);
        if c != Ordering::Equal {
            return c;
        }
    }
    x.len().cmp(&y.len())
}
