//! Canonical sums and products.
//!
//! A canonical sum is a left-leaning chain of terms sorted by
//! [`order::compare`], so a numeric constant (if any) is the leftmost term.
//! Each term is a plain expression, `-x`, or `k * x` with `k` numeric and
//! `x` different from every other term's `x`.

use std::sync::Arc;

use crate::context::EvaluationContext;
use crate::expression::Expression;
use crate::order;
use crate::IndexMap;

/// `l + r` in canonical form.
pub fn sum(_context: &dyn EvaluationContext, l: &Expression, r: &Expression) -> Expression {
    sum_of(l, r)
}

/// `l * r` in canonical form.
pub fn product(_context: &dyn EvaluationContext, l: &Expression, r: &Expression) -> Expression {
    product_of(l, r)
}

pub(crate) fn sum_of(l: &Expression, r: &Expression) -> Expression {
    if l.is_unknown() || r.is_unknown() {
        return Expression::Unknown(l.return_type().widen(&r.return_type()));
    }
    if l == r {
        return product_of(&Expression::int(2), l);
    }
    if is_neutral_zero(l, r) {
        return r.clone();
    }
    if is_neutral_zero(r, l) {
        return l.clone();
    }
    if l.is_numeric() && r.is_numeric() {
        return add_constants(l, r);
    }
    if is_negation_of(l, r) || is_negation_of(r, l) {
        return Expression::int(0);
    }
    let mut terms = expand_terms(l);
    terms.extend(expand_terms(r));
    wrap_in_sum(collect_terms(terms))
}

/// An `Int` zero is neutral for anything; a `Double` zero only for doubles,
/// so the result type does not change.
fn is_neutral_zero(zero: &Expression, other: &Expression) -> bool {
    match zero {
        Expression::Int(0) => true,
        Expression::Double(d) if d.into_inner() == 0.0 => !other.is_discrete(),
        _ => false,
    }
}

fn is_negation_of(l: &Expression, r: &Expression) -> bool {
    matches!(l, Expression::Negation(inner) if **inner == *r)
}

/// The additive terms of an expression.
pub fn expand_terms(e: &Expression) -> Vec<Expression> {
    match e {
        Expression::Sum(l, r) => {
            let mut terms = expand_terms(l);
            terms.extend(expand_terms(r));
            terms
        }
        _ => vec![e.clone()],
    }
}

/// Folds the constants and collects like terms, then sorts.
pub(crate) fn collect_terms(terms: Vec<Expression>) -> Vec<Expression> {
    let mut constant: Option<Expression> = None;
    let mut factors: IndexMap<Expression, Expression> = IndexMap::default();
    for term in terms {
        if term.is_numeric() {
            constant = Some(match constant {
                Some(c) => add_constants(&c, &term),
                None => term,
            });
            continue;
        }
        let (factor, base) = factor_of(&term);
        let entry = factors.entry(base).or_insert(Expression::int(0));
        *entry = add_constants(entry, &factor);
    }

    let mut collected = vec![];
    if let Some(c) = constant {
        if !c.is_zero() {
            collected.push(c);
        }
    }
    for (base, factor) in factors {
        if factor.is_zero() {
            continue;
        }
        collected.push(scale(&factor, base));
    }
    collected.sort_by(order::compare);
    collected
}

/// Splits a term into its numeric factor and the rest.
fn factor_of(term: &Expression) -> (Expression, Expression) {
    match term {
        Expression::Negation(inner) => {
            let (factor, base) = factor_of(inner);
            (negate_constant(&factor), base)
        }
        Expression::Product(k, x) if k.is_numeric() => ((**k).clone(), (**x).clone()),
        _ => (Expression::int(1), term.clone()),
    }
}

fn scale(factor: &Expression, base: Expression) -> Expression {
    if factor.is_one() {
        base
    } else if factor.is_minus_one() {
        negate_numeric(&base)
    } else {
        Expression::product_node(factor.clone(), base)
    }
}

/// Rebuilds a left-leaning sum from sorted terms.
pub(crate) fn wrap_in_sum(terms: Vec<Expression>) -> Expression {
    let mut iter = terms.into_iter();
    match iter.next() {
        None => Expression::int(0),
        Some(first) => iter.fold(first, Expression::sum_node),
    }
}

pub(crate) fn add_constants(l: &Expression, r: &Expression) -> Expression {
    match (l, r) {
        (Expression::Int(a), Expression::Int(b)) => match a.checked_add(*b) {
            Some(s) => Expression::int(s),
            None => Expression::double(*a as f64 + *b as f64),
        },
        _ => {
            let a = l.double_value().unwrap_or(0.0);
            let b = r.double_value().unwrap_or(0.0);
            Expression::double(a + b)
        }
    }
}

pub(crate) fn multiply_constants(l: &Expression, r: &Expression) -> Expression {
    match (l, r) {
        (Expression::Int(a), Expression::Int(b)) => match a.checked_mul(*b) {
            Some(p) => Expression::int(p),
            None => Expression::double(*a as f64 * *b as f64),
        },
        _ => {
            let a = l.double_value().unwrap_or(0.0);
            let b = r.double_value().unwrap_or(0.0);
            Expression::double(a * b)
        }
    }
}

pub(crate) fn negate_constant(c: &Expression) -> Expression {
    match c {
        Expression::Int(i) => match i.checked_neg() {
            Some(n) => Expression::int(n),
            None => Expression::double(-(*i as f64)),
        },
        Expression::Double(d) => Expression::double(-d.into_inner()),
        _ => Expression::negation_node(c.clone()),
    }
}

/// `-e` for a numeric expression.
pub(crate) fn negate_numeric(e: &Expression) -> Expression {
    match e {
        Expression::Int(_) | Expression::Double(_) => negate_constant(e),
        Expression::Negation(inner) => (**inner).clone(),
        Expression::Sum(l, r) => sum_of(&negate_numeric(l), &negate_numeric(r)),
        Expression::Product(k, x) if k.is_numeric() => scale(&negate_constant(k), (**x).clone()),
        Expression::InlineConditional {
            condition,
            if_true,
            if_false,
        } => Expression::InlineConditional {
            condition: condition.clone(),
            if_true: Arc::new(negate_numeric(if_true)),
            if_false: Arc::new(negate_numeric(if_false)),
        },
        Expression::Unknown(_) | Expression::Empty => e.clone(),
        _ => Expression::negation_node(e.clone()),
    }
}

pub(crate) fn product_of(l: &Expression, r: &Expression) -> Expression {
    if l.is_unknown() || r.is_unknown() {
        return Expression::Unknown(l.return_type().widen(&r.return_type()));
    }
    if l.is_numeric() && r.is_numeric() {
        return multiply_constants(l, r);
    }
    if l.is_zero() {
        return l.clone();
    }
    if r.is_zero() {
        return r.clone();
    }
    if l.is_one() && (l.is_discrete() || !r.is_discrete()) {
        return r.clone();
    }
    if r.is_one() && (r.is_discrete() || !l.is_discrete()) {
        return l.clone();
    }
    if r.is_numeric() {
        return product_of(r, l);
    }
    if l.is_numeric() {
        return scale_expression(l, r);
    }
    match (l, r) {
        (Expression::Sum(a, b), _) => sum_of(&product_of(a, r), &product_of(b, r)),
        (_, Expression::Sum(a, b)) => sum_of(&product_of(l, a), &product_of(l, b)),
        (Expression::Product(k, x), _) if k.is_numeric() => product_of(k, &product_of(x, r)),
        (_, Expression::Product(k, x)) if k.is_numeric() => product_of(k, &product_of(l, x)),
        (Expression::Negation(x), _) => negate_numeric(&product_of(x, r)),
        (_, Expression::Negation(x)) => negate_numeric(&product_of(l, x)),
        _ => {
            if order::compare(l, r) == std::cmp::Ordering::Greater {
                Expression::product_node(r.clone(), l.clone())
            } else {
                Expression::product_node(l.clone(), r.clone())
            }
        }
    }
}

/// `k * e` with `k` a numeric constant and `e` not.
fn scale_expression(k: &Expression, e: &Expression) -> Expression {
    match e {
        Expression::Sum(a, b) => sum_of(&product_of(k, a), &product_of(k, b)),
        Expression::Product(m, x) if m.is_numeric() => product_of(&multiply_constants(k, m), x),
        Expression::Negation(x) => product_of(&negate_constant(k), x),
        _ if k.is_minus_one() => negate_numeric(e),
        _ => Expression::product_node(k.clone(), e.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimpleContext;
    use crate::expression::{ParameterizedType, Variable};

    fn int_var(name: &str) -> Expression {
        Expression::variable(Variable::local(name, ParameterizedType::Int))
    }

    #[test]
    fn constants_fold() {
        let ctx = SimpleContext::new();
        assert_eq!(sum(&ctx, &Expression::int(3), &Expression::int(4)), Expression::int(7));
        assert_eq!(
            sum(&ctx, &Expression::int(1), &Expression::double(0.5)),
            Expression::double(1.5)
        );
        assert_eq!(product(&ctx, &Expression::int(3), &Expression::int(-2)), Expression::int(-6));
        assert_eq!(
            sum(&ctx, &Expression::int(i64::MAX), &Expression::int(1)),
            Expression::double(i64::MAX as f64 + 1.0)
        );
    }

    #[test]
    fn zero_and_one_are_neutral() {
        let ctx = SimpleContext::new();
        let x = int_var("x");
        assert_eq!(sum(&ctx, &Expression::int(0), &x), x);
        assert_eq!(sum(&ctx, &x, &Expression::int(0)), x);
        assert_eq!(product(&ctx, &Expression::int(1), &x), x);
        assert_eq!(product(&ctx, &x, &Expression::int(0)), Expression::int(0));
    }

    #[test]
    fn like_terms_are_collected() {
        let ctx = SimpleContext::new();
        let x = int_var("x");
        let y = int_var("y");
        assert_eq!(
            sum(&ctx, &x, &x),
            Expression::product_node(Expression::int(2), x.clone())
        );
        let two_x = product(&ctx, &Expression::int(2), &x);
        let three_x = product(&ctx, &Expression::int(3), &x);
        assert_eq!(sum(&ctx, &two_x, &x), three_x);
        let minus_x = negate_numeric(&x);
        assert_eq!(sum(&ctx, &x, &minus_x), Expression::int(0));
        // x + y + -x == y, regardless of where the cancelling terms sit
        let x_plus_y = sum(&ctx, &x, &y);
        assert_eq!(sum(&ctx, &x_plus_y, &minus_x), y);
    }

    #[test]
    fn sum_is_commutative_and_constant_goes_left() {
        let ctx = SimpleContext::new();
        let x = int_var("x");
        let three = Expression::int(3);
        let s = sum(&ctx, &x, &three);
        assert_eq!(s, sum(&ctx, &three, &x));
        assert_eq!(s, Expression::sum_node(three, x));
    }

    #[test]
    fn products_distribute_and_pull_constants_out() {
        let ctx = SimpleContext::new();
        let x = int_var("x");
        let y = int_var("y");
        let s = sum(&ctx, &x, &Expression::int(1));
        let expected = sum(
            &ctx,
            &Expression::int(2),
            &product(&ctx, &Expression::int(2), &x),
        );
        assert_eq!(product(&ctx, &Expression::int(2), &s), expected);

        let two_x = product(&ctx, &Expression::int(2), &x);
        assert_eq!(
            product(&ctx, &Expression::int(3), &two_x),
            product(&ctx, &Expression::int(6), &x)
        );
        assert_eq!(product(&ctx, &Expression::int(-1), &x), negate_numeric(&x));
        assert_eq!(product(&ctx, &x, &y), product(&ctx, &y, &x));
    }

    #[test]
    fn unknown_propagates() {
        let ctx = SimpleContext::new();
        let u = Expression::Unknown(ParameterizedType::Int);
        assert!(sum(&ctx, &u, &int_var("x")).is_unknown());
        assert!(product(&ctx, &Expression::int(2), &u).is_unknown());
    }

    #[test]
    fn negating_a_sum_negates_each_term() {
        let x = int_var("x");
        let s = sum_of(&Expression::int(3), &x);
        assert_eq!(
            negate_numeric(&s),
            Expression::sum_node(Expression::int(-3), Expression::negation_node(x))
        );
    }
}
