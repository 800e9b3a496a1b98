use std::sync::Arc;

use crate::clauses::{self, Polarity};
use crate::context::EvaluationContext;
use crate::expression::Expression;
use crate::negation::negate;
use crate::relational::equals;

/// `condition ? if_true : if_false` in canonical form.
pub fn inline_conditional(
    context: &dyn EvaluationContext,
    condition: &Expression,
    if_true: &Expression,
    if_false: &Expression,
) -> Expression {
    match condition {
        Expression::Boolean(true) => return if_true.clone(),
        Expression::Boolean(false) => return if_false.clone(),
        Expression::Unknown(_) => return Expression::Unknown(if_true.return_type()),
        Expression::Negation(inner) => {
            return inline_conditional(context, inner, if_false, if_true);
        }
        _ => {}
    }
    if if_true == if_false {
        return if_true.clone();
    }
    let boolean = context.primitives().boolean_type();
    if &if_true.return_type() == boolean && &if_false.return_type() == boolean {
        if let Some(reduced) = boolean_branches(context, condition, if_true, if_false) {
            return reduced;
        }
    }
    Expression::InlineConditional {
        condition: Arc::new(condition.clone()),
        if_true: Arc::new(if_true.clone()),
        if_false: Arc::new(if_false.clone()),
    }
}

fn boolean_branches(
    context: &dyn EvaluationContext,
    c: &Expression,
    t: &Expression,
    f: &Expression,
) -> Option<Expression> {
    let or = |a: Expression, b: &Expression| clauses::combine(context, Polarity::Or, vec![a, b.clone()]);
    let and = |a: Expression, b: &Expression| clauses::combine(context, Polarity::And, vec![a, b.clone()]);
    let reduced = match (t, f) {
        (Expression::Boolean(true), _) => or(c.clone(), f),
        (Expression::Boolean(false), _) => and(negate(context, c), f),
        (_, Expression::Boolean(true)) => or(negate(context, c), t),
        (_, Expression::Boolean(false)) => and(c.clone(), t),
        _ if t == c => or(c.clone(), f),
        _ if f == c => and(c.clone(), t),
        _ => return None,
    };
    Some(reduced)
}

/// Rewrites `c == (a ? x : y)` for a constant (or conditional) `c` when one
/// branch can never equal `c`.
pub fn equals_inline(
    context: &dyn EvaluationContext,
    c: &Expression,
    conditional: &Expression,
) -> Option<Expression> {
    let Expression::InlineConditional {
        condition,
        if_true,
        if_false,
    } = conditional
    else {
        return None;
    };
    if let Expression::InlineConditional {
        condition: other_condition,
        if_true: other_true,
        if_false: other_false,
    } = c
    {
        if other_condition != condition {
            return None;
        }
        return Some(clauses::combine(
            context,
            Polarity::And,
            vec![
                equals(context, if_true, other_true),
                equals(context, if_false, other_false),
            ],
        ));
    }

    let never = |branch: &Expression| match c {
        Expression::Null => context.is_not_null(branch),
        _ => equals(context, branch, c).is_false(),
    };
    if never(if_true) {
        return Some(clauses::combine(
            context,
            Polarity::And,
            vec![negate(context, condition), equals(context, if_false, c)],
        ));
    }
    if never(if_false) {
        return Some(clauses::combine(
            context,
            Polarity::And,
            vec![(**condition).clone(), equals(context, if_true, c)],
        ));
    }
    None
}
