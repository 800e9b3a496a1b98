use crate::arithmetic;
use crate::clauses::{self, Polarity};
use crate::context::EvaluationContext;
use crate::expression::Expression;
use crate::inline;
use crate::relational;

/// `!value` for booleans, `-value` for numbers, in canonical form.
pub fn negate(context: &dyn EvaluationContext, value: &Expression) -> Expression {
    match value {
        Expression::Boolean(b) => Expression::Boolean(!b),
        Expression::Negation(inner) => (**inner).clone(),
        Expression::And(clauses) => clauses::combine(
            context,
            Polarity::Or,
            clauses.iter().map(|c| negate(context, c)).collect(),
        ),
        Expression::Or(clauses) => clauses::combine(
            context,
            Polarity::And,
            clauses.iter().map(|c| negate(context, c)).collect(),
        ),
        Expression::GreaterThanZero {
            expression,
            allow_equals,
        } => relational::negate_greater_than_zero(expression, *allow_equals),
        Expression::InlineConditional {
            condition,
            if_true,
            if_false,
        } => inline::inline_conditional(
            context,
            condition,
            &negate(context, if_true),
            &negate(context, if_false),
        ),
        Expression::Unknown(_) | Expression::Empty => value.clone(),
        e if e.is_numeric_type() => arithmetic::negate_numeric(e),
        _ => Expression::negation_node(value.clone()),
    }
}
