//! Soundness checks: a canonical expression must agree with the raw
//! s-expression it was built from on every environment.

use float_cmp::approx_eq;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rayon::prelude::*;

use crate::context::EvaluationContext;
use crate::error::{Error, Result};
use crate::expression::{Expression, ParameterizedType, Variable};
use crate::sexp::{read_atom, to_expression, Declarations, Sexp};
use crate::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid,
    Unknown,
}

/// A concrete value. Numbers are kept as `f64`; samples are small enough
/// for integers to stay exact.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Char(char),
    Str(String),
    Object(u32),
    Null,
}

impl Value {
    fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Equality between evaluation results, tolerating rounding.
    pub fn agrees_with(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => approx_eq!(f64, *a, *b, ulps = 4),
            _ => self == other,
        }
    }
}

pub type Environment = HashMap<Variable, Value>;

fn constant(e: &Expression) -> Option<Value> {
    match e {
        Expression::Boolean(b) => Some(Value::Bool(*b)),
        Expression::Int(_) | Expression::Double(_) => e.double_value().map(Value::Number),
        Expression::Char(c) => Some(Value::Char(*c)),
        Expression::Str(s) => Some(Value::Str(s.to_string())),
        Expression::Null => Some(Value::Null),
        _ => None,
    }
}

/// Evaluates a canonical expression. `None` for Unknown, Empty, or a
/// variable missing from `env`.
pub fn eval(e: &Expression, env: &Environment) -> Option<Value> {
    let num = |x: &Expression| eval(x, env).and_then(|v| v.as_number());
    let truth = |x: &Expression| eval(x, env).and_then(|v| v.as_bool());
    match e {
        Expression::Variable(v) => env.get(v).cloned(),
        Expression::Sum(l, r) => Some(Value::Number(num(l)? + num(r)?)),
        Expression::Product(l, r) => Some(Value::Number(num(l)? * num(r)?)),
        Expression::Equals(l, r) => Some(Value::Bool(eval(l, env)? == eval(r, env)?)),
        Expression::GreaterThanZero {
            expression,
            allow_equals,
        } => {
            let n = num(expression)?;
            Some(Value::Bool(if *allow_equals { n >= 0.0 } else { n > 0.0 }))
        }
        Expression::Negation(inner) => match eval(inner, env)? {
            Value::Bool(b) => Some(Value::Bool(!b)),
            Value::Number(n) => Some(Value::Number(-n)),
            _ => None,
        },
        Expression::And(clauses) => {
            let mut result = true;
            for c in clauses.iter() {
                result &= truth(c)?;
            }
            Some(Value::Bool(result))
        }
        Expression::Or(clauses) => {
            let mut result = false;
            for c in clauses.iter() {
                result |= truth(c)?;
            }
            Some(Value::Bool(result))
        }
        Expression::InlineConditional {
            condition,
            if_true,
            if_false,
        } => {
            if truth(condition)? {
                eval(if_true, env)
            } else {
                eval(if_false, env)
            }
        }
        Expression::Unknown(_) | Expression::Empty => None,
        _ => constant(e),
    }
}

fn type_error(sexp: &Sexp) -> Error {
    Error::parse(sexp, "ill-typed operands")
}

/// Evaluates an s-expression directly, with no simplification at all.
pub fn eval_sexp(sexp: &Sexp, declarations: &Declarations, env: &Environment) -> Result<Option<Value>> {
    let (op, args) = match sexp {
        Sexp::Atom(a) => {
            let e = read_atom(declarations, a)?;
            return Ok(eval(&e, env));
        }
        Sexp::List(items) => match items.split_first() {
            Some((Sexp::Atom(op), args)) => (op.as_str(), args),
            _ => return Err(Error::parse(sexp, "expected an operator")),
        },
    };
    match op {
        "str" | "char" => {
            let e = to_expression(&crate::context::SimpleContext::new(), declarations, sexp)?;
            return Ok(constant(&e));
        }
        "unknown" => return Ok(None),
        _ => {}
    }
    let mut values = vec![];
    for a in args {
        match eval_sexp(a, declarations, env)? {
            Some(v) => values.push(v),
            None => return Ok(None),
        }
    }
    let numbers = || -> Result<Vec<f64>> {
        values
            .iter()
            .map(|v| v.as_number().ok_or_else(|| type_error(sexp)))
            .collect()
    };
    let bools = || -> Result<Vec<bool>> {
        values
            .iter()
            .map(|v| v.as_bool().ok_or_else(|| type_error(sexp)))
            .collect()
    };
    let value = match (op, values.len()) {
        ("+", _) => Value::Number(numbers()?.iter().sum()),
        ("*", _) => Value::Number(numbers()?.iter().product()),
        ("-", 1) => Value::Number(-numbers()?[0]),
        ("-", 2) => {
            let n = numbers()?;
            Value::Number(n[0] - n[1])
        }
        ("!", 1) => match &values[0] {
            Value::Bool(b) => Value::Bool(!b),
            Value::Number(n) => Value::Number(-n),
            _ => return Err(type_error(sexp)),
        },
        ("==", 2) => Value::Bool(values[0] == values[1]),
        ("!=", 2) => Value::Bool(values[0] != values[1]),
        (">", 2) | (">=", 2) | ("<", 2) | ("<=", 2) => {
            let n = numbers()?;
            Value::Bool(match op {
                ">" => n[0] > n[1],
                ">=" => n[0] >= n[1],
                "<" => n[0] < n[1],
                _ => n[0] <= n[1],
            })
        }
        ("&&", _) => Value::Bool(bools()?.iter().all(|b| *b)),
        ("||", _) => Value::Bool(bools()?.iter().any(|b| *b)),
        ("ite", 3) | ("?", 3) => {
            let c = values[0].as_bool().ok_or_else(|| type_error(sexp))?;
            if c {
                values[1].clone()
            } else {
                values[2].clone()
            }
        }
        _ => return Err(Error::parse(sexp, "unknown operator or wrong arity")),
    };
    Ok(Some(value))
}

fn sample_value(ty: &ParameterizedType, rng: &mut Pcg64) -> Value {
    match ty {
        ParameterizedType::Boolean => Value::Bool(rng.gen()),
        ParameterizedType::Int => Value::Number(rng.gen_range(-6i64, 7) as f64),
        ParameterizedType::Double => Value::Number(rng.gen_range(-12i64, 13) as f64 / 2.0),
        ParameterizedType::Char => Value::Char(if rng.gen() { 'a' } else { 'b' }),
        ParameterizedType::String => Value::Str(if rng.gen() { "a" } else { "b" }.to_string()),
        ParameterizedType::Object(_) | ParameterizedType::TypeParameter(_) => {
            match rng.gen_range(0u32, 3) {
                0 => Value::Null,
                n => Value::Object(n),
            }
        }
    }
}

/// A reproducible random environment for `declarations`.
pub fn sample_environment(declarations: &Declarations, seed: u64) -> Environment {
    let mut rng = Pcg64::seed_from_u64(seed);
    declarations
        .variables()
        .map(|v| (v.clone(), sample_value(&v.ty, &mut rng)))
        .collect()
}

/// Compares `sexp` with its canonical form on `samples` random environments.
///
/// Environments where the raw expression cannot be evaluated are ignored;
/// the result is `Unknown` when the canonical form could not be evaluated
/// on any of them.
pub fn check(
    context: &dyn EvaluationContext,
    declarations: &Declarations,
    sexp: &Sexp,
    samples: usize,
    seed: u64,
) -> Result<ValidationResult> {
    let canonical = to_expression(context, declarations, sexp)?;
    let outcomes = (0..samples as u64)
        .into_par_iter()
        .map(|i| -> Result<Option<bool>> {
            let env = sample_environment(declarations, seed.wrapping_add(i));
            let expected = match eval_sexp(sexp, declarations, &env)? {
                Some(v) => v,
                None => return Ok(None),
            };
            Ok(eval(&canonical, &env).map(|actual| {
                let agrees = actual.agrees_with(&expected);
                if !agrees {
                    log::warn!(
                        "{} evaluates to {:?} but {} to {:?} on {:?}",
                        sexp,
                        expected,
                        canonical,
                        actual,
                        env
                    );
                }
                agrees
            }))
        })
        .collect::<Result<Vec<Option<bool>>>>()?;
    if outcomes.iter().any(|o| *o == Some(false)) {
        return Ok(ValidationResult::Invalid);
    }
    if outcomes.iter().any(|o| o.is_some()) {
        Ok(ValidationResult::Valid)
    } else {
        Ok(ValidationResult::Unknown)
    }
}

#[cfg(feature = "z3")]
pub use solver::check_with_solver;

#[cfg(feature = "z3")]
mod solver {
    use z3::ast::{Ast, Bool, Int};

    use super::ValidationResult;
    use crate::expression::{Expression, ParameterizedType};
    use crate::sexp::{Declarations, Sexp};

    enum Term<'ctx> {
        Int(Int<'ctx>),
        Bool(Bool<'ctx>),
    }

    impl<'ctx> Term<'ctx> {
        fn int(self) -> Option<Int<'ctx>> {
            match self {
                Term::Int(i) => Some(i),
                Term::Bool(_) => None,
            }
        }

        fn bool(self) -> Option<Bool<'ctx>> {
            match self {
                Term::Bool(b) => Some(b),
                Term::Int(_) => None,
            }
        }
    }

    fn variable<'ctx>(ctx: &'ctx z3::Context, name: &str, ty: &ParameterizedType) -> Option<Term<'ctx>> {
        match ty {
            ParameterizedType::Int => Some(Term::Int(Int::new_const(ctx, name))),
            ParameterizedType::Boolean => Some(Term::Bool(Bool::new_const(ctx, name))),
            _ => None,
        }
    }

    fn expression_to_z3<'ctx>(ctx: &'ctx z3::Context, e: &Expression) -> Option<Term<'ctx>> {
        let int = |x: &Expression| expression_to_z3(ctx, x).and_then(Term::int);
        let boolean = |x: &Expression| expression_to_z3(ctx, x).and_then(Term::bool);
        Some(match e {
            Expression::Boolean(b) => Term::Bool(Bool::from_bool(ctx, *b)),
            Expression::Int(i) => Term::Int(Int::from_i64(ctx, *i)),
            Expression::Variable(v) => return variable(ctx, &v.name, &v.ty),
            Expression::Sum(l, r) => Term::Int(Int::add(ctx, &[&int(l)?, &int(r)?])),
            Expression::Product(l, r) => Term::Int(Int::mul(ctx, &[&int(l)?, &int(r)?])),
            Expression::Equals(l, r) => match (expression_to_z3(ctx, l)?, expression_to_z3(ctx, r)?) {
                (Term::Int(a), Term::Int(b)) => Term::Bool(a._eq(&b)),
                (Term::Bool(a), Term::Bool(b)) => Term::Bool(a._eq(&b)),
                _ => return None,
            },
            Expression::GreaterThanZero {
                expression,
                allow_equals,
            } => {
                let x = int(expression)?;
                let zero = Int::from_i64(ctx, 0);
                Term::Bool(if *allow_equals { x.ge(&zero) } else { x.gt(&zero) })
            }
            Expression::Negation(inner) => match expression_to_z3(ctx, inner)? {
                Term::Int(i) => Term::Int(i.unary_minus()),
                Term::Bool(b) => Term::Bool(b.not()),
            },
            Expression::And(clauses) | Expression::Or(clauses) => {
                let terms = clauses.iter().map(|c| boolean(c)).collect::<Option<Vec<_>>>()?;
                let refs: Vec<&Bool> = terms.iter().collect();
                if matches!(e, Expression::And(_)) {
                    Term::Bool(Bool::and(ctx, &refs))
                } else {
                    Term::Bool(Bool::or(ctx, &refs))
                }
            }
            Expression::InlineConditional {
                condition,
                if_true,
                if_false,
            } => {
                let c = boolean(condition)?;
                match (expression_to_z3(ctx, if_true)?, expression_to_z3(ctx, if_false)?) {
                    (Term::Int(t), Term::Int(f)) => Term::Int(c.ite(&t, &f)),
                    (Term::Bool(t), Term::Bool(f)) => Term::Bool(c.ite(&t, &f)),
                    _ => return None,
                }
            }
            _ => return None,
        })
    }

    fn sexp_to_z3<'ctx>(
        ctx: &'ctx z3::Context,
        declarations: &Declarations,
        sexp: &Sexp,
    ) -> Option<Term<'ctx>> {
        let items = match sexp {
            Sexp::Atom(a) => {
                return match a.as_str() {
                    "true" => Some(Term::Bool(Bool::from_bool(ctx, true))),
                    "false" => Some(Term::Bool(Bool::from_bool(ctx, false))),
                    _ => match a.parse::<i64>() {
                        Ok(i) => Some(Term::Int(Int::from_i64(ctx, i))),
                        Err(_) => {
                            let v = declarations.get(a)?;
                            variable(ctx, &v.name, &v.ty)
                        }
                    },
                };
            }
            Sexp::List(items) => items,
        };
        let (op, args) = match items.split_first()? {
            (Sexp::Atom(op), args) => (op.as_str(), args),
            _ => return None,
        };
        let terms = args
            .iter()
            .map(|a| sexp_to_z3(ctx, declarations, a))
            .collect::<Option<Vec<_>>>()?;
        let ints = |terms: Vec<Term<'ctx>>| terms.into_iter().map(Term::int).collect::<Option<Vec<_>>>();
        let bools = |terms: Vec<Term<'ctx>>| terms.into_iter().map(Term::bool).collect::<Option<Vec<_>>>();
        Some(match (op, terms.len()) {
            ("+", _) | ("*", _) => {
                let xs = ints(terms)?;
                let refs: Vec<&Int> = xs.iter().collect();
                Term::Int(if op == "+" { Int::add(ctx, &refs) } else { Int::mul(ctx, &refs) })
            }
            ("-", 1) => Term::Int(ints(terms)?.pop()?.unary_minus()),
            ("-", 2) => {
                let xs = ints(terms)?;
                Term::Int(Int::sub(ctx, &[&xs[0], &xs[1]]))
            }
            ("!", 1) => Term::Bool(bools(terms)?.pop()?.not()),
            ("==", 2) | ("!=", 2) => {
                let mut it = terms.into_iter();
                let eq = match (it.next()?, it.next()?) {
                    (Term::Int(a), Term::Int(b)) => a._eq(&b),
                    (Term::Bool(a), Term::Bool(b)) => a._eq(&b),
                    _ => return None,
                };
                Term::Bool(if op == "==" { eq } else { eq.not() })
            }
            (">", 2) | (">=", 2) | ("<", 2) | ("<=", 2) => {
                let xs = ints(terms)?;
                Term::Bool(match op {
                    ">" => xs[0].gt(&xs[1]),
                    ">=" => xs[0].ge(&xs[1]),
                    "<" => xs[0].lt(&xs[1]),
                    _ => xs[0].le(&xs[1]),
                })
            }
            ("&&", _) | ("||", _) => {
                let xs = bools(terms)?;
                let refs: Vec<&Bool> = xs.iter().collect();
                Term::Bool(if op == "&&" { Bool::and(ctx, &refs) } else { Bool::or(ctx, &refs) })
            }
            _ => return None,
        })
    }

    /// Asks z3 whether `sexp` and `canonical` are equivalent. Only integer and
    /// boolean variables are supported; anything else is `Unknown`.
    pub fn check_with_solver(
        declarations: &Declarations,
        sexp: &Sexp,
        canonical: &Expression,
    ) -> ValidationResult {
        let mut cfg = z3::Config::new();
        cfg.set_timeout_msec(1000);
        let ctx = z3::Context::new(&cfg);
        let solver = z3::Solver::new(&ctx);
        let differ = match (sexp_to_z3(&ctx, declarations, sexp), expression_to_z3(&ctx, canonical)) {
            (Some(Term::Int(a)), Some(Term::Int(b))) => a._eq(&b).not(),
            (Some(Term::Bool(a)), Some(Term::Bool(b))) => a._eq(&b).not(),
            _ => return ValidationResult::Unknown,
        };
        solver.assert(&differ);
        match solver.check() {
            z3::SatResult::Unsat => ValidationResult::Valid,
            z3::SatResult::Unknown => ValidationResult::Unknown,
            z3::SatResult::Sat => ValidationResult::Invalid,
        }
    }
}
