//! Reading conditions written as s-expressions, e.g.
//! `(&& (>= x 3) (!= x 3) (|| b (== null o)))`.

use std::fmt;
use std::str::FromStr;

use crate::arithmetic::{product, sum};
use crate::clauses;
use crate::context::EvaluationContext;
use crate::error::{Error, Result};
use crate::expression::{Expression, ParameterizedType, Variable, VariableKind};
use crate::inline::inline_conditional;
use crate::negation::negate;
use crate::relational::{equals, greater, less};
use crate::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sexp {
    Atom(String),
    List(Vec<Self>),
}

impl FromStr for Sexp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        use symbolic_expressions::parser::parse_str;
        let sexp = parse_str(s).map_err(|e| Error::parse(s, format!("{:?}", e)))?;
        Ok(Self::from_symbolic_expr(sexp))
    }
}

impl Sexp {
    fn from_symbolic_expr(sexp: symbolic_expressions::Sexp) -> Self {
        match sexp {
            symbolic_expressions::Sexp::String(s) => Self::Atom(s),
            symbolic_expressions::Sexp::List(ss) => {
                Self::List(ss.into_iter().map(Sexp::from_symbolic_expr).collect())
            }
            symbolic_expressions::Sexp::Empty => Self::List(vec![]),
        }
    }

    fn operator(&self) -> Option<(&str, &[Sexp])> {
        match self {
            Sexp::List(items) => match items.split_first() {
                Some((Sexp::Atom(op), args)) => Some((op.as_str(), args)),
                _ => None,
            },
            Sexp::Atom(_) => None,
        }
    }
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexp::Atom(x) => write!(f, "{}", x),
            Sexp::List(l) => {
                write!(f, "(")?;
                for (i, x) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", x)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// The variables an s-expression may mention, by name.
#[derive(Clone, Debug, Default)]
pub struct Declarations {
    variables: IndexMap<String, Variable>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, variable: Variable) {
        self.variables.insert(variable.name.to_string(), variable);
    }

    pub fn with(mut self, variable: Variable) -> Self {
        self.declare(variable);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    /// Reads `name:type` or `name:type:kind`, e.g. `x:int`, `o:Object:field`.
    pub fn parse_declaration(s: &str) -> Result<Variable> {
        let parts: Vec<&str> = s.split(':').collect();
        let (name, ty, kind) = match parts.as_slice() {
            [name, ty] => (*name, *ty, "local"),
            [name, ty, kind] => (*name, *ty, *kind),
            _ => return Err(Error::parse(s, "expected name:type[:kind]")),
        };
        if name.is_empty() {
            return Err(Error::parse(s, "empty variable name"));
        }
        let ty = parse_type(ty);
        let kind = match kind {
            "local" => VariableKind::Local,
            "param" | "parameter" => VariableKind::Parameter,
            "field" => VariableKind::Field { this_scope: true },
            "other-field" => VariableKind::Field { this_scope: false },
            "element" => VariableKind::ArrayElement,
            other => return Err(Error::parse(s, format!("unknown variable kind {}", other))),
        };
        Ok(Variable::new(name, kind, ty))
    }
}

fn parse_type(s: &str) -> ParameterizedType {
    match s {
        "bool" | "boolean" => ParameterizedType::Boolean,
        "int" => ParameterizedType::Int,
        "double" => ParameterizedType::Double,
        "char" => ParameterizedType::Char,
        "string" | "String" => ParameterizedType::String,
        other => ParameterizedType::Object(other.into()),
    }
}

/// A literal or declared variable.
pub(crate) fn read_atom(declarations: &Declarations, atom: &str) -> Result<Expression> {
    match atom {
        "true" => return Ok(Expression::boolean(true)),
        "false" => return Ok(Expression::boolean(false)),
        "null" => return Ok(Expression::Null),
        _ => {}
    }
    if let Ok(i) = atom.parse::<i64>() {
        return Ok(Expression::int(i));
    }
    if atom.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.') {
        if let Ok(d) = atom.parse::<f64>() {
            return Ok(Expression::double(d));
        }
    }
    declarations
        .get(atom)
        .map(|v| Expression::variable(v.clone()))
        .ok_or_else(|| Error::UnknownVariable(atom.to_string()))
}

/// The single atom argument of `(str ...)`, `(char ...)`, `(unknown ...)`.
fn atom_argument<'a>(sexp: &Sexp, args: &'a [Sexp]) -> Result<&'a str> {
    match args {
        [Sexp::Atom(a)] => Ok(a),
        _ => Err(Error::parse(sexp, "expected a single atom")),
    }
}

fn arity(sexp: &Sexp, args: &[Expression], expected: usize) -> Result<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(Error::parse(
            sexp,
            format!("expected {} arguments, got {}", expected, args.len()),
        ))
    }
}

/// Builds the canonical expression for `sexp`.
pub fn to_expression(
    context: &dyn EvaluationContext,
    declarations: &Declarations,
    sexp: &Sexp,
) -> Result<Expression> {
    let (op, args) = match sexp {
        Sexp::Atom(a) => return read_atom(declarations, a),
        _ => sexp
            .operator()
            .ok_or_else(|| Error::parse(sexp, "expected an operator"))?,
    };
    match op {
        "str" => return Ok(Expression::string(atom_argument(sexp, args)?)),
        "char" => {
            let a = atom_argument(sexp, args)?;
            let c = a
                .chars()
                .next()
                .ok_or_else(|| Error::parse(sexp, "empty character"))?;
            return Ok(Expression::Char(c));
        }
        "unknown" => return Ok(Expression::Unknown(parse_type(atom_argument(sexp, args)?))),
        _ => {}
    }
    let args = args
        .iter()
        .map(|a| to_expression(context, declarations, a))
        .collect::<Result<Vec<_>>>()?;
    let expression = match op {
        "+" => args
            .iter()
            .skip(1)
            .fold(first(sexp, &args)?, |acc, a| sum(context, &acc, a)),
        "*" => args
            .iter()
            .skip(1)
            .fold(first(sexp, &args)?, |acc, a| product(context, &acc, a)),
        "-" if args.len() == 1 => negate(context, &args[0]),
        "-" => {
            arity(sexp, &args, 2)?;
            sum(context, &args[0], &negate(context, &args[1]))
        }
        "!" => {
            arity(sexp, &args, 1)?;
            negate(context, &args[0])
        }
        "==" => {
            arity(sexp, &args, 2)?;
            equals(context, &args[0], &args[1])
        }
        "!=" => {
            arity(sexp, &args, 2)?;
            negate(context, &equals(context, &args[0], &args[1]))
        }
        ">" | ">=" | "<" | "<=" => {
            arity(sexp, &args, 2)?;
            let allow_equals = op.ends_with('=');
            if op.starts_with('>') {
                greater(context, &args[0], &args[1], allow_equals)
            } else {
                less(context, &args[0], &args[1], allow_equals)
            }
        }
        "&&" => clauses::and(context, &args)?,
        "||" => clauses::or(context, &args)?,
        "ite" | "?" => {
            arity(sexp, &args, 3)?;
            inline_conditional(context, &args[0], &args[1], &args[2])
        }
        other => return Err(Error::parse(sexp, format!("unknown operator {}", other))),
    };
    Ok(expression)
}

fn first(sexp: &Sexp, args: &[Expression]) -> Result<Expression> {
    args.first()
        .cloned()
        .ok_or_else(|| Error::parse(sexp, "expected at least one argument"))
}

/// Parses `input` and builds its canonical expression.
pub fn parse(
    context: &dyn EvaluationContext,
    declarations: &Declarations,
    input: &str,
) -> Result<Expression> {
    let sexp: Sexp = input.parse()?;
    to_expression(context, declarations, &sexp)
}
