use canonic::filter::{individual_field_clause, individual_null_or_not_null_clause};
use canonic::sexp::{to_expression, Declarations, Sexp};
use canonic::validate::check;
use canonic::{
    time_fn_call, Error, Expression, Filter, FilterMethod, FilterMode, Limits, SimpleContext,
    Variable,
};

use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

// Which clauses `canonic filter` pulls out.
#[derive(Clone, Copy, Debug)]
pub enum Matcher {
    // `null == v` and `null != v`
    Null,
    // clauses about a single field of `this`
    Field,
}

impl FromStr for Matcher {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "null" => Ok(Self::Null),
            "field" => Ok(Self::Field),
            _ => Err("Invalid matcher.".to_string()),
        }
    }
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// The condition, e.g. "(&& (>= x 3) (!= x 3))".
    sexp: String,
    /// Variable declarations, `name:type` or `name:type:kind`.
    #[clap(long = "var")]
    vars: Vec<String>,
    /// Names of declared variables known to be non-null.
    #[clap(long = "not-null")]
    not_null: Vec<String>,
    #[clap(long)]
    complexity: Option<usize>,
    #[clap(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints the canonical form of a condition.
    Simplify {
        #[clap(flatten)]
        common: CommonArgs,
        /// Compare against the raw condition on this many random environments.
        #[clap(long)]
        check: Option<usize>,
        #[clap(long, default_value = "0")]
        seed: u64,
    },
    /// Splits a condition into matched clauses and the rest.
    Filter {
        #[clap(flatten)]
        common: CommonArgs,
        #[clap(long)]
        mode: FilterMode,
        #[clap(long)]
        matcher: Matcher,
    },
}

#[derive(Parser, Debug)]
#[clap(name = "canonic")]
struct CanonicArgs {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Serialize)]
struct SimplifyReport {
    input: String,
    canonical: String,
    complexity: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    check: Option<String>,
}

fn setup(common: &CommonArgs) -> Result<(SimpleContext, Declarations, Sexp), Error> {
    let mut declarations = Declarations::new();
    for v in &common.vars {
        declarations.declare(Declarations::parse_declaration(v)?);
    }
    let mut context = SimpleContext::new();
    if let Some(complexity) = common.complexity {
        context = context.with_limits(Limits { complexity });
    }
    for name in &common.not_null {
        let v = declarations
            .get(name)
            .ok_or_else(|| Error::UnknownVariable(name.clone()))?;
        context.add_not_null(Expression::variable(v.clone()));
    }
    let sexp: Sexp = common.sexp.parse()?;
    Ok((context, declarations, sexp))
}

fn simplify(common: CommonArgs, samples: Option<usize>, seed: u64) -> Result<(), Error> {
    let (context, declarations, sexp) = setup(&common)?;
    let canonical = time_fn_call!("simplify", to_expression(&context, &declarations, &sexp)?);
    let verdict = match samples {
        Some(n) => {
            let result = time_fn_call!("check", check(&context, &declarations, &sexp, n, seed)?);
            #[cfg(feature = "z3")]
            let result = match result {
                canonic::ValidationResult::Valid => {
                    canonic::validate::check_with_solver(&declarations, &sexp, &canonical)
                }
                other => other,
            };
            Some(format!("{:?}", result))
        }
        None => None,
    };
    let report = SimplifyReport {
        input: sexp.to_string(),
        canonical: canonical.to_string(),
        complexity: canonical.complexity(),
        check: verdict,
    };
    if common.json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| Error::InvalidArgument(e.to_string()))?;
        println!("{}", out);
    } else {
        println!("{}", report.canonical);
        if let Some(check) = &report.check {
            println!("check: {}", check);
        }
    }
    Ok(())
}

fn filter(common: CommonArgs, mode: FilterMode, matcher: Matcher) -> Result<(), Error> {
    let (context, declarations, sexp) = setup(&common)?;
    let value = to_expression(&context, &declarations, &sexp)?;
    let method: &dyn FilterMethod<Variable> = match matcher {
        Matcher::Null => &individual_null_or_not_null_clause,
        Matcher::Field => &individual_field_clause,
    };
    let result = Filter::new(&context, mode).filter(&value, &[method]);
    if common.json {
        let accepted: serde_json::Map<String, serde_json::Value> = result
            .accepted
            .iter()
            .map(|(k, v)| (k.name.to_string(), json!(v.to_string())))
            .collect();
        let out = json!({
            "input": value.to_string(),
            "accepted": accepted,
            "rest": result.rest.to_string(),
        });
        println!("{}", out);
    } else {
        for (k, v) in &result.accepted {
            println!("{}: {}", k.name, v);
        }
        println!("rest: {}", result.rest);
    }
    Ok(())
}

fn run(args: CanonicArgs) -> Result<(), Error> {
    match args.command {
        Command::Simplify {
            common,
            check,
            seed,
        } => simplify(common, check, seed),
        Command::Filter {
            common,
            mode,
            matcher,
        } => filter(common, mode, matcher),
    }
}

pub fn main() {
    env_logger::init();
    let args = CanonicArgs::parse();
    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
