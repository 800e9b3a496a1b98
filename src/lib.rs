//! Canonical forms for boolean and arithmetic conditions.
//!
//! Every constructor in this crate returns an already simplified
//! [`Expression`]: constants are folded, sums and products are collected and
//! ordered, comparisons are reduced to `expression >= 0` / `expression > 0`,
//! and conjunctions/disjunctions are kept in a near-CNF form by the clause
//! engine in [`clauses`]. Two conditions that mean the same thing usually end
//! up structurally equal.

use std::hash::BuildHasherDefault;

use rustc_hash::FxHasher;

pub mod arithmetic;
pub mod clauses;
pub mod context;
pub mod error;
pub mod expression;
pub mod filter;
pub mod inline;
pub mod negation;
pub mod order;
pub mod relational;
pub mod sexp;
pub mod validate;

pub use arithmetic::{product, sum};
pub use clauses::{and, or, Clauses, Polarity};
pub use context::{EvaluationContext, Limits, SimpleContext};
pub use error::{Error, Result};
pub use expression::{
    Expression, ParameterizedType, Primitives, Variable, VariableKind, FALSE, TRUE,
};
pub use filter::{Filter, FilterMethod, FilterMode, FilterResult};
pub use inline::inline_conditional;
pub use negation::negate;
pub use relational::{equals, greater, less};
pub use validate::ValidationResult;

pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type HashSet<K> = rustc_hash::FxHashSet<K>;
pub type IndexMap<K, V> = indexmap::IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Times an expression and logs the duration at info level.
#[macro_export]
macro_rules! time_fn_call {
    ($label:expr, $fn_call:expr) => {{
        use std::time::Instant;
        let start = Instant::now();
        let result = $fn_call;
        let duration = start.elapsed();
        log::info!("finished {} in {} ms", $label, duration.as_millis());
        result
    }};
}
