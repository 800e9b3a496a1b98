use canonic::sexp::{parse, Declarations, Sexp};
use canonic::validate::check;
use canonic::{
    and, equals, greater, less, negate, or, product, sum, Expression, ParameterizedType,
    SimpleContext, ValidationResult, Variable, FALSE, TRUE,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

fn int(name: &str) -> Expression {
    Expression::variable(Variable::local(name, ParameterizedType::Int))
}

fn boolean(name: &str) -> Expression {
    Expression::variable(Variable::local(name, ParameterizedType::Boolean))
}

fn k(i: i64) -> Expression {
    Expression::int(i)
}

/// A handful of canonical boolean expressions of different shapes.
fn samples(ctx: &SimpleContext) -> Vec<Expression> {
    let (a, b) = (boolean("a"), boolean("b"));
    let (n, m) = (int("n"), int("m"));
    vec![
        a.clone(),
        negate(ctx, &b),
        greater(ctx, &n, &k(0), true),
        less(ctx, &n, &m, false),
        equals(ctx, &n, &k(3)),
        negate(ctx, &equals(ctx, &n, &m)),
        and(ctx, &[a.clone(), greater(ctx, &n, &k(2), true)]).unwrap(),
        or(ctx, &[a, b, equals(ctx, &m, &k(1))]).unwrap(),
    ]
}

#[test]
fn appending_a_single_canonical_clause_is_a_no_op() {
    let ctx = SimpleContext::new();
    for e in samples(&ctx) {
        assert_eq!(and(&ctx, &[e.clone()]).unwrap(), e, "and of {}", e);
        assert_eq!(or(&ctx, &[e.clone()]).unwrap(), e, "or of {}", e);
    }
}

#[test]
fn construction_is_commutative() {
    let ctx = SimpleContext::new();
    let (n, m) = (int("n"), int("m"));
    assert_eq!(sum(&ctx, &n, &m), sum(&ctx, &m, &n));
    assert_eq!(sum(&ctx, &n, &k(4)), sum(&ctx, &k(4), &n));
    assert_eq!(product(&ctx, &n, &m), product(&ctx, &m, &n));
    let samples = samples(&ctx);
    for x in &samples {
        for y in &samples {
            assert_eq!(
                and(&ctx, &[x.clone(), y.clone()]).unwrap(),
                and(&ctx, &[y.clone(), x.clone()]).unwrap(),
                "{} and {}",
                x,
                y
            );
            assert_eq!(
                or(&ctx, &[x.clone(), y.clone()]).unwrap(),
                or(&ctx, &[y.clone(), x.clone()]).unwrap(),
                "{} or {}",
                x,
                y
            );
        }
    }
}

#[test]
fn double_negation() {
    let ctx = SimpleContext::new();
    for e in samples(&ctx) {
        assert_eq!(negate(&ctx, &negate(&ctx, &e)), e, "{}", e);
    }
    let n = int("n");
    assert_eq!(negate(&ctx, &negate(&ctx, &n)), n);
}

#[test]
fn contradiction_and_tautology() {
    let ctx = SimpleContext::new();
    for e in samples(&ctx) {
        let not_e = negate(&ctx, &e);
        assert_eq!(and(&ctx, &[e.clone(), not_e.clone()]).unwrap(), FALSE, "{}", e);
        assert_eq!(or(&ctx, &[e.clone(), not_e]).unwrap(), TRUE, "{}", e);
    }
}

#[test]
fn numeric_folding() {
    let ctx = SimpleContext::new();
    assert_eq!(sum(&ctx, &k(3), &k(4)), k(7));
    assert_eq!(product(&ctx, &k(0), &int("n")), k(0));
    assert_eq!(product(&ctx, &k(1), &int("n")), int("n"));
    assert_eq!(
        sum(&ctx, &Expression::double(0.5), &Expression::double(0.5)),
        Expression::double(1.0)
    );
    assert_eq!(sum(&ctx, &k(1), &Expression::double(0.5)), Expression::double(1.5));
}

#[test]
fn like_terms_are_collected() {
    let ctx = SimpleContext::new();
    let n = int("n");
    let three_n = product(&ctx, &k(3), &n);
    assert_eq!(sum(&ctx, &n, &three_n), product(&ctx, &k(4), &n));
    assert_eq!(sum(&ctx, &three_n, &n), product(&ctx, &k(4), &n));
    assert_eq!(sum(&ctx, &n, &n), product(&ctx, &k(2), &n));
    assert_eq!(sum(&ctx, &n, &negate(&ctx, &n)), k(0));
}

#[test]
fn strict_discrete_inequalities_are_normalised() {
    let ctx = SimpleContext::new();
    let n = int("n");
    assert_eq!(greater(&ctx, &n, &k(3), false), greater(&ctx, &n, &k(4), true));
    assert_eq!(less(&ctx, &n, &k(3), false), less(&ctx, &n, &k(2), true));
    assert_eq!(greater(&ctx, &k(4), &k(3), false), TRUE);
    assert_eq!(greater(&ctx, &k(3), &k(3), false), FALSE);
}

#[test]
fn interval_contradiction() {
    let ctx = SimpleContext::new();
    let n = int("n");
    let e = and(
        &ctx,
        &[greater(&ctx, &n, &k(5), true), less(&ctx, &n, &k(3), true)],
    )
    .unwrap();
    assert_eq!(e, FALSE);
}

#[test]
fn equality_cancels_common_terms() {
    let ctx = SimpleContext::new();
    let (a, b, c) = (int("a"), int("b"), int("c"));
    assert_eq!(
        equals(&ctx, &sum(&ctx, &a, &c), &sum(&ctx, &b, &c)),
        equals(&ctx, &a, &b)
    );
    assert_eq!(equals(&ctx, &sum(&ctx, &a, &c), &sum(&ctx, &c, &a)), TRUE);
}

#[test]
fn non_boolean_clauses_are_rejected() {
    let ctx = SimpleContext::new();
    assert!(and(&ctx, &[boolean("a"), int("n")]).is_err());
    assert!(or(&ctx, &[k(1)]).is_err());
}

#[test]
fn unknown_propagates() {
    let ctx = SimpleContext::new();
    let unknown = Expression::Unknown(ParameterizedType::Boolean);
    assert!(and(&ctx, &[boolean("a"), unknown.clone()]).unwrap().is_unknown());
    assert!(or(&ctx, &[boolean("a"), unknown]).unwrap().is_unknown());
    let unknown_int = Expression::Unknown(ParameterizedType::Int);
    assert!(sum(&ctx, &int("n"), &unknown_int).is_unknown());
    assert!(equals(&ctx, &int("n"), &unknown_int).is_unknown());
}

fn declarations() -> Declarations {
    Declarations::new()
        .with(Variable::local("x", ParameterizedType::Int))
        .with(Variable::local("a", ParameterizedType::Boolean))
        .with(Variable::local("b", ParameterizedType::Boolean))
}

/// A comparison of `x` with a small constant, or a possibly negated boolean.
fn random_atom(rng: &mut Pcg64) -> String {
    const OPS: &[&str] = &["==", "!=", "<", "<=", ">", ">="];
    match rng.gen_range(0u32, 4) {
        0 => {
            let name = if rng.gen() { "a" } else { "b" };
            if rng.gen() {
                format!("(! {})", name)
            } else {
                name.to_string()
            }
        }
        _ => {
            let op = OPS[rng.gen_range(0usize, OPS.len())];
            format!("({} x {})", op, rng.gen_range(-2i64, 3))
        }
    }
}

/// One to three atoms under a single `&&` or `||`.
fn random_atoms(rng: &mut Pcg64) -> (&'static str, Vec<String>) {
    let op = if rng.gen() { "&&" } else { "||" };
    let n = rng.gen_range(1usize, 4);
    (op, (0..n).map(|_| random_atom(rng)).collect())
}

#[test]
fn generated_conditions_survive_double_negation() {
    let ctx = SimpleContext::new();
    let d = declarations();
    let mut rng = Pcg64::seed_from_u64(7);
    for _ in 0..2000 {
        let (op, atoms) = random_atoms(&mut rng);
        let input = format!("({} {})", op, atoms.join(" "));
        let e = parse(&ctx, &d, &input).unwrap();
        assert_eq!(negate(&ctx, &negate(&ctx, &e)), e, "{} gave {}", input, e);
    }
}

#[test]
fn generated_conditions_are_commutative() {
    let ctx = SimpleContext::new();
    let d = declarations();
    let mut rng = Pcg64::seed_from_u64(11);
    for _ in 0..2000 {
        let (_, atoms) = random_atoms(&mut rng);
        let values: Vec<Expression> = atoms.iter().map(|a| parse(&ctx, &d, a).unwrap()).collect();
        let mut reversed = values.clone();
        reversed.reverse();
        let mut rotated = values.clone();
        rotated.rotate_left(1);
        let forward = and(&ctx, &values).unwrap();
        assert_eq!(forward, and(&ctx, &reversed).unwrap(), "and of {:?}", atoms);
        assert_eq!(forward, and(&ctx, &rotated).unwrap(), "and of {:?}", atoms);
        let forward = or(&ctx, &values).unwrap();
        assert_eq!(forward, or(&ctx, &reversed).unwrap(), "or of {:?}", atoms);
        assert_eq!(forward, or(&ctx, &rotated).unwrap(), "or of {:?}", atoms);
    }
}

#[test]
fn generated_conditions_keep_their_meaning() {
    let ctx = SimpleContext::new();
    let d = declarations();
    let mut rng = Pcg64::seed_from_u64(13);
    for _ in 0..300 {
        let (op, atoms) = random_atoms(&mut rng);
        let input = format!("({} {})", op, atoms.join(" "));
        let sexp: Sexp = input.parse().unwrap();
        let result = check(&ctx, &d, &sexp, 64, 0).unwrap();
        assert_ne!(result, ValidationResult::Invalid, "{}", input);
    }
}
