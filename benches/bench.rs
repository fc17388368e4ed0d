use criterion::black_box as bb;
use criterion::Criterion;
use criterion::{criterion_group, criterion_main};

use symtree::{Expression, Inputs};

const RASTRIGIN: &str =
    "(+ 20 (pow x 2) (* -10 (cos (* 2 pi x))) (pow y 2) (* -10 (cos (* 2 pi y))))";

fn rastrigin() -> Expression {
    let mut expr: Expression = RASTRIGIN.parse().unwrap();
    expr.put_indexes();
    expr
}

fn evaluation(c: &mut Criterion) {
    let expr = rastrigin();
    let lambdified = expr.lambdify().unwrap();
    let compiled = expr.compile().unwrap();
    let reals = [0.5, -1.25];
    let inputs = Inputs::reals(&reals);

    c.bench_function("evaluate rastrigin", |b| {
        b.iter(|| expr.evaluate(bb(&inputs)))
    });
    c.bench_function("lambdified rastrigin", |b| {
        b.iter(|| lambdified.call(bb(&inputs)))
    });
    c.bench_function("compiled rastrigin", |b| {
        b.iter(|| compiled.call(bb(&inputs)))
    });
}

fn rewriting(c: &mut Criterion) {
    let expr: Expression = "(* (+ x 1) (+ x 2) (+ y 3) (pow (+ x y) 2))".parse().unwrap();

    c.bench_function("simplify", |b| {
        b.iter(|| bb(&expr).simplified())
    });
    c.bench_function("expand", |b| {
        b.iter(|| bb(&expr).expanded())
    });
    c.bench_function("compile rastrigin", |b| {
        let expr = rastrigin();
        b.iter(|| bb(&expr).compile())
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().significance_level(0.05).sample_size(1000);
    targets = evaluation, rewriting
);

criterion_main!(benches);
