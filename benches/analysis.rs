//! Statistical analysis benchmarks
//!
//! Measures one-way ANOVA, chi-squared and p-value correction at report
//! sizes typical of large designs.
//!
//! Run with: cargo bench --bench analysis

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use factorlab::analysis::{
    adjust_p_values, chi_squared_test, contingency_table, one_way_anova, CorrectionMethod,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const GROUPS: usize = 6;

fn numeric_groups(per_group: usize, rng: &mut StdRng) -> Vec<(String, Vec<f64>)> {
    (0..GROUPS)
        .map(|g| {
            let shift = g as f64 * 0.5;
            let values = (0..per_group)
                .map(|_| shift + rng.gen_range(0.0..10.0))
                .collect();
            (format!("level-{g}"), values)
        })
        .collect()
}

fn bench_anova(c: &mut Criterion) {
    let mut group = c.benchmark_group("one_way_anova");
    let mut rng = StdRng::seed_from_u64(42);

    for per_group in [10, 1_000, 100_000] {
        let groups = numeric_groups(per_group, &mut rng);
        group.bench_with_input(
            BenchmarkId::new("groups_6", per_group * GROUPS),
            &groups,
            |b, groups| b.iter(|| one_way_anova(black_box(groups))),
        );
    }

    group.finish();
}

fn bench_chi_squared(c: &mut Criterion) {
    let mut group = c.benchmark_group("chi_squared");
    let mut rng = StdRng::seed_from_u64(7);
    let levels: Vec<String> = (0..GROUPS).map(|g| format!("level-{g}")).collect();

    for n in [100, 10_000, 100_000] {
        let observations: Vec<(String, String)> = (0..n)
            .map(|_| {
                (
                    levels[rng.gen_range(0..GROUPS)].clone(),
                    format!("category-{}", rng.gen_range(0..4)),
                )
            })
            .collect();
        group.bench_with_input(
            BenchmarkId::new("table_and_test", n),
            &observations,
            |b, observations| {
                b.iter(|| chi_squared_test(contingency_table(&levels, black_box(observations))));
            },
        );
    }

    group.finish();
}

fn bench_correction(c: &mut Criterion) {
    let mut group = c.benchmark_group("p_value_correction");
    let mut rng = StdRng::seed_from_u64(3);
    let p_values: Vec<f64> = (0..10_000).map(|_| rng.gen_range(0.0..1.0)).collect();

    for method in [
        CorrectionMethod::Bonferroni,
        CorrectionMethod::Holm,
        CorrectionMethod::BenjaminiHochberg,
    ] {
        group.bench_with_input(
            BenchmarkId::new(method.to_string(), p_values.len()),
            &p_values,
            |b, p| b.iter(|| adjust_p_values(black_box(p), method)),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_anova, bench_chi_squared, bench_correction);
criterion_main!(benches);
