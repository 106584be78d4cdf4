use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array1;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use vtk_readers::TimeCursor;

fn cursor(n: usize) -> (TimeCursor, Vec<f64>) {
    let mut values: Vec<f64> = Array1::random(n, Uniform::new(0., 1000.)).to_vec();
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup();

    let requests = values.iter().step_by(7).map(|v| v * (1.0 + 1e-9)).collect();
    (TimeCursor::new(values), requests)
}

fn time_lookup_bench(c: &mut Criterion) {
    for n in [100, 10_000] {
        let (cursor, requests) = cursor(n);
        c.bench_function(&format!("resolve time {n}"), |b| {
            b.iter(|| {
                requests
                    .iter()
                    .filter_map(|r| cursor.resolve(black_box(*r)).ok())
                    .sum::<usize>()
            })
        });
    }
}

criterion_group!(benches, time_lookup_bench);
criterion_main!(benches);
