use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

use pm_matrix::{cpu, parallel, Matrix, DEFAULT_THRESHOLD};

fn random_matrix(size: usize, seed: u64) -> Matrix<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Matrix::from_fn(size, |_, _| rng.gen::<f32>()).unwrap()
}

fn benchmark_suite(c: &mut Criterion) {
    let mut group = c.benchmark_group("multiply_f32");
    group.sample_size(10);

    for size in [128, 256, 512] {
        let a = random_matrix(size, 1);
        let b = random_matrix(size, 2);
        // Reuse one output per size; every call overwrites all of it.
        let out = Matrix::new(size).unwrap();

        group.bench_with_input(BenchmarkId::new("sequential", size), &size, |bencher, _| {
            bencher.iter(|| {
                cpu::multiply(&a, &b, &out).unwrap();
                black_box(&out);
            })
        });

        // Thresholds below the default so smaller sizes still recurse.
        for threshold in [32, 64, DEFAULT_THRESHOLD] {
            let id = BenchmarkId::new(format!("parallel_t{threshold}"), size);
            group.bench_with_input(id, &size, |bencher, _| {
                bencher.iter(|| {
                    parallel::multiply(&a, &b, &out, threshold).unwrap();
                    black_box(&out);
                })
            });
        }
    }

    group.finish();
}

criterion_group!(benches, benchmark_suite);
criterion_main!(benches);
