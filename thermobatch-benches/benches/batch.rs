//! End-to-end batching benchmarks.
//!
//! Measures device clustering followed by per-device row clustering on
//! seeded synthetic operation lists, with and without representation checks.
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use thermobatch_benches::{
    error::BenchSetupError,
    params::BatchBenchParams,
    source::{SyntheticConfig, generate},
};
use thermobatch_core::BatcherBuilder;

/// Seed used for all synthetic data generation in this benchmark.
const SEED: u64 = 42;

/// Input sizes to benchmark.
const OPERATION_COUNTS: &[usize] = &[48, 192, 384];

fn batch_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group("batch");
    group.sample_size(20);

    for &operation_count in OPERATION_COUNTS {
        let operations = generate(&SyntheticConfig {
            operation_count,
            seed: SEED,
        })?;
        for checked in [false, true] {
            let batcher = BatcherBuilder::new()
                .with_representation_checks(checked)
                .build()?;
            let params = BatchBenchParams {
                operation_count,
                checked,
            };
            group.bench_with_input(
                BenchmarkId::from_parameter(&params),
                &operations,
                |b, operations| {
                    b.iter(|| batcher.batch(operations));
                },
            );
        }
    }

    group.finish();
    Ok(())
}

fn batch(c: &mut Criterion) {
    if let Err(err) = batch_impl(c) {
        panic!("batch benchmark setup failed: {err}");
    }
}

criterion_group!(benches, batch);
criterion_main!(benches);
