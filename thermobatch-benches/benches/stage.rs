//! Single-stage clustering benchmarks.
//!
//! Isolates one constrained clustering run over the primary value: matrix
//! construction, Prim's spanning tree and the merge loop.
use std::num::NonZeroUsize;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use thermobatch_benches::{
    error::BenchSetupError,
    params::StageBenchParams,
    source::{SyntheticConfig, generate},
};
use thermobatch_core::{
    Attribute, ClusterGraph, DEFAULT_FORCED_PRIMARY_DISTANCE, DEFAULT_PREVENTED_PRIMARY_DISTANCE,
    StageConfig, Thresholds,
};

const SEED: u64 = 7;

const OPERATION_COUNTS: &[usize] = &[100, 400, 1_000];

const CAPACITY: usize = 4;

fn non_zero(value: usize, context: &'static str) -> Result<NonZeroUsize, BenchSetupError> {
    NonZeroUsize::new(value).ok_or(BenchSetupError::ZeroValue { context })
}

fn stage_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group("primary_stage");
    group.sample_size(10);

    let thresholds = Thresholds::new(
        DEFAULT_FORCED_PRIMARY_DISTANCE,
        DEFAULT_PREVENTED_PRIMARY_DISTANCE,
    )?;

    for &operation_count in OPERATION_COUNTS {
        let operations = generate(&SyntheticConfig {
            operation_count,
            seed: SEED,
        })?;
        let stage = StageConfig::new(
            Attribute::Primary,
            non_zero(CAPACITY, "capacity")?,
            non_zero(operation_count, "pair size cap")?,
            thresholds,
        );
        let params = StageBenchParams {
            operation_count,
            capacity: CAPACITY,
        };
        group.bench_with_input(
            BenchmarkId::from_parameter(&params),
            &operations,
            |b, operations| {
                b.iter(|| ClusterGraph::from_slice(operations, stage).and_then(ClusterGraph::run));
            },
        );
    }

    group.finish();
    Ok(())
}

fn primary_stage(c: &mut Criterion) {
    if let Err(err) = stage_impl(c) {
        panic!("primary stage benchmark setup failed: {err}");
    }
}

criterion_group!(benches, primary_stage);
criterion_main!(benches);
