//! Tests for the two-stage `Batcher` API.

mod common;

use std::collections::BTreeSet;

use common::{device_groups, random_operations, scenario};
use rstest::{fixture, rstest};
use thermobatch_core::{
    Batcher, BatchError, BatchErrorCode, BatcherBuilder, ExecutionStrategy, Operation, StopReason,
};
use thermobatch_test_support::tracing::RecordingLayer;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

#[fixture]
fn batcher() -> Batcher {
    BatcherBuilder::new()
        .with_representation_checks(true)
        .build()
        .expect("defaults are valid")
}

#[rstest]
fn scenario_forms_four_device_groups(batcher: Batcher) {
    let operations = scenario();
    let plan = batcher.batch(&operations).expect("batching succeeds");

    assert_eq!(
        device_groups(&plan),
        vec![
            vec![1, 2, 3],
            vec![4, 5, 6, 7],
            vec![8, 9, 10, 11],
            vec![12, 13],
        ]
    );
    assert_eq!(plan.device_stop_reason(), StopReason::CapacityReached);
    assert_eq!(plan.device_merges(), 9);
    assert!(!plan.overflows(&batcher.config().hardware()));
}

#[rstest]
fn scenario_rows_split_on_annealing_temperature(batcher: Batcher) {
    let operations = scenario();
    let plan = batcher.batch(&operations).expect("batching succeeds");

    let rows: Vec<Vec<u32>> = plan.devices()[0]
        .rows()
        .iter()
        .map(|row| row.ids().copied().collect())
        .collect();
    assert_eq!(rows, vec![vec![1], vec![2], vec![3]]);

    let cold: Vec<Vec<u32>> = plan.devices()[3]
        .rows()
        .iter()
        .map(|row| row.ids().copied().collect())
        .collect();
    assert_eq!(cold, vec![vec![12], vec![13]]);
}

#[rstest]
fn single_operation_occupies_one_row() {
    let batcher = BatcherBuilder::new()
        .with_device_count(2)
        .with_representation_checks(true)
        .build()
        .expect("valid configuration");
    let operations = [Operation::new("only", 60.0, 69.0)];
    let plan = batcher.batch(&operations).expect("batching succeeds");

    assert_eq!(plan.device_count(), 1);
    assert_eq!(plan.device_merges(), 0);
    assert_eq!(plan.devices()[0].rows().len(), 1);
    assert_eq!(plan.devices()[0].row_outcome().merges(), 0);
    let assignments = plan.assignments();
    assert_eq!(assignments.len(), 1);
    assert_eq!((assignments[0].device, assignments[0].row), (0, 0));
}

#[rstest]
fn random_batch_respects_hardware_limits(batcher: Batcher) {
    let operations = random_operations(0x7e57, 300);
    let plan = batcher.batch(&operations).expect("batching succeeds");
    let hardware = batcher.config().hardware();

    let indices: Vec<usize> = plan.assignments().iter().map(|slot| slot.index).collect();
    assert_eq!(indices, (0..300).collect::<Vec<_>>());
    for (position, slot) in plan.assignments().iter().enumerate() {
        assert_eq!(*slot.id, position);
    }

    for batch in plan.devices() {
        let device = batch.device();
        assert!(device.size() <= hardware.slots_per_device().get());
        assert!(device.stats().cross_range() <= hardware.gradient_width());
        let row_total: usize = batch.rows().iter().map(|row| row.size()).sum();
        assert_eq!(row_total, device.size());
        assert!(
            batch
                .rows()
                .iter()
                .all(|row| row.size() <= hardware.columns_per_row().get())
        );
    }
}

#[rstest]
fn repeated_runs_are_identical(batcher: Batcher) {
    let operations = random_operations(11, 120);
    let first = batcher.batch(&operations).expect("first run succeeds");
    let second = batcher.batch(&operations).expect("second run succeeds");
    assert_eq!(first, second);
}

#[rstest]
#[case::auto(ExecutionStrategy::Auto)]
#[case::sequential(ExecutionStrategy::Sequential)]
#[cfg_attr(feature = "parallel", case::parallel(ExecutionStrategy::Parallel))]
fn strategies_agree(#[case] strategy: ExecutionStrategy) {
    let operations = random_operations(99, 150);
    let reference = BatcherBuilder::new()
        .with_execution_strategy(ExecutionStrategy::Sequential)
        .build()
        .expect("valid configuration")
        .batch(&operations)
        .expect("sequential run succeeds");
    let plan = BatcherBuilder::new()
        .with_execution_strategy(strategy)
        .build()
        .expect("valid configuration")
        .batch(&operations)
        .expect("run succeeds");
    assert_eq!(plan, reference);
}

#[rstest]
fn rejects_empty_input(batcher: Batcher) {
    let operations: [Operation<u8>; 0] = [];
    let err = batcher.batch(&operations).expect_err("empty input is rejected");
    assert_eq!(err, BatchError::EmptyInput);
    assert_eq!(err.code(), BatchErrorCode::EmptyInput);
    assert_eq!(err.code().as_str(), "BATCH_EMPTY_INPUT");
    assert!(!err.is_internal());
}

#[rstest]
fn rejects_non_finite_values(batcher: Batcher) {
    let operations = [
        Operation::new(0, 60.0, 69.0),
        Operation::new(1, 60.0, f64::INFINITY),
    ];
    let err = batcher.batch(&operations).expect_err("infinite temperature is rejected");
    assert_eq!(err.code(), BatchErrorCode::NonFiniteValue);
    assert_eq!(err.invariant_code(), None);
}

#[rstest]
fn groups_never_share_members(batcher: Batcher) {
    let operations = random_operations(5, 80);
    let plan = batcher.batch(&operations).expect("batching succeeds");
    let mut seen = BTreeSet::new();
    for group in device_groups(&plan) {
        for id in group {
            assert!(seen.insert(id), "operation {id} appears twice");
        }
    }
    assert_eq!(seen.len(), operations.len());
}

#[rstest]
fn emits_batch_and_stage_spans() {
    // The recording subscriber is thread-local, so keep row runs on this thread.
    let batcher = BatcherBuilder::new()
        .with_execution_strategy(ExecutionStrategy::Sequential)
        .build()
        .expect("valid configuration");
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());
    let operations = scenario();
    tracing::subscriber::with_default(subscriber, || {
        batcher.batch(&operations).expect("batching succeeds");
    });

    let batches = layer.spans_named("core.batch");
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].field("operations"), Some("13"));
    assert_eq!(batches[0].field("devices"), Some("4"));

    let stages = layer.spans_named("core.stage");
    assert_eq!(stages.len(), 5, "one device stage plus one row stage per device");
    assert_eq!(
        stages
            .iter()
            .filter(|span| span.field("attribute") == Some("secondary"))
            .count(),
        4
    );

    let completed: Vec<_> = layer
        .events_at(Level::INFO)
        .into_iter()
        .filter(|event| event.field("message") == Some("batching completed"))
        .collect();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].field("devices"), Some("4"));
}

#[rstest]
fn warns_on_rejected_input(batcher: Batcher) {
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());
    let operations: [Operation<u8>; 0] = [];
    tracing::subscriber::with_default(subscriber, || {
        batcher.batch(&operations).expect_err("empty input is rejected");
    });

    let warnings = layer.events_at(Level::WARN);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field("code"), Some("BATCH_EMPTY_INPUT"));
}

#[rstest]
fn warns_when_plan_overflows() {
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());
    let batcher = BatcherBuilder::new()
        .with_device_count(1)
        .build()
        .expect("valid configuration");
    let operations = scenario();
    let plan = tracing::subscriber::with_default(subscriber, || {
        batcher.batch(&operations).expect("batching succeeds")
    });

    assert!(plan.overflows(&batcher.config().hardware()));
    let warnings = layer.events_at(Level::WARN);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field("available"), Some("1"));
}

#[rstest]
fn out_of_range_input_is_rejected_before_any_stage(batcher: Batcher) {
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());
    let operations = [
        Operation::new(0, 60.0, 69.0),
        Operation::new(1, f64::MAX, 69.0),
    ];
    let err = tracing::subscriber::with_default(subscriber, || {
        batcher.batch(&operations).expect_err("huge extension time is rejected")
    });

    assert_eq!(err.code(), BatchErrorCode::ValueOutOfRange);
    assert_eq!(err.code().as_str(), "BATCH_VALUE_OUT_OF_RANGE");
    let warnings = layer.events_at(Level::WARN);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field("code"), Some("BATCH_VALUE_OUT_OF_RANGE"));
    assert!(layer.spans_named("core.stage").is_empty());
}

#[cfg(not(feature = "parallel"))]
#[rstest]
fn batches_operations_with_thread_local_ids(batcher: Batcher) {
    use std::rc::Rc;

    let operations: Vec<Operation<Rc<str>>> = scenario()
        .iter()
        .map(|op| {
            let id: Rc<str> = Rc::from(op.id().to_string());
            Operation::new(id, op.primary_value(), op.secondary_value())
        })
        .collect();
    let plan = batcher.batch(&operations).expect("batching succeeds");
    assert_eq!(plan.device_count(), 4);
    let assignments = plan.assignments();
    assert_eq!(&**assignments[12].id, "13");
}
