//! Two-stage batching controller.
//!
//! Stage one clusters the whole input on the primary value into device
//! groups. Stage two clusters every device group independently on the
//! secondary value into rows. Row runs share no state, so they may execute on
//! the rayon pool.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{info, instrument, warn};

use crate::{
    Result,
    config::{BatchConfig, ExecutionStrategy},
    graph::ClusterGraph,
    operation::{Operation, validate_operations},
    result::{BatchPlan, Cluster, DeviceBatch, StageOutcome},
};
#[cfg(not(feature = "parallel"))]
use crate::error::BatchError;

/// Bound on operation ids accepted by [`Batcher::batch`].
///
/// With the `parallel` feature the row stages may run on the rayon pool, so
/// ids must be [`Sync`]; the bound holds whichever [`ExecutionStrategy`] is
/// chosen at runtime. Without the feature every id type qualifies.
#[cfg(feature = "parallel")]
pub trait MaybeSync: Sync {}

#[cfg(feature = "parallel")]
impl<T: Sync + ?Sized> MaybeSync for T {}

/// Bound on operation ids accepted by [`Batcher::batch`].
///
/// Without the `parallel` feature every id type qualifies.
#[cfg(not(feature = "parallel"))]
pub trait MaybeSync {}

#[cfg(not(feature = "parallel"))]
impl<T: ?Sized> MaybeSync for T {}

/// Entry point for batching operations onto devices and rows.
///
/// # Examples
/// ```
/// use thermobatch_core::{BatcherBuilder, Operation};
///
/// let operations = vec![
///     Operation::new(1, 60.0, 69.0),
///     Operation::new(2, 60.0, 72.0),
///     Operation::new(3, 370.0, 69.0),
/// ];
/// let batcher = BatcherBuilder::new().build().expect("defaults are valid");
/// let plan = batcher.batch(&operations).expect("batching succeeds");
///
/// assert_eq!(plan.device_count(), 2);
/// assert_eq!(plan.devices()[0].device().size(), 2);
/// assert!(!plan.overflows(&batcher.config().hardware()));
/// ```
#[derive(Debug, Clone)]
pub struct Batcher {
    config: BatchConfig,
}

impl Batcher {
    pub(crate) const fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    /// Returns the validated configuration.
    #[must_use]
    #[rustfmt::skip]
    pub const fn config(&self) -> &BatchConfig { &self.config }

    /// Partitions `operations` into device groups and, within each device,
    /// into rows.
    ///
    /// Device groups are ordered by their earliest input position, as are
    /// rows within a device.
    ///
    /// # Errors
    /// Returns [`crate::BatchError::EmptyInput`] for an empty slice,
    /// [`crate::BatchError::NonFiniteValue`] when a value is NaN or infinite,
    /// [`crate::BatchError::ValueOutOfRange`] when a value exceeds
    /// [`crate::MAX_MAGNITUDE`],
    /// [`crate::BatchError::BackendUnavailable`] when parallel execution was
    /// requested without the `parallel` feature, and
    /// [`crate::BatchError::InvariantViolation`] when the engine detects an
    /// internal inconsistency.
    #[instrument(
        name = "core.batch",
        err,
        skip_all,
        fields(
            operations = operations.len(),
            devices = self.config.hardware().device_count().get(),
            strategy = ?self.config.execution(),
        ),
    )]
    pub fn batch<'a, I: MaybeSync>(
        &self,
        operations: &'a [Operation<I>],
    ) -> Result<BatchPlan<'a, I>> {
        if let Err(err) = validate_operations(operations) {
            warn!(code = %err.code(), error = %err, "rejected operation list");
            return Err(err);
        }

        let devices =
            ClusterGraph::from_validated(operations.iter().collect(), self.config.primary_stage())
                .with_representation_checks(self.config.check_representation())
                .run()?;
        let device_merges = devices.merges();
        let device_stop = devices.stop_reason();
        let device_clusters = devices.into_clusters();
        let rows = self.cluster_rows(&device_clusters)?;

        let batches: Vec<DeviceBatch<'a, I>> = device_clusters
            .into_iter()
            .zip(rows)
            .map(|(device, rows)| DeviceBatch::new(device, rows))
            .collect();
        let plan = BatchPlan::new(batches, operations.len(), device_merges, device_stop);

        let hardware = self.config.hardware();
        if plan.overflows(&hardware) {
            warn!(
                devices = plan.device_count(),
                available = hardware.device_count().get(),
                rows_per_device = hardware.rows_per_device().get(),
                stop_reason = %device_stop,
                "plan needs more devices or rows than available"
            );
        }
        info!(
            devices = plan.device_count(),
            rows = plan.devices().iter().map(|batch| batch.rows().len()).sum::<usize>(),
            "batching completed"
        );
        Ok(plan)
    }

    fn cluster_rows<'a, I: MaybeSync>(
        &self,
        devices: &[Cluster<'a, I>],
    ) -> Result<Vec<StageOutcome<'a, I>>> {
        match self.config.execution() {
            #[cfg(feature = "parallel")]
            ExecutionStrategy::Auto | ExecutionStrategy::Parallel => devices
                .par_iter()
                .map(|device| self.rows_for(device))
                .collect(),
            #[cfg(not(feature = "parallel"))]
            ExecutionStrategy::Auto => self.rows_sequential(devices),
            #[cfg(not(feature = "parallel"))]
            ExecutionStrategy::Parallel => Err(BatchError::BackendUnavailable {
                requested: ExecutionStrategy::Parallel,
            }),
            ExecutionStrategy::Sequential => self.rows_sequential(devices),
        }
    }

    fn rows_sequential<'a, I>(&self, devices: &[Cluster<'a, I>]) -> Result<Vec<StageOutcome<'a, I>>> {
        devices.iter().map(|device| self.rows_for(device)).collect()
    }

    /// Device members were validated with the whole input.
    fn rows_for<'a, I>(&self, device: &Cluster<'a, I>) -> Result<StageOutcome<'a, I>> {
        ClusterGraph::from_validated(device.members().to_vec(), self.config.secondary_stage())
            .with_representation_checks(self.config.check_representation())
            .run()
    }
}
