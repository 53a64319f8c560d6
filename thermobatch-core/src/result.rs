//! Clusters, per-stage outcomes and the final batch plan.
//!
//! A [`BatchPlan`] maps every device-level cluster to the row-level clusters
//! built from its members. [`BatchPlan::assignments`] flattens that mapping
//! into one `(device, row)` label per input operation.

use crate::{
    config::HardwareProfile,
    graph::StopReason,
    operation::{Attribute, Operation},
    tree::ClusterStats,
};

/// A top-level cluster returned by one stage.
///
/// Members are ordered by their position in the stage input.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster<'a, I> {
    attribute: Attribute,
    stats: ClusterStats,
    slots: Vec<usize>,
    members: Vec<&'a Operation<I>>,
}

impl<'a, I> Cluster<'a, I> {
    pub(crate) fn new(
        attribute: Attribute,
        stats: ClusterStats,
        slots: Vec<usize>,
        members: Vec<&'a Operation<I>>,
    ) -> Self {
        debug_assert_eq!(slots.len(), members.len());
        Self {
            attribute,
            stats,
            slots,
            members,
        }
    }

    /// Attribute the cluster was formed on.
    #[must_use]
    #[rustfmt::skip]
    pub const fn attribute(&self) -> Attribute { self.attribute }

    /// Aggregate statistics of the cluster.
    #[must_use]
    #[rustfmt::skip]
    pub const fn stats(&self) -> &ClusterStats { &self.stats }

    /// Number of member operations.
    #[must_use]
    #[rustfmt::skip]
    pub const fn size(&self) -> usize { self.stats.size() }

    /// Smallest stage value among the members.
    #[must_use]
    #[rustfmt::skip]
    pub const fn min(&self) -> f64 { self.stats.min() }

    /// Largest stage value among the members.
    #[must_use]
    #[rustfmt::skip]
    pub const fn max(&self) -> f64 { self.stats.max() }

    /// Mean stage value.
    #[must_use]
    #[rustfmt::skip]
    pub const fn mean(&self) -> f64 { self.stats.mean() }

    /// Lowest stage-input position among the members.
    #[must_use]
    pub fn anchor(&self) -> usize {
        self.slots.first().copied().unwrap_or_default()
    }

    /// Stage-input positions of the members, ascending.
    #[must_use]
    pub fn slots(&self) -> &[usize] {
        &self.slots
    }

    /// Member operations.
    #[must_use]
    pub fn members(&self) -> &[&'a Operation<I>] {
        &self.members
    }

    /// Identifiers of the member operations.
    pub fn ids(&self) -> impl Iterator<Item = &'a I> + '_ {
        self.members.iter().map(|operation| operation.id())
    }
}

/// Top-level clusters and bookkeeping from one cluster graph run.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome<'a, I> {
    clusters: Vec<Cluster<'a, I>>,
    initial_count: usize,
    merges: usize,
    stop_reason: StopReason,
}

impl<'a, I> StageOutcome<'a, I> {
    pub(crate) fn new(
        clusters: Vec<Cluster<'a, I>>,
        initial_count: usize,
        merges: usize,
        stop_reason: StopReason,
    ) -> Self {
        Self {
            clusters,
            initial_count,
            merges,
            stop_reason,
        }
    }

    /// Clusters ordered by anchor.
    #[must_use]
    pub fn clusters(&self) -> &[Cluster<'a, I>] {
        &self.clusters
    }

    /// Consumes the outcome, returning its clusters.
    #[must_use]
    pub fn into_clusters(self) -> Vec<Cluster<'a, I>> {
        self.clusters
    }

    /// Number of singleton clusters the graph started with.
    #[must_use]
    #[rustfmt::skip]
    pub const fn initial_count(&self) -> usize { self.initial_count }

    /// Number of merges performed. Always `initial_count - clusters().len()`.
    #[must_use]
    #[rustfmt::skip]
    pub const fn merges(&self) -> usize { self.merges }

    /// Why merging ended.
    #[must_use]
    #[rustfmt::skip]
    pub const fn stop_reason(&self) -> StopReason { self.stop_reason }
}

/// One device-level cluster and the rows formed from its members.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceBatch<'a, I> {
    device: Cluster<'a, I>,
    rows: StageOutcome<'a, I>,
}

impl<'a, I> DeviceBatch<'a, I> {
    pub(crate) const fn new(device: Cluster<'a, I>, rows: StageOutcome<'a, I>) -> Self {
        Self { device, rows }
    }

    /// The stage-one cluster placed on this device.
    #[must_use]
    #[rustfmt::skip]
    pub const fn device(&self) -> &Cluster<'a, I> { &self.device }

    /// Row clusters, ordered by anchor. Row member slots index into
    /// [`Cluster::members`] of [`Self::device`].
    #[must_use]
    pub fn rows(&self) -> &[Cluster<'a, I>] {
        self.rows.clusters()
    }

    /// Outcome of the row clustering run.
    #[must_use]
    #[rustfmt::skip]
    pub const fn row_outcome(&self) -> &StageOutcome<'a, I> { &self.rows }
}

/// Where one operation landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAssignment<'a, I> {
    /// Position of the operation in the batched input.
    pub index: usize,
    /// Identifier of the operation.
    pub id: &'a I,
    /// Device group, counted from zero in plan order.
    pub device: usize,
    /// Row group within the device, counted from zero.
    pub row: usize,
}

/// Mapping from device-level clusters to their row-level clusters.
///
/// # Examples
/// ```
/// use thermobatch_core::{BatcherBuilder, Operation};
///
/// let operations = vec![
///     Operation::new("a", 60.0, 69.0),
///     Operation::new("b", 62.0, 69.1),
///     Operation::new("c", 770.0, 72.0),
/// ];
/// let batcher = BatcherBuilder::new().build().expect("defaults are valid");
/// let plan = batcher.batch(&operations).expect("batching succeeds");
///
/// assert_eq!(plan.operation_count(), 3);
/// let labels: Vec<(&str, usize, usize)> = plan
///     .assignments()
///     .into_iter()
///     .map(|slot| (*slot.id, slot.device, slot.row))
///     .collect();
/// assert_eq!(labels, vec![("a", 0, 0), ("b", 0, 0), ("c", 1, 0)]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan<'a, I> {
    devices: Vec<DeviceBatch<'a, I>>,
    operation_count: usize,
    merges: usize,
    stop_reason: StopReason,
}

impl<'a, I> BatchPlan<'a, I> {
    pub(crate) fn new(
        devices: Vec<DeviceBatch<'a, I>>,
        operation_count: usize,
        merges: usize,
        stop_reason: StopReason,
    ) -> Self {
        Self {
            devices,
            operation_count,
            merges,
            stop_reason,
        }
    }

    /// Device batches ordered by anchor.
    #[must_use]
    pub fn devices(&self) -> &[DeviceBatch<'a, I>] {
        &self.devices
    }

    /// Number of device-level groups.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Number of operations batched.
    #[must_use]
    #[rustfmt::skip]
    pub const fn operation_count(&self) -> usize { self.operation_count }

    /// Merges performed by the device-level stage.
    #[must_use]
    #[rustfmt::skip]
    pub const fn device_merges(&self) -> usize { self.merges }

    /// Why the device-level stage stopped.
    #[must_use]
    #[rustfmt::skip]
    pub const fn device_stop_reason(&self) -> StopReason { self.stop_reason }

    /// Returns `true` when the plan needs more devices, or more rows on some
    /// device, than `hardware` provides.
    ///
    /// The engine reports overflow but never resolves it.
    #[must_use]
    pub fn overflows(&self, hardware: &HardwareProfile) -> bool {
        self.devices.len() > hardware.device_count().get()
            || self
                .devices
                .iter()
                .any(|batch| batch.rows().len() > hardware.rows_per_device().get())
    }

    /// One assignment per input operation, in input order.
    #[must_use]
    pub fn assignments(&self) -> Vec<SlotAssignment<'a, I>> {
        let mut assignments = Vec::with_capacity(self.operation_count);
        for (device, batch) in self.devices.iter().enumerate() {
            let device_slots = batch.device().slots();
            for (row, cluster) in batch.rows().iter().enumerate() {
                for (&slot, member) in cluster.slots().iter().zip(cluster.members()) {
                    assignments.push(SlotAssignment {
                        index: device_slots[slot],
                        id: member.id(),
                        device,
                        row,
                    });
                }
            }
        }
        assignments.sort_unstable_by_key(|assignment| assignment.index);
        assignments
    }
}
