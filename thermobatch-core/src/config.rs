//! Validated configuration for batching runs.
//!
//! [`BatcherBuilder`] collects hardware dimensions and merge thresholds,
//! validates them once, and derives the per-stage [`StageConfig`] values the
//! cluster graphs consume.

use std::num::NonZeroUsize;

use crate::{Result, batcher::Batcher, error::BatchError, operation::Attribute};

/// Number of thermocyclers available by default.
pub const DEFAULT_DEVICE_COUNT: usize = 4;
/// Rows per thermocycler block by default.
pub const DEFAULT_ROWS_PER_DEVICE: usize = 8;
/// Columns per row by default.
pub const DEFAULT_COLUMNS_PER_ROW: usize = 12;
/// Temperature span one gradient block can cover by default.
pub const DEFAULT_GRADIENT_WIDTH: f64 = 17.0;
/// Extension difference under which operations always share a device.
pub const DEFAULT_FORCED_PRIMARY_DISTANCE: f64 = 30.0;
/// Extension difference at which operations never share a device.
pub const DEFAULT_PREVENTED_PRIMARY_DISTANCE: f64 = 300.0;
/// Annealing difference under which operations always share a row.
pub const DEFAULT_FORCED_SECONDARY_DISTANCE: f64 = 0.3;
/// Annealing difference at which operations never share a row.
pub const DEFAULT_PREVENTED_SECONDARY_DISTANCE: f64 = 3.0;

/// Indicates how a [`Batcher`] schedules the independent per-device row
/// clustering runs.
///
/// `Auto` uses the parallel scheduler when the `parallel` feature is compiled
/// in and falls back to sequential execution otherwise. Output is identical
/// either way.
///
/// # Examples
/// ```
/// use thermobatch_core::ExecutionStrategy;
///
/// let strategy = ExecutionStrategy::default();
/// assert_eq!(strategy, ExecutionStrategy::Auto);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Let the library choose.
    #[default]
    Auto,
    /// Run every row clustering on the calling thread.
    Sequential,
    /// Run row clusterings on the rayon thread pool.
    Parallel,
}

/// Physical layout of the thermocyclers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HardwareProfile {
    device_count: NonZeroUsize,
    rows_per_device: NonZeroUsize,
    columns_per_row: NonZeroUsize,
    gradient_width: f64,
}

impl HardwareProfile {
    /// Number of devices.
    #[must_use]
    #[rustfmt::skip]
    pub const fn device_count(&self) -> NonZeroUsize { self.device_count }

    /// Rows per device.
    #[must_use]
    #[rustfmt::skip]
    pub const fn rows_per_device(&self) -> NonZeroUsize { self.rows_per_device }

    /// Columns (reaction slots) per row.
    #[must_use]
    #[rustfmt::skip]
    pub const fn columns_per_row(&self) -> NonZeroUsize { self.columns_per_row }

    /// Widest temperature span a single device gradient can cover.
    #[must_use]
    #[rustfmt::skip]
    pub const fn gradient_width(&self) -> f64 { self.gradient_width }

    /// Reaction slots on one device (`rows × columns`).
    #[must_use]
    pub const fn slots_per_device(&self) -> NonZeroUsize {
        self.rows_per_device.saturating_mul(self.columns_per_row)
    }
}

/// Merge thresholds for one stage.
///
/// Pairs closer than or equal to `forced_distance` merge even when the stage
/// already fits its capacity; pairs at or beyond `prevented_distance` never
/// merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    forced_distance: f64,
    prevented_distance: f64,
}

impl Thresholds {
    /// Validates and creates thresholds.
    ///
    /// `prevented_distance` may be `f64::INFINITY` to disable the cut-off.
    ///
    /// # Errors
    /// Returns [`BatchError::InvalidConfig`] when `forced_distance` is negative
    /// or non-finite, when `prevented_distance` is NaN, or when
    /// `prevented_distance < forced_distance`.
    ///
    /// # Examples
    /// ```
    /// use thermobatch_core::Thresholds;
    ///
    /// let thresholds = Thresholds::new(30.0, 300.0).expect("valid thresholds");
    /// assert_eq!(thresholds.forced_distance(), 30.0);
    /// assert!(Thresholds::new(-1.0, 300.0).is_err());
    /// ```
    pub fn new(forced_distance: f64, prevented_distance: f64) -> Result<Self> {
        Self::checked(
            forced_distance,
            prevented_distance,
            ("forced_distance", "prevented_distance"),
        )
    }

    fn checked(
        forced_distance: f64,
        prevented_distance: f64,
        (forced_field, prevented_field): (&'static str, &'static str),
    ) -> Result<Self> {
        if !forced_distance.is_finite() || forced_distance < 0.0 {
            return Err(BatchError::InvalidConfig {
                field: forced_field,
                reason: "must be finite and non-negative",
            });
        }
        if prevented_distance.is_nan() {
            return Err(BatchError::InvalidConfig {
                field: prevented_field,
                reason: "must not be NaN",
            });
        }
        if prevented_distance < forced_distance {
            return Err(BatchError::InvalidConfig {
                field: prevented_field,
                reason: "must not be smaller than the forced distance",
            });
        }
        Ok(Self {
            forced_distance,
            prevented_distance,
        })
    }

    /// Distance at or under which merging continues past capacity.
    #[must_use]
    #[rustfmt::skip]
    pub const fn forced_distance(&self) -> f64 { self.forced_distance }

    /// Distance at or beyond which merging stops.
    #[must_use]
    #[rustfmt::skip]
    pub const fn prevented_distance(&self) -> f64 { self.prevented_distance }
}

/// Constraints and stopping parameters for one cluster graph.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
/// use thermobatch_core::{Attribute, StageConfig, Thresholds};
///
/// let stage = StageConfig::new(
///     Attribute::Secondary,
///     NonZeroUsize::new(8).expect("non-zero"),
///     NonZeroUsize::new(12).expect("non-zero"),
///     Thresholds::new(0.3, 3.0).expect("valid thresholds"),
/// );
/// assert_eq!(stage.range_limit(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageConfig {
    attribute: Attribute,
    capacity_limit: NonZeroUsize,
    pair_size_cap: NonZeroUsize,
    range_limit: Option<f64>,
    thresholds: Thresholds,
}

impl StageConfig {
    /// Creates a stage without a cross-attribute range limit.
    #[must_use]
    pub const fn new(
        attribute: Attribute,
        capacity_limit: NonZeroUsize,
        pair_size_cap: NonZeroUsize,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            attribute,
            capacity_limit,
            pair_size_cap,
            range_limit: None,
            thresholds,
        }
    }

    /// Bounds the spread of the cross attribute inside any merged cluster.
    ///
    /// # Errors
    /// Returns [`BatchError::InvalidConfig`] when `limit` is negative or NaN.
    pub fn with_range_limit(mut self, limit: f64) -> Result<Self> {
        if limit.is_nan() || limit < 0.0 {
            return Err(BatchError::InvalidConfig {
                field: "range_limit",
                reason: "must be non-negative",
            });
        }
        self.range_limit = Some(limit);
        Ok(self)
    }

    /// Attribute the stage measures distance on.
    #[must_use]
    #[rustfmt::skip]
    pub const fn attribute(&self) -> Attribute { self.attribute }

    /// Target maximum number of clusters.
    #[must_use]
    #[rustfmt::skip]
    pub const fn capacity_limit(&self) -> NonZeroUsize { self.capacity_limit }

    /// Largest member count a merged cluster may have.
    #[must_use]
    #[rustfmt::skip]
    pub const fn pair_size_cap(&self) -> NonZeroUsize { self.pair_size_cap }

    /// Largest allowed spread of the cross attribute, if bounded.
    #[must_use]
    #[rustfmt::skip]
    pub const fn range_limit(&self) -> Option<f64> { self.range_limit }

    /// Merge thresholds.
    #[must_use]
    #[rustfmt::skip]
    pub const fn thresholds(&self) -> Thresholds { self.thresholds }
}

/// Fully validated configuration held by a [`Batcher`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchConfig {
    hardware: HardwareProfile,
    primary: Thresholds,
    secondary: Thresholds,
    check_representation: bool,
    execution: ExecutionStrategy,
}

impl BatchConfig {
    /// Hardware layout.
    #[must_use]
    #[rustfmt::skip]
    pub const fn hardware(&self) -> HardwareProfile { self.hardware }

    /// Whether cluster graphs verify their representation after every merge.
    #[must_use]
    #[rustfmt::skip]
    pub const fn check_representation(&self) -> bool { self.check_representation }

    /// Scheduling strategy for row clustering.
    #[must_use]
    #[rustfmt::skip]
    pub const fn execution(&self) -> ExecutionStrategy { self.execution }

    /// Stage one: cluster by the primary value into at most `device_count`
    /// groups, each fitting one device and one gradient.
    #[must_use]
    pub const fn primary_stage(&self) -> StageConfig {
        StageConfig {
            attribute: Attribute::Primary,
            capacity_limit: self.hardware.device_count,
            pair_size_cap: self.hardware.slots_per_device(),
            range_limit: Some(self.hardware.gradient_width),
            thresholds: self.primary,
        }
    }

    /// Stage two: cluster one device's operations by the secondary value into
    /// at most `rows_per_device` rows of at most `columns_per_row` each.
    #[must_use]
    pub const fn secondary_stage(&self) -> StageConfig {
        StageConfig {
            attribute: Attribute::Secondary,
            capacity_limit: self.hardware.rows_per_device,
            pair_size_cap: self.hardware.columns_per_row,
            range_limit: None,
            thresholds: self.secondary,
        }
    }
}

/// Configures and constructs [`Batcher`] instances.
///
/// # Examples
/// ```
/// use thermobatch_core::{BatcherBuilder, ExecutionStrategy};
///
/// let batcher = BatcherBuilder::new()
///     .with_device_count(2)
///     .with_execution_strategy(ExecutionStrategy::Sequential)
///     .build()
///     .expect("builder configuration is valid");
/// assert_eq!(batcher.config().hardware().device_count().get(), 2);
/// assert_eq!(batcher.config().primary_stage().pair_size_cap().get(), 96);
/// ```
#[derive(Debug, Clone)]
pub struct BatcherBuilder {
    device_count: usize,
    rows_per_device: usize,
    columns_per_row: usize,
    gradient_width: f64,
    forced_primary_distance: f64,
    prevented_primary_distance: f64,
    forced_secondary_distance: f64,
    prevented_secondary_distance: f64,
    check_representation: bool,
    execution: ExecutionStrategy,
}

impl Default for BatcherBuilder {
    fn default() -> Self {
        Self {
            device_count: DEFAULT_DEVICE_COUNT,
            rows_per_device: DEFAULT_ROWS_PER_DEVICE,
            columns_per_row: DEFAULT_COLUMNS_PER_ROW,
            gradient_width: DEFAULT_GRADIENT_WIDTH,
            forced_primary_distance: DEFAULT_FORCED_PRIMARY_DISTANCE,
            prevented_primary_distance: DEFAULT_PREVENTED_PRIMARY_DISTANCE,
            forced_secondary_distance: DEFAULT_FORCED_SECONDARY_DISTANCE,
            prevented_secondary_distance: DEFAULT_PREVENTED_SECONDARY_DISTANCE,
            check_representation: false,
            execution: ExecutionStrategy::Auto,
        }
    }
}

impl BatcherBuilder {
    /// Creates a builder populated with the default workflow settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the number of devices.
    #[must_use]
    pub const fn with_device_count(mut self, count: usize) -> Self {
        self.device_count = count;
        self
    }

    /// Overrides the rows per device.
    #[must_use]
    pub const fn with_rows_per_device(mut self, rows: usize) -> Self {
        self.rows_per_device = rows;
        self
    }

    /// Overrides the columns per row.
    #[must_use]
    pub const fn with_columns_per_row(mut self, columns: usize) -> Self {
        self.columns_per_row = columns;
        self
    }

    /// Overrides the gradient width.
    #[must_use]
    pub const fn with_gradient_width(mut self, width: f64) -> Self {
        self.gradient_width = width;
        self
    }

    /// Overrides the stage-one thresholds.
    #[must_use]
    pub const fn with_primary_thresholds(mut self, forced: f64, prevented: f64) -> Self {
        self.forced_primary_distance = forced;
        self.prevented_primary_distance = prevented;
        self
    }

    /// Overrides the stage-two thresholds.
    #[must_use]
    pub const fn with_secondary_thresholds(mut self, forced: f64, prevented: f64) -> Self {
        self.forced_secondary_distance = forced;
        self.prevented_secondary_distance = prevented;
        self
    }

    /// Enables the representation checker. Slow; meant for tests.
    #[must_use]
    pub const fn with_representation_checks(mut self, enabled: bool) -> Self {
        self.check_representation = enabled;
        self
    }

    /// Sets the scheduling strategy for row clustering.
    #[must_use]
    pub const fn with_execution_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.execution = strategy;
        self
    }

    /// Returns the configured device count.
    #[must_use]
    #[rustfmt::skip]
    pub const fn device_count(&self) -> usize { self.device_count }

    /// Returns the configured execution strategy.
    #[must_use]
    #[rustfmt::skip]
    pub const fn execution_strategy(&self) -> ExecutionStrategy { self.execution }

    /// Validates the configuration and constructs a [`Batcher`].
    ///
    /// # Errors
    /// Returns [`BatchError::InvalidConfig`] naming the first rejected field,
    /// and [`BatchError::BackendUnavailable`] when
    /// [`ExecutionStrategy::Parallel`] is requested without the `parallel`
    /// feature.
    ///
    /// # Examples
    /// ```
    /// use thermobatch_core::{BatchError, BatcherBuilder};
    ///
    /// let err = BatcherBuilder::new()
    ///     .with_rows_per_device(0)
    ///     .build()
    ///     .expect_err("zero rows are rejected");
    /// assert!(matches!(err, BatchError::InvalidConfig { field: "rows_per_device", .. }));
    /// ```
    pub fn build(self) -> Result<Batcher> {
        let hardware = HardwareProfile {
            device_count: non_zero(self.device_count, "device_count")?,
            rows_per_device: non_zero(self.rows_per_device, "rows_per_device")?,
            columns_per_row: non_zero(self.columns_per_row, "columns_per_row")?,
            gradient_width: self.checked_gradient_width()?,
        };
        let primary = Thresholds::checked(
            self.forced_primary_distance,
            self.prevented_primary_distance,
            ("forced_primary_distance", "prevented_primary_distance"),
        )?;
        let secondary = Thresholds::checked(
            self.forced_secondary_distance,
            self.prevented_secondary_distance,
            ("forced_secondary_distance", "prevented_secondary_distance"),
        )?;

        #[cfg(not(feature = "parallel"))]
        if self.execution == ExecutionStrategy::Parallel {
            return Err(BatchError::BackendUnavailable {
                requested: ExecutionStrategy::Parallel,
            });
        }

        Ok(Batcher::new(BatchConfig {
            hardware,
            primary,
            secondary,
            check_representation: self.check_representation,
            execution: self.execution,
        }))
    }

    fn checked_gradient_width(&self) -> Result<f64> {
        if !self.gradient_width.is_finite() || self.gradient_width < 0.0 {
            return Err(BatchError::InvalidConfig {
                field: "gradient_width",
                reason: "must be finite and non-negative",
            });
        }
        Ok(self.gradient_width)
    }
}

fn non_zero(value: usize, field: &'static str) -> Result<NonZeroUsize> {
    NonZeroUsize::new(value).ok_or(BatchError::InvalidConfig {
        field,
        reason: "must be at least 1",
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_match_the_workflow_table() {
        let batcher = BatcherBuilder::new().build().expect("defaults are valid");
        let config = batcher.config();

        let primary = config.primary_stage();
        assert_eq!(primary.attribute(), Attribute::Primary);
        assert_eq!(primary.capacity_limit().get(), 4);
        assert_eq!(primary.pair_size_cap().get(), 96);
        assert_eq!(primary.range_limit(), Some(17.0));
        assert_eq!(primary.thresholds().forced_distance(), 30.0);
        assert_eq!(primary.thresholds().prevented_distance(), 300.0);

        let secondary = config.secondary_stage();
        assert_eq!(secondary.attribute(), Attribute::Secondary);
        assert_eq!(secondary.capacity_limit().get(), 8);
        assert_eq!(secondary.pair_size_cap().get(), 12);
        assert_eq!(secondary.range_limit(), None);
        assert_eq!(secondary.thresholds().forced_distance(), 0.3);
        assert_eq!(secondary.thresholds().prevented_distance(), 3.0);

        assert!(!config.check_representation());
        assert_eq!(config.execution(), ExecutionStrategy::Auto);
    }

    #[rstest]
    #[case::devices(BatcherBuilder::new().with_device_count(0), "device_count")]
    #[case::rows(BatcherBuilder::new().with_rows_per_device(0), "rows_per_device")]
    #[case::columns(BatcherBuilder::new().with_columns_per_row(0), "columns_per_row")]
    #[case::negative_gradient(BatcherBuilder::new().with_gradient_width(-1.0), "gradient_width")]
    #[case::nan_gradient(BatcherBuilder::new().with_gradient_width(f64::NAN), "gradient_width")]
    #[case::negative_forced(
        BatcherBuilder::new().with_primary_thresholds(-0.5, 300.0),
        "forced_primary_distance"
    )]
    #[case::infinite_forced(
        BatcherBuilder::new().with_secondary_thresholds(f64::INFINITY, f64::INFINITY),
        "forced_secondary_distance"
    )]
    #[case::nan_prevented(
        BatcherBuilder::new().with_primary_thresholds(30.0, f64::NAN),
        "prevented_primary_distance"
    )]
    #[case::inverted(
        BatcherBuilder::new().with_secondary_thresholds(3.0, 0.3),
        "prevented_secondary_distance"
    )]
    fn rejects_invalid_fields(#[case] builder: BatcherBuilder, #[case] expected: &str) {
        let err = builder.build().expect_err("configuration must be rejected");
        match err {
            BatchError::InvalidConfig { field, .. } => assert_eq!(field, expected),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn accepts_unbounded_prevented_distance() {
        let thresholds = Thresholds::new(0.0, f64::INFINITY).expect("infinite cut-off is valid");
        assert_eq!(thresholds.prevented_distance(), f64::INFINITY);
    }

    #[test]
    fn slots_per_device_multiplies_rows_and_columns() {
        let batcher = BatcherBuilder::new()
            .with_rows_per_device(2)
            .with_columns_per_row(3)
            .build()
            .expect("valid configuration");
        assert_eq!(batcher.config().hardware().slots_per_device().get(), 6);
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    fn stage_rejects_invalid_range_limit(#[case] limit: f64) {
        let stage = StageConfig::new(
            Attribute::Primary,
            NonZeroUsize::MIN,
            NonZeroUsize::MIN,
            Thresholds::new(0.0, 1.0).expect("valid thresholds"),
        );
        assert!(stage.with_range_limit(limit).is_err());
    }

    #[cfg(not(feature = "parallel"))]
    #[test]
    fn parallel_strategy_requires_feature() {
        let err = BatcherBuilder::new()
            .with_execution_strategy(ExecutionStrategy::Parallel)
            .build()
            .expect_err("parallel backend is not compiled in");
        assert!(matches!(err, BatchError::BackendUnavailable { .. }));
    }
}
