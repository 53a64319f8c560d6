//! Capacity-aware merge distance.
//!
//! Two clusters may merge only when the result still fits the hardware: its
//! member count must not exceed the stage's pair-size cap, and (when the stage
//! bounds it) the spread of the cross attribute must stay within the range
//! limit. Either overflow alone forbids the merge. Allowed pairs are as far
//! apart as their means on the stage attribute.

use crate::{config::StageConfig, tree::ClusterStats};

/// Distance reported for pairs that must never merge.
///
/// It compares greater than every real distance, never satisfies a forced
/// threshold and always meets a prevented threshold.
pub const FORBIDDEN: f64 = f64::INFINITY;

/// Pairwise distance rule for one stage.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
/// use thermobatch_core::{
///     Attribute, ClusterStats, FORBIDDEN, MergeRule, Operation, StageConfig, Thresholds,
/// };
///
/// let stage = StageConfig::new(
///     Attribute::Primary,
///     NonZeroUsize::new(4).expect("non-zero"),
///     NonZeroUsize::new(96).expect("non-zero"),
///     Thresholds::new(30.0, 300.0).expect("valid thresholds"),
/// )
/// .with_range_limit(17.0)
/// .expect("valid range limit");
/// let rule = MergeRule::for_stage(&stage);
///
/// let warm = ClusterStats::singleton(&Operation::new(1, 770.0, 69.0), Attribute::Primary);
/// let cold = ClusterStats::singleton(&Operation::new(2, 500.0, 41.0), Attribute::Primary);
/// let near = ClusterStats::singleton(&Operation::new(3, 762.0, 72.0), Attribute::Primary);
/// assert_eq!(rule.distance(&warm, &near), 8.0);
/// assert_eq!(rule.distance(&warm, &cold), FORBIDDEN);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeRule {
    pair_size_cap: usize,
    range_limit: Option<f64>,
}

impl MergeRule {
    /// Builds the rule a stage's cluster graph applies.
    #[must_use]
    pub const fn for_stage(stage: &StageConfig) -> Self {
        Self {
            pair_size_cap: stage.pair_size_cap().get(),
            range_limit: stage.range_limit(),
        }
    }

    /// Returns the merge distance between `a` and `b`, or [`FORBIDDEN`].
    #[must_use]
    pub fn distance(&self, a: &ClusterStats, b: &ClusterStats) -> f64 {
        if self.exceeds_size(a, b) || self.exceeds_range(a, b) {
            return FORBIDDEN;
        }
        (a.mean() - b.mean()).abs()
    }

    fn exceeds_size(&self, a: &ClusterStats, b: &ClusterStats) -> bool {
        a.size().saturating_add(b.size()) > self.pair_size_cap
    }

    fn exceeds_range(&self, a: &ClusterStats, b: &ClusterStats) -> bool {
        self.range_limit
            .is_some_and(|limit| a.combined_cross_range(b) > limit)
    }
}

/// Returns `true` when `distance` is the forbidden sentinel.
#[must_use]
pub fn is_forbidden(distance: f64) -> bool {
    distance == FORBIDDEN
}
