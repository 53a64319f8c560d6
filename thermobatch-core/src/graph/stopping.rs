//! Stopping rule evaluated before every merge.

use std::fmt;

use crate::{
    config::{StageConfig, Thresholds},
    distance::is_forbidden,
};

/// Why a cluster graph stopped merging.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StopReason {
    /// No candidate pairs remain: a single cluster holds every operation.
    QueueExhausted,
    /// Every remaining pair would overflow a size or range limit.
    OnlyForbiddenPairs,
    /// The nearest pair is at or beyond the prevented distance.
    PreventedDistance,
    /// The stage fits its capacity and the nearest pair is not close enough to
    /// force another merge.
    CapacityReached,
}

impl StopReason {
    /// Stable lowercase label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QueueExhausted => "queue_exhausted",
            Self::OnlyForbiddenPairs => "only_forbidden_pairs",
            Self::PreventedDistance => "prevented_distance",
            Self::CapacityReached => "capacity_reached",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum MergeDecision {
    Continue,
    Stop(StopReason),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct StopRule {
    capacity_limit: usize,
    thresholds: Thresholds,
}

impl StopRule {
    pub(crate) const fn for_stage(stage: &StageConfig) -> Self {
        Self {
            capacity_limit: stage.capacity_limit().get(),
            thresholds: stage.thresholds(),
        }
    }

    /// Decides whether the pair at `minimum` may merge while `current_count`
    /// clusters exist.
    ///
    /// Past capacity, merging continues unconditionally unless the prevented
    /// threshold blocks it. At or under capacity, only pairs within the forced
    /// threshold merge.
    pub(crate) fn decide(&self, current_count: usize, minimum: Option<f64>) -> MergeDecision {
        let Some(distance) = minimum else {
            return MergeDecision::Stop(StopReason::QueueExhausted);
        };
        if is_forbidden(distance) {
            return MergeDecision::Stop(StopReason::OnlyForbiddenPairs);
        }
        if distance >= self.thresholds.prevented_distance() {
            return MergeDecision::Stop(StopReason::PreventedDistance);
        }
        if current_count <= self.capacity_limit && distance > self.thresholds.forced_distance() {
            return MergeDecision::Stop(StopReason::CapacityReached);
        }
        MergeDecision::Continue
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use rstest::rstest;

    use super::*;
    use crate::{distance::FORBIDDEN, operation::Attribute};

    fn rule(capacity: usize, forced: f64, prevented: f64) -> StopRule {
        let stage = StageConfig::new(
            Attribute::Primary,
            NonZeroUsize::new(capacity).expect("non-zero capacity"),
            NonZeroUsize::MAX,
            Thresholds::new(forced, prevented).expect("valid thresholds"),
        );
        StopRule::for_stage(&stage)
    }

    #[rstest]
    #[case::empty_queue(10, None, MergeDecision::Stop(StopReason::QueueExhausted))]
    #[case::forbidden(10, Some(FORBIDDEN), MergeDecision::Stop(StopReason::OnlyForbiddenPairs))]
    #[case::prevented_beats_capacity(10, Some(300.0), MergeDecision::Stop(StopReason::PreventedDistance))]
    #[case::over_capacity(10, Some(299.9), MergeDecision::Continue)]
    #[case::at_capacity_far(4, Some(30.5), MergeDecision::Stop(StopReason::CapacityReached))]
    #[case::at_capacity_forced(4, Some(30.0), MergeDecision::Continue)]
    #[case::under_capacity_forced(2, Some(0.0), MergeDecision::Continue)]
    fn follows_threshold_table(
        #[case] current_count: usize,
        #[case] minimum: Option<f64>,
        #[case] expected: MergeDecision,
    ) {
        assert_eq!(rule(4, 30.0, 300.0).decide(current_count, minimum), expected);
    }

    #[test]
    fn unbounded_prevented_distance_still_stops_on_forbidden_pairs() {
        let rule = rule(1, 0.0, f64::INFINITY);
        assert_eq!(rule.decide(5, Some(1.0e9)), MergeDecision::Continue);
        assert_eq!(
            rule.decide(5, Some(FORBIDDEN)),
            MergeDecision::Stop(StopReason::OnlyForbiddenPairs)
        );
    }
}
