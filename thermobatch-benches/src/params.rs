//! Benchmark parameter types.

use std::fmt;

/// Parameters for a full batching run.
#[derive(Clone, Debug)]
pub struct BatchBenchParams {
    /// Number of operations in the input.
    pub operation_count: usize,
    /// Whether representation checks run after every merge.
    pub checked: bool,
}

impl fmt::Display for BatchBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.checked {
            write!(f, "n={},checked", self.operation_count)
        } else {
            write!(f, "n={}", self.operation_count)
        }
    }
}

/// Parameters for a single-stage clustering run.
#[derive(Clone, Debug)]
pub struct StageBenchParams {
    /// Number of operations in the input.
    pub operation_count: usize,
    /// Target cluster count of the stage.
    pub capacity: usize,
}

impl fmt::Display for StageBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},k={}", self.operation_count, self.capacity)
    }
}
