//! Benchmark setup error type.

use thermobatch_core::BatchError;

use crate::source::SyntheticError;

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Synthetic operation generation failed.
    #[error("synthetic operation generation failed: {0}")]
    Synthetic(#[from] SyntheticError),
    /// Batcher configuration or a clustering run failed.
    #[error("batching failed: {0}")]
    Batch(#[from] BatchError),
    /// A zero value was passed where a non-zero integer was required.
    #[error("expected a non-zero value for {context}")]
    ZeroValue {
        /// The parameter that was unexpectedly zero.
        context: &'static str,
    },
}
