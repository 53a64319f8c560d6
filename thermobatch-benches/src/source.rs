//! Seeded synthetic PCR operations for benchmarking.
//!
//! Extension times cluster around a handful of typical programme lengths and
//! annealing temperatures spread over a realistic primer range, so both
//! stages see structure rather than uniform noise.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use thermobatch_core::Operation;

/// Typical extension times, in seconds, that generated operations gather
/// around.
const EXTENSION_CENTRES: [f64; 5] = [45.0, 90.0, 180.0, 360.0, 720.0];

/// Errors that may occur during synthetic operation generation.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum SyntheticError {
    /// The requested operation count was zero.
    #[error("operation count must be greater than zero")]
    ZeroOperations,
}

/// Configuration for synthetic operation generation.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    /// Number of operations to generate.
    pub operation_count: usize,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

/// Generates `config.operation_count` operations identified by their
/// position.
///
/// # Errors
///
/// Returns [`SyntheticError::ZeroOperations`] if `operation_count` is zero.
///
/// # Examples
///
/// ```
/// use thermobatch_benches::source::{SyntheticConfig, generate};
///
/// let config = SyntheticConfig { operation_count: 8, seed: 42 };
/// let operations = generate(&config).expect("valid config");
/// assert_eq!(operations.len(), 8);
/// assert_eq!(*operations[3].id(), 3);
/// ```
pub fn generate(config: &SyntheticConfig) -> Result<Vec<Operation<usize>>, SyntheticError> {
    if config.operation_count == 0 {
        return Err(SyntheticError::ZeroOperations);
    }
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let operations = (0..config.operation_count)
        .map(|id| {
            let centre = EXTENSION_CENTRES[rng.gen_range(0..EXTENSION_CENTRES.len())];
            let extension = centre + rng.gen_range(-15.0..15.0);
            let anneal = rng.gen_range(52.0..72.0);
            Operation::new(id, extension, anneal)
        })
        .collect();
    Ok(operations)
}
