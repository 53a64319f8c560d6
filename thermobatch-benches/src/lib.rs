//! Benchmark support crate for thermobatch.
//!
//! Provides seeded synthetic operation lists and parameter types used by the
//! Criterion benchmarks for a single clustering stage and for full two-stage
//! batching.

pub mod error;
pub mod params;
pub mod source;
