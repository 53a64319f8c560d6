//! Thermobatch core library.
//!
//! Assigns timed operations to thermocycler devices and rows by running a
//! constrained agglomerative clustering twice: once on the primary value to
//! form device groups, then once per device on the secondary value to form
//! rows.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod batcher;
mod config;
mod distance;
mod error;
mod graph;
mod mst;
mod operation;
mod queue;
mod result;
mod tree;

pub use crate::{
    batcher::{Batcher, MaybeSync},
    config::{
        BatchConfig, BatcherBuilder, DEFAULT_COLUMNS_PER_ROW, DEFAULT_DEVICE_COUNT,
        DEFAULT_FORCED_PRIMARY_DISTANCE, DEFAULT_FORCED_SECONDARY_DISTANCE,
        DEFAULT_GRADIENT_WIDTH, DEFAULT_PREVENTED_PRIMARY_DISTANCE,
        DEFAULT_PREVENTED_SECONDARY_DISTANCE, DEFAULT_ROWS_PER_DEVICE, ExecutionStrategy,
        HardwareProfile, StageConfig, Thresholds,
    },
    distance::{FORBIDDEN, MergeRule, is_forbidden},
    error::{BatchError, BatchErrorCode, InvariantViolation, InvariantViolationCode, Result},
    graph::{ClusterGraph, StopReason},
    operation::{Attribute, MAX_MAGNITUDE, Operation},
    result::{BatchPlan, Cluster, DeviceBatch, SlotAssignment, StageOutcome},
    tree::ClusterStats,
};
