//! Command-line interface for batching operations onto thermocyclers.
//!
//! The `batch` command loads operations from a JSON file, runs the two-stage
//! batcher and renders the resulting plan.

mod commands;
mod input;

pub use commands::{
    AssignmentRow, BatchCommand, BatchSummary, Cli, CliError, Command, DeviceSummary, RowSummary,
    render_plan, run_cli,
};
pub use input::{OperationRecord, RecordId, read_operations};
