//! Command implementations and argument parsing for the thermobatch CLI.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use thermobatch_core::{
    BatchError, BatchPlan, BatcherBuilder, DEFAULT_COLUMNS_PER_ROW, DEFAULT_DEVICE_COUNT,
    DEFAULT_FORCED_PRIMARY_DISTANCE, DEFAULT_FORCED_SECONDARY_DISTANCE, DEFAULT_GRADIENT_WIDTH,
    DEFAULT_PREVENTED_PRIMARY_DISTANCE, DEFAULT_PREVENTED_SECONDARY_DISTANCE,
    DEFAULT_ROWS_PER_DEVICE, ExecutionStrategy, HardwareProfile, Operation,
};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

use super::input::{RecordId, read_operations};

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "thermobatch",
    about = "Batch PCR reactions onto thermocycler devices and rows."
)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Cluster operations from a JSON file into devices and rows.
    Batch(BatchCommand),
}

/// Options accepted by the `batch` command.
#[derive(Debug, Args, Clone)]
pub struct BatchCommand {
    /// JSON file holding an array of `{id, extension_time, anneal_temp}`.
    pub path: PathBuf,

    /// Number of thermocyclers available.
    #[arg(long, default_value_t = DEFAULT_DEVICE_COUNT)]
    pub devices: usize,

    /// Rows per thermocycler block.
    #[arg(long, default_value_t = DEFAULT_ROWS_PER_DEVICE)]
    pub rows: usize,

    /// Reaction slots per row.
    #[arg(long, default_value_t = DEFAULT_COLUMNS_PER_ROW)]
    pub columns: usize,

    /// Annealing temperature span one gradient can cover.
    #[arg(long = "gradient-width", default_value_t = DEFAULT_GRADIENT_WIDTH)]
    pub gradient_width: f64,

    /// Extension-time difference under which reactions always share a device.
    #[arg(long = "forced-extension", default_value_t = DEFAULT_FORCED_PRIMARY_DISTANCE)]
    pub forced_extension: f64,

    /// Extension-time difference at which reactions never share a device.
    #[arg(long = "prevented-extension", default_value_t = DEFAULT_PREVENTED_PRIMARY_DISTANCE)]
    pub prevented_extension: f64,

    /// Annealing difference under which reactions always share a row.
    #[arg(long = "forced-anneal", default_value_t = DEFAULT_FORCED_SECONDARY_DISTANCE)]
    pub forced_anneal: f64,

    /// Annealing difference at which reactions never share a row.
    #[arg(long = "prevented-anneal", default_value_t = DEFAULT_PREVENTED_SECONDARY_DISTANCE)]
    pub prevented_anneal: f64,

    /// Verify internal invariants after every merge.
    #[arg(long = "check-representation")]
    pub check_representation: bool,

    /// Cluster rows on the calling thread.
    #[arg(long)]
    pub sequential: bool,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The input file could not be opened.
    #[error("failed to open `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The input file was not a JSON array of operation records.
    #[error("failed to parse `{path}`: {source}")]
    Parse {
        /// Path of the malformed file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// Configuration or batching failed.
    #[error(transparent)]
    Core(#[from] BatchError),
}

/// One row of a device in the rendered plan.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSummary {
    /// Mean annealing temperature of the row.
    pub anneal_mean: f64,
    /// Identifiers of the reactions in the row.
    pub ids: Vec<String>,
}

/// One device in the rendered plan.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSummary {
    /// Shortest extension time on the device.
    pub extension_min: f64,
    /// Longest extension time on the device.
    pub extension_max: f64,
    /// Lowest annealing temperature on the device.
    pub anneal_min: f64,
    /// Highest annealing temperature on the device.
    pub anneal_max: f64,
    /// Rows in plan order.
    pub rows: Vec<RowSummary>,
}

/// Device and row labels for one input record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRow {
    /// Identifier of the record.
    pub id: String,
    /// Device group, counted from zero.
    pub device: usize,
    /// Row group within the device, counted from zero.
    pub row: usize,
}

/// Owned rendering of a batch plan.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    /// Name of the input, derived from its file stem.
    pub source: String,
    /// Whether the plan needs more devices or rows than configured.
    pub overflow: bool,
    /// Devices in plan order.
    pub devices: Vec<DeviceSummary>,
    /// One entry per input record, in input order.
    pub assignments: Vec<AssignmentRow>,
}

impl BatchSummary {
    fn from_plan(source: String, plan: &BatchPlan<'_, RecordId>, hardware: &HardwareProfile) -> Self {
        let devices = plan
            .devices()
            .iter()
            .map(|batch| {
                let device = batch.device();
                DeviceSummary {
                    extension_min: device.min(),
                    extension_max: device.max(),
                    anneal_min: device.stats().cross_min(),
                    anneal_max: device.stats().cross_max(),
                    rows: batch
                        .rows()
                        .iter()
                        .map(|row| RowSummary {
                            anneal_mean: row.mean(),
                            ids: row.ids().map(ToString::to_string).collect(),
                        })
                        .collect(),
                }
            })
            .collect();
        let assignments = plan
            .assignments()
            .into_iter()
            .map(|slot| AssignmentRow {
                id: slot.id.to_string(),
                device: slot.device,
                row: slot.row,
            })
            .collect();
        Self {
            source,
            overflow: plan.overflows(hardware),
            devices,
            assignments,
        }
    }
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when the input cannot be read or batching fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use clap::Parser;
/// # use thermobatch_cli::cli::{Cli, run_cli};
/// # use tempfile::NamedTempFile;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let file = NamedTempFile::new()?;
/// std::fs::write(
///     file.path(),
///     r#"[{"id": 1, "extension_time": 60, "anneal_temp": 69},
///         {"id": 2, "extension_time": 60, "anneal_temp": 72}]"#,
/// )?;
/// let path = file.path().to_str().expect("utf-8 temp path");
/// let summary = run_cli(Cli::try_parse_from(["thermobatch", "batch", path])?)?;
/// assert_eq!(summary.devices.len(), 1);
/// assert_eq!(summary.assignments.len(), 2);
/// # Ok(())
/// # }
/// ```
#[instrument(name = "cli.run", err, skip(cli), fields(command = field::Empty))]
pub fn run_cli(cli: Cli) -> Result<BatchSummary, CliError> {
    match cli.command {
        Command::Batch(batch) => {
            Span::current().record("command", field::display("batch"));
            run_batch(batch)
        }
    }
}

#[instrument(
    name = "cli.batch",
    err,
    skip(command),
    fields(path = %command.path.display(), operations = field::Empty, devices = command.devices),
)]
pub(super) fn run_batch(command: BatchCommand) -> Result<BatchSummary, CliError> {
    let strategy = if command.sequential {
        ExecutionStrategy::Sequential
    } else {
        ExecutionStrategy::Auto
    };
    let batcher = BatcherBuilder::new()
        .with_device_count(command.devices)
        .with_rows_per_device(command.rows)
        .with_columns_per_row(command.columns)
        .with_gradient_width(command.gradient_width)
        .with_primary_thresholds(command.forced_extension, command.prevented_extension)
        .with_secondary_thresholds(command.forced_anneal, command.prevented_anneal)
        .with_representation_checks(command.check_representation)
        .with_execution_strategy(strategy)
        .build()?;

    let operations = load_operations(&command.path)?;
    Span::current().record("operations", operations.len());

    let plan = batcher.batch(&operations)?;
    let summary = BatchSummary::from_plan(
        source_name(&command.path),
        &plan,
        &batcher.config().hardware(),
    );
    info!(
        source = summary.source.as_str(),
        devices = summary.devices.len(),
        overflow = summary.overflow,
        "command completed"
    );
    Ok(summary)
}

#[instrument(name = "cli.load_operations", err)]
pub(super) fn load_operations(path: &Path) -> Result<Vec<Operation<RecordId>>, CliError> {
    let file = File::open(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_operations(BufReader::new(file)).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub(super) fn source_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|value| value.to_str())
        .map_or_else(|| "operations".to_owned(), ToOwned::to_owned)
}

/// Renders `summary` to `writer` in a human-readable text format.
///
/// Each device is listed with its extension and annealing ranges, followed by
/// its rows. The plan ends with one `id<TAB>device<TAB>row` line per input
/// record.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use thermobatch_cli::cli::{AssignmentRow, BatchSummary, DeviceSummary, RowSummary, render_plan};
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let summary = BatchSummary {
///     source: "demo".into(),
///     overflow: false,
///     devices: vec![DeviceSummary {
///         extension_min: 60.0,
///         extension_max: 62.0,
///         anneal_min: 69.0,
///         anneal_max: 69.0,
///         rows: vec![RowSummary { anneal_mean: 69.0, ids: vec!["a".into()] }],
///     }],
///     assignments: vec![AssignmentRow { id: "a".into(), device: 0, row: 0 }],
/// };
/// let mut buffer = Vec::new();
/// render_plan(&summary, &mut buffer)?;
/// assert!(String::from_utf8(buffer)?.ends_with("a\t0\t0\n"));
/// # Ok(())
/// # }
/// ```
pub fn render_plan(summary: &BatchSummary, mut writer: impl Write) -> io::Result<()> {
    writeln!(writer, "source: {}", summary.source)?;
    writeln!(writer, "devices: {}", summary.devices.len())?;
    if summary.overflow {
        writeln!(writer, "warning: plan exceeds the configured hardware")?;
    }
    for (index, device) in summary.devices.iter().enumerate() {
        writeln!(
            writer,
            "device {index}: extension {:.1}-{:.1}, anneal {:.1}-{:.1}",
            device.extension_min, device.extension_max, device.anneal_min, device.anneal_max
        )?;
        for (row_index, row) in device.rows.iter().enumerate() {
            writeln!(
                writer,
                "  row {row_index}: anneal {:.1} [{}]",
                row.anneal_mean,
                row.ids.join(", ")
            )?;
        }
    }
    for assignment in &summary.assignments {
        writeln!(
            writer,
            "{}\t{}\t{}",
            assignment.id, assignment.device, assignment.row
        )?;
    }
    Ok(())
}
