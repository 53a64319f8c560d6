//! Entry point of the `thermobatch` binary.
//!
//! Parses arguments, runs the requested command, prints the plan to stdout
//! and maps failures to a non-zero exit code. Logging is set up first so the
//! pipeline can emit structured diagnostics.

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use thermobatch_cli::{
    cli::{Cli, CliError, render_plan, run_cli},
    logging::{self, LoggingError},
};
use tracing::{error, field};

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let summary = run_cli(cli).context("failed to execute command")?;
    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    render_plan(&summary, &mut writer).context("failed to render plan")?;
    writer.flush().context("failed to flush output")?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }

    if let Err(err) = try_main() {
        let core = err
            .downcast_ref::<CliError>()
            .and_then(|cli_error| match cli_error {
                CliError::Core(core) => Some(core),
                _ => None,
            });
        let code_field = core.map(|core| field::display(core.code().as_str()));
        let invariant_field =
            core.and_then(|core| core.invariant_code().map(|code| field::display(code.as_str())));

        error!(
            error = %format!("{err:#}"),
            code = code_field,
            invariant_code = invariant_field,
            "command execution failed"
        );
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

#[expect(
    clippy::print_stderr,
    reason = "Emit one-off diagnostic before tracing is initialized"
)]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialize logging: {err}");
}
