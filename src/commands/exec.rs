use super::check_outcome;
use crate::config::Config;
use anyhow::{Context, Result};
use mediaforged_av::interprocess::{CancelAction, ChildProcessSpec, CommandExecutor, OutputRedirect};
use mediaforged_av::TracingLogSink;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Run `program` with `args`, copying its stdout byte for byte to ours and
/// logging its stderr. A cancellation request kills it.
pub fn run(config: &Config, program: &Path, args: &[String]) -> Result<()> {
    let program = resolve_program(program)?;
    let name = program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string());

    let mut stdout = io::stdout();
    let mut write_error: Option<io::Error> = None;
    let outcome = CommandExecutor::new(ChildProcessSpec::from_args(&program, args))
        .stdout(OutputRedirect::binary(|chunk| {
            if write_error.is_none() {
                if let Err(e) = stdout.write_all(chunk) {
                    write_error = Some(e);
                }
            }
        }))
        .stderr(OutputRedirect::text(|line| tracing::info!("{}", line)))
        .cancel_action(CancelAction::Kill)
        .watchdog_timings(config.execution.watchdog_timings())
        .log_sink(&TracingLogSink)
        .execute()?;

    match write_error {
        Some(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
        Some(e) => return Err(e).context("Failed to write to stdout"),
        None => io::stdout().flush().context("Failed to write to stdout")?,
    }

    check_outcome(&name, outcome)
}

/// Bare names are looked up on `PATH`; anything with a directory part is
/// used as given.
fn resolve_program(program: &Path) -> Result<PathBuf> {
    if program.components().count() > 1 {
        return Ok(program.to_path_buf());
    }
    which::which(program).with_context(|| format!("Program not found on PATH: {:?}", program))
}
