//! Implementation of the `nob run` command.

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::debug;

use nob_lib::Cmd;

use super::exit_code;
use crate::output::{OutputFormat, RunReport, emit};

/// Run `argv` with inherited stdio and exit with the child's status.
pub fn cmd_run(argv: &[String], cwd: Option<&Path>, output: OutputFormat) -> Result<ExitCode> {
  let mut cmd = Cmd::default();
  cmd.add_all(argv);
  if let Some(cwd) = cwd {
    cmd.set_wd(cwd);
  }

  let started = Instant::now();
  let status = cmd.run_sync().context("Failed to run command")?;
  let elapsed = started.elapsed();
  debug!(status = %status, elapsed_ms = elapsed.as_millis() as u64, "command finished");

  emit(output, &RunReport::new(&cmd, status, elapsed))?;
  Ok(exit_code(status))
}
