//! Implementation of the `nob capture` command.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::debug;

use nob_lib::Cmd;

use super::exit_code;
use crate::output::{OutputFormat, RunReport, emit};

/// Counts bytes on their way to the real sink.
struct Counting<W> {
  inner: W,
  bytes: u64,
}

impl<W: Write> Write for Counting<W> {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    let n = self.inner.write(buf)?;
    self.bytes += n as u64;
    Ok(n)
  }

  fn flush(&mut self) -> io::Result<()> {
    self.inner.flush()
  }
}

/// Run `argv` with stdout captured into `file`, or passed through to our
/// stdout when no file is given.
pub fn cmd_capture(argv: &[String], cwd: Option<&Path>, file: Option<&Path>, output: OutputFormat) -> Result<ExitCode> {
  let mut cmd = Cmd::default();
  cmd.add_all(argv);
  if let Some(cwd) = cwd {
    cmd.set_wd(cwd);
  }

  let started = Instant::now();
  let (status, bytes) = match file {
    Some(path) => {
      let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
      let mut sink = Counting { inner: file, bytes: 0 };
      let status = cmd.run_sync_capture(&mut sink).context("Failed to capture command output")?;
      (status, sink.bytes)
    }
    None => {
      let mut sink = Counting {
        inner: io::stdout().lock(),
        bytes: 0,
      };
      let status = cmd.run_sync_capture(&mut sink).context("Failed to capture command output")?;
      (status, sink.bytes)
    }
  };

  debug!(status = %status, bytes, "capture finished");

  // Captured bytes own stdout unless they went to a file.
  let format = if file.is_some() { output } else { OutputFormat::Text };
  emit(format, &RunReport::new(&cmd, status, started.elapsed()).captured(bytes))?;
  Ok(exit_code(status))
}
