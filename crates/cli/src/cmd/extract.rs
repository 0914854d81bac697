//! Implementation of the `nob extract` command.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};

use nob_lib::Verbosity;
use nob_lib::archive;
use nob_lib::fetch::Fetcher;

use crate::output::{OutputFormat, TransferReport, emit};

pub fn cmd_extract(path: &Path, dest: Option<&Path>, verbosity: Option<Verbosity>, output: OutputFormat) -> Result<ExitCode> {
  let extracted = Fetcher::from_env()
    .extract(path, dest, verbosity)
    .with_context(|| format!("Failed to extract {}", path.display()))?;

  let report = TransferReport {
    action: "extracted",
    source: path.display().to_string(),
    dest: extracted,
    kind: archive::detect(path).map(|d| d.kind),
  };
  emit(output, &report)?;
  Ok(ExitCode::SUCCESS)
}
