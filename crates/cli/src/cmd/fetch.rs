//! Implementation of the `nob fetch` command.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};

use nob_lib::Verbosity;
use nob_lib::archive;
use nob_lib::fetch::Fetcher;

use crate::output::{OutputFormat, TransferReport, emit};

/// Download an archive and extract it, leaving partial results on failure.
pub fn cmd_fetch(url: &str, dest: Option<&Path>, verbosity: Option<Verbosity>, output: OutputFormat) -> Result<ExitCode> {
  let extracted = Fetcher::from_env()
    .download_and_extract(url, dest, verbosity)
    .with_context(|| format!("Failed to fetch {}", url))?;

  let report = TransferReport {
    action: "fetched",
    source: url.to_string(),
    dest: extracted,
    kind: archive::detect(Path::new(url)).map(|d| d.kind),
  };
  emit(output, &report)?;
  Ok(ExitCode::SUCCESS)
}
