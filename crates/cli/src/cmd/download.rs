//! Implementation of the `nob download` command.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};

use nob_lib::Verbosity;
use nob_lib::fetch::{Fetcher, url_to_filename};

use crate::output::{OutputFormat, TransferReport, emit};

pub fn cmd_download(url: &str, dest: Option<&Path>, verbosity: Option<Verbosity>, output: OutputFormat) -> Result<ExitCode> {
  Fetcher::from_env()
    .download(url, dest, verbosity)
    .with_context(|| format!("Failed to download {}", url))?;

  let report = TransferReport {
    action: "downloaded",
    source: url.to_string(),
    dest: dest.map_or_else(|| url_to_filename(url).into(), Path::to_path_buf),
    kind: None,
  };
  emit(output, &report)?;
  Ok(ExitCode::SUCCESS)
}
