use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use nob_lib::fs;

use crate::output::{MkdirReport, OutputFormat, Report, emit};

pub fn cmd_mkdir(path: &Path, output: OutputFormat) -> Result<ExitCode> {
  let report = MkdirReport {
    path: path.to_path_buf(),
    error: fs::mkdir(path).err().map(|e| e.to_string()),
  };
  emit(output, &report)?;
  Ok(if report.ok() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
