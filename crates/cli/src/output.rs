//! How nob reports what a subcommand did.
//!
//! Text reports are a single line on stderr, since stdout belongs to the
//! children of `run` and `capture`. JSON reports are the only thing nob
//! itself writes to stdout.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use nob_lib::archive::ArchiveKind;
use nob_lib::{Cmd, Status};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

/// The outcome of a subcommand, printable as one text line or one JSON object.
pub trait Report: Serialize {
  fn ok(&self) -> bool;
  fn summary(&self) -> String;
}

/// One child process that ran to completion (or failed to launch).
#[derive(Debug, Serialize)]
pub struct RunReport {
  pub command: String,
  pub status: Status,
  pub code: i32,
  pub elapsed_ms: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub captured_bytes: Option<u64>,
}

impl RunReport {
  pub fn new(cmd: &Cmd, status: Status, elapsed: Duration) -> Self {
    Self {
      command: cmd.to_string(),
      status,
      code: status.code(),
      elapsed_ms: elapsed.as_millis() as u64,
      captured_bytes: None,
    }
  }

  pub fn captured(mut self, bytes: u64) -> Self {
    self.captured_bytes = Some(bytes);
    self
  }
}

impl Report for RunReport {
  fn ok(&self) -> bool {
    self.status.success()
  }

  fn summary(&self) -> String {
    let mut line = format!("{}: {} after {}ms", self.command, self.status, self.elapsed_ms);
    if let Some(bytes) = self.captured_bytes {
      line.push_str(&format!(", captured {} bytes", bytes));
    }
    line
  }
}

/// Something moved from `source` to `dest` by download, extract or fetch.
#[derive(Debug, Serialize)]
pub struct TransferReport {
  pub action: &'static str,
  pub source: String,
  pub dest: PathBuf,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub kind: Option<ArchiveKind>,
}

impl Report for TransferReport {
  fn ok(&self) -> bool {
    true
  }

  fn summary(&self) -> String {
    format!("{} {} -> {}", self.action, self.source, self.dest.display())
  }
}

#[derive(Debug, Serialize)]
pub struct MkdirReport {
  pub path: PathBuf,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl Report for MkdirReport {
  fn ok(&self) -> bool {
    self.error.is_none()
  }

  fn summary(&self) -> String {
    match &self.error {
      Some(error) => error.clone(),
      None => format!("{} is ready", self.path.display()),
    }
  }
}

pub fn emit<R: Report>(format: OutputFormat, report: &R) -> anyhow::Result<()> {
  match format {
    OutputFormat::Json => print_json(report),
    OutputFormat::Text => {
      eprintln!("{}", text_line(report));
      Ok(())
    }
  }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
  println!("{}", json);
  Ok(())
}

fn text_line<R: Report>(report: &R) -> String {
  if report.ok() {
    format!("{} {}", "ok".if_supports_color(Stream::Stderr, |s| s.green()), report.summary())
  } else {
    let summary = report.summary();
    format!(
      "{} {}",
      "failed".if_supports_color(Stream::Stderr, |s| s.red()),
      summary.if_supports_color(Stream::Stderr, |s| s.red())
    )
  }
}
