//! Leveled line logging for build scripts.
//!
//! Every line is written under a single process-wide lock, so lines from
//! concurrent callers never interleave. Info lines go to stdout, warnings and
//! errors to stderr.
//!
//! Known limitation: the one lock also serializes writes to *different*
//! streams (stdout vs stderr) that could safely proceed in parallel. That is
//! fine for a single-threaded build script, and a bottleneck if logging ever
//! happens from many threads at once.
//!
//! These lines are the execution trace a build script user reads. Internal
//! diagnostics go through `tracing` instead.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

static LOG_LOCK: Mutex<()> = Mutex::new(());
static INFO_TO_STDERR: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
  Info,
  Warning,
  Error,
}

impl LogLevel {
  pub fn label(self) -> &'static str {
    match self {
      LogLevel::Info => "[NOB INFO]",
      LogLevel::Warning => "[NOB WARNING]",
      LogLevel::Error => "[NOB ERROR]",
    }
  }
}

impl fmt::Display for LogLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// Route Info lines to stderr instead of stdout.
///
/// Used when stdout carries data (captured output, JSON) that log lines must
/// not corrupt.
pub fn set_info_to_stderr(enabled: bool) {
  INFO_TO_STDERR.store(enabled, Ordering::Relaxed);
}

/// Write one prefixed line to `out` while holding the log lock.
pub fn log_to<W: Write + ?Sized>(out: &mut W, level: LogLevel, message: impl fmt::Display) -> io::Result<()> {
  let _guard = LOG_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
  write!(out, "{} ", level.label())?;
  write!(out, "{}", message)?;
  out.write_all(b"\n")?;
  out.flush()
}

/// Write one prefixed line to the stream for `level`.
///
/// Write failures are ignored: a closed stdout must not abort a build.
pub fn log(level: LogLevel, message: impl fmt::Display) {
  let to_stderr = match level {
    LogLevel::Info => INFO_TO_STDERR.load(Ordering::Relaxed),
    LogLevel::Warning | LogLevel::Error => true,
  };

  let _ = if to_stderr {
    log_to(&mut io::stderr().lock(), level, message)
  } else {
    log_to(&mut io::stdout().lock(), level, message)
  };
}

pub fn info(message: impl fmt::Display) {
  log(LogLevel::Info, message);
}

pub fn warning(message: impl fmt::Display) {
  log(LogLevel::Warning, message);
}

pub fn error(message: impl fmt::Display) {
  log(LogLevel::Error, message);
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::thread;

  /// A writer that forwards one byte per `write` call, making any missing
  /// serialization between callers show up as torn lines.
  #[derive(Clone, Default)]
  struct ByteWriter(Arc<Mutex<Vec<u8>>>);

  impl Write for ByteWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
      let Some(first) = buf.first() else {
        return Ok(0);
      };
      self.0.lock().unwrap().push(*first);
      thread::yield_now();
      Ok(1)
    }

    fn flush(&mut self) -> io::Result<()> {
      Ok(())
    }
  }

  #[test]
  fn line_has_level_prefix() {
    let mut out = Vec::new();
    log_to(&mut out, LogLevel::Info, "hello").unwrap();
    log_to(&mut out, LogLevel::Warning, format_args!("{} {}", "two", 2)).unwrap();
    log_to(&mut out, LogLevel::Error, "boom").unwrap();

    assert_eq!(
      String::from_utf8(out).unwrap(),
      "[NOB INFO] hello\n[NOB WARNING] two 2\n[NOB ERROR] boom\n"
    );
  }

  #[test]
  fn concurrent_lines_do_not_interleave() {
    let writer = ByteWriter::default();

    let handles: Vec<_> = (0..8)
      .map(|t| {
        let mut w = writer.clone();
        thread::spawn(move || {
          for i in 0..50 {
            log_to(&mut w, LogLevel::Info, format!("thread-{}-line-{}", t, i)).unwrap();
          }
        })
      })
      .collect();
    for handle in handles {
      handle.join().unwrap();
    }

    let bytes = writer.0.lock().unwrap().clone();
    let text = String::from_utf8(bytes).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 400);
    for line in lines {
      let rest = line.strip_prefix("[NOB INFO] thread-").expect("torn line");
      let (t, i) = rest.split_once("-line-").expect("torn line");
      assert!(t.parse::<u32>().is_ok() && i.parse::<u32>().is_ok(), "torn line: {line}");
    }
  }

  #[test]
  fn labels_are_distinct() {
    assert_ne!(LogLevel::Info.label(), LogLevel::Warning.label());
    assert_ne!(LogLevel::Warning.label(), LogLevel::Error.label());
    assert_eq!(LogLevel::Error.to_string(), "[NOB ERROR]");
  }
}
