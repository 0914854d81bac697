//! Normalized process outcome.

use std::fmt;
use std::process::ExitStatus;

use serde::Serialize;

use crate::consts::ABNORMAL_EXIT;

/// How a child process ended.
///
/// `code()` folds this into a single integer: the exit code for a normal exit,
/// and [`ABNORMAL_EXIT`] for everything else. Exit codes on Unix are 0..=255,
/// so the sentinel never collides with a real code there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Status {
  /// The child exited on its own with this code.
  Exited { code: i32 },
  /// The child was terminated by a signal.
  Signaled { signal: i32 },
  /// The program could not be started (not found, not executable, or the
  /// working directory could not be entered).
  LaunchFailed,
}

impl Status {
  pub fn code(self) -> i32 {
    match self {
      Status::Exited { code } => code,
      Status::Signaled { .. } | Status::LaunchFailed => ABNORMAL_EXIT,
    }
  }

  pub fn success(self) -> bool {
    self.code() == 0
  }

  pub fn is_abnormal(self) -> bool {
    !matches!(self, Status::Exited { .. })
  }
}

impl From<ExitStatus> for Status {
  fn from(status: ExitStatus) -> Self {
    if let Some(code) = status.code() {
      return Status::Exited { code };
    }

    #[cfg(unix)]
    {
      use std::os::unix::process::ExitStatusExt;
      if let Some(signal) = status.signal() {
        return Status::Signaled { signal };
      }
    }

    // Stopped/continued states are never returned by a blocking wait; treat
    // anything else without an exit code as abnormal.
    Status::Signaled { signal: 0 }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Status::Exited { code } => write!(f, "exit code {}", code),
      Status::Signaled { signal } => write!(f, "terminated by signal {}", signal),
      Status::LaunchFailed => f.write_str("failed to launch"),
    }
  }
}
