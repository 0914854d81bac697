//! Test utilities for nob-lib.
//!
//! Helpers that build commands relying on a POSIX shell, stand-in tools that
//! record how they were called, and checks for optional external tools.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::cmd::Cmd;

/// A command running `script` through `/bin/sh -c`.
#[cfg(unix)]
pub fn shell(script: &str) -> Cmd {
  let mut cmd = Cmd::new("/bin/sh");
  cmd.add("-c").add(script);
  cmd
}

/// A shell that kills itself with `signal`.
#[cfg(unix)]
pub fn signal_self(signal: i32) -> Cmd {
  shell(&format!("kill -{} $$", signal))
}

/// Whether `program` can be launched. Tests depending on optional tools
/// (curl, bzip2, unzip) return early when this is false.
pub fn tool_available(program: &str) -> bool {
  Command::new(program)
    .arg("--version")
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .status()
    .is_ok()
}

/// An executable at `dir/name` that appends its arguments, one invocation per
/// line, to `dir/name.calls` and exits 0.
#[cfg(unix)]
pub fn recording_tool(dir: &Path, name: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let tool = dir.join(name);
  let calls = dir.join(format!("{}.calls", name));
  std::fs::write(&tool, format!("#!/bin/sh\necho \"$*\" >> '{}'\n", calls.display())).unwrap();
  std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
  tool
}

/// Argument lines recorded by a [`recording_tool`], oldest first.
#[cfg(unix)]
pub fn recorded_calls(tool: &Path) -> Vec<String> {
  let mut calls = tool.as_os_str().to_os_string();
  calls.push(".calls");
  std::fs::read_to_string(calls)
    .unwrap_or_default()
    .lines()
    .map(str::to_string)
    .collect()
}
