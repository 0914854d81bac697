//! Command construction and synchronous execution.
//!
//! A [`Cmd`] is an ordered list of tokens (program first) plus an optional
//! working directory. Running it blocks until the child exits and returns a
//! normalized [`Status`]; only failures of the host itself (cannot fork, cannot
//! create a pipe, cannot read from it) are reported as [`RunError`].

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use thiserror::Error;
use tracing::{debug, warn};

use crate::consts::CAPTURE_CHUNK_SIZE;
use crate::log;
use crate::status::Status;

/// Errors that prevent a command from being run or observed at all.
///
/// These indicate the host cannot do its job and there is no status to
/// report. They are meant to end the build: propagate them out of `main`
/// with `?` instead of discarding them, so the script exits non-zero.
#[derive(Debug, Error)]
pub enum RunError {
  #[error("cannot run an empty command")]
  EmptyCommand,

  #[error("failed to spawn {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("no output pipe was created for {program}")]
  Pipe { program: String },

  #[error("failed to read output of {program}: {source}")]
  Read {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("failed to write captured output of {program}: {source}")]
  Sink {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("failed to wait for {program}: {source}")]
  Wait {
    program: String,
    #[source]
    source: io::Error,
  },
}

/// An ordered argument list plus the directory the child should run in.
///
/// One instance can issue many unrelated invocations: call [`Cmd::reset`]
/// between them so no argument or working directory from the previous use
/// leaks into the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cmd {
  tokens: Vec<OsString>,
  working_dir: Option<PathBuf>,
}

impl Cmd {
  pub fn new(program: impl AsRef<OsStr>) -> Self {
    let mut cmd = Self::default();
    cmd.add(program);
    cmd
  }

  /// Append one token.
  pub fn add(&mut self, token: impl AsRef<OsStr>) -> &mut Self {
    self.tokens.push(token.as_ref().to_os_string());
    self
  }

  /// Append several tokens in iteration order.
  pub fn add_all<I, S>(&mut self, tokens: I) -> &mut Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
  {
    self.tokens.extend(tokens.into_iter().map(|t| t.as_ref().to_os_string()));
    self
  }

  /// Set the directory the child runs in. The caller's directory is untouched.
  pub fn set_wd(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
    self.working_dir = Some(dir.into());
    self
  }

  /// Clear all tokens and restore the default working directory.
  pub fn reset(&mut self) -> &mut Self {
    self.tokens.clear();
    self.working_dir = None;
    self
  }

  pub fn tokens(&self) -> &[OsString] {
    &self.tokens
  }

  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  /// The child's working directory; `.` when none was set.
  pub fn working_dir(&self) -> &Path {
    self.working_dir.as_deref().unwrap_or_else(|| Path::new("."))
  }

  fn program(&self) -> String {
    self
      .tokens
      .first()
      .map(|p| p.to_string_lossy().into_owned())
      .unwrap_or_default()
  }

  /// Run the command and wait for it, letting it write to our stdout.
  pub fn run_sync(&self) -> Result<Status, RunError> {
    log::info(format_args!("Running sync: {}", self));

    let mut command = self.command()?;
    let mut child = match command.spawn() {
      Ok(child) => child,
      Err(err) => return self.spawn_failed(err),
    };
    debug!(program = %self.program(), pid = child.id(), "spawned child");

    self.wait(&mut child)
  }

  /// Run the command with its stdout piped into `sink`.
  ///
  /// The pipe is drained while the child is still running, and the child is
  /// only waited for after end-of-stream. Waiting first would deadlock as soon
  /// as the child fills the pipe buffer.
  pub fn run_sync_capture<W: Write + ?Sized>(&self, sink: &mut W) -> Result<Status, RunError> {
    log::info(format_args!("Running sync capture: {}", self));

    let mut command = self.command()?;
    command.stdout(Stdio::piped());
    let mut child = match command.spawn() {
      Ok(child) => child,
      Err(err) => return self.spawn_failed(err),
    };
    debug!(program = %self.program(), pid = child.id(), "spawned child with captured stdout");

    let Some(mut stdout) = child.stdout.take() else {
      kill_and_reap(&mut child);
      return Err(RunError::Pipe {
        program: self.program(),
      });
    };

    let drained = drain(&mut stdout, sink);
    // Close our end so a child still writing sees EPIPE instead of blocking.
    drop(stdout);

    match drained {
      Ok(bytes) => debug!(program = %self.program(), bytes, "drained child stdout"),
      Err(err) => {
        warn!(program = %self.program(), "capture failed, killing child");
        kill_and_reap(&mut child);
        let program = self.program();
        return Err(match err {
          DrainError::Read(source) => RunError::Read { program, source },
          DrainError::Sink(source) => RunError::Sink { program, source },
        });
      }
    }

    self.wait(&mut child)
  }

  fn command(&self) -> Result<Command, RunError> {
    let (program, args) = self.tokens.split_first().ok_or(RunError::EmptyCommand)?;

    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = &self.working_dir {
      log::info(format_args!("Changing working dir to {}", dir.display()));
      command.current_dir(dir);
    }
    Ok(command)
  }

  fn wait(&self, child: &mut Child) -> Result<Status, RunError> {
    let status = child.wait().map_err(|source| RunError::Wait {
      program: self.program(),
      source,
    })?;
    let status = Status::from(status);
    debug!(program = %self.program(), status = %status, "child finished");
    Ok(status)
  }

  fn spawn_failed(&self, err: io::Error) -> Result<Status, RunError> {
    if is_launch_failure(&err) {
      log::error(format_args!("could not launch {}: {}", self.program(), err));
      return Ok(Status::LaunchFailed);
    }
    Err(RunError::Spawn {
      program: self.program(),
      source: err,
    })
  }
}

/// Tokens separated by single spaces, without quoting, so the trace shows
/// exactly what was passed.
impl fmt::Display for Cmd {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, token) in self.tokens.iter().enumerate() {
      if i > 0 {
        f.write_str(" ")?;
      }
      write_token(f, &token.to_string_lossy())?;
    }
    Ok(())
  }
}

/// Single-quote a token when printing it bare would hide where it starts or
/// ends. Embedded single quotes are written as `'\''`.
fn write_token(f: &mut fmt::Formatter<'_>, token: &str) -> fmt::Result {
  let bare = !token.is_empty() && !token.chars().any(|c| c.is_whitespace() || c == '\'' || c == '"');
  if bare {
    return f.write_str(token);
  }
  f.write_str("'")?;
  f.write_str(&token.replace('\'', r"'\''"))?;
  f.write_str("'")
}

/// The target (or its working directory) is missing or not executable. The
/// failure happened inside the child, before it became the target program.
fn is_launch_failure(err: &io::Error) -> bool {
  matches!(
    err.kind(),
    ErrorKind::NotFound | ErrorKind::PermissionDenied | ErrorKind::NotADirectory
  )
}

fn kill_and_reap(child: &mut Child) {
  let _ = child.kill();
  let _ = child.wait();
}

enum DrainError {
  Read(io::Error),
  Sink(io::Error),
}

/// Copy everything from `reader` into `sink` until end-of-stream.
fn drain<R, W>(reader: &mut R, sink: &mut W) -> Result<u64, DrainError>
where
  R: Read + ?Sized,
  W: Write + ?Sized,
{
  let mut buf = [0u8; CAPTURE_CHUNK_SIZE];
  let mut total = 0u64;

  loop {
    let n = match reader.read(&mut buf) {
      Ok(0) => break,
      Ok(n) => n,
      Err(err) if err.kind() == ErrorKind::Interrupted => continue,
      Err(err) => return Err(DrainError::Read(err)),
    };
    sink.write_all(&buf[..n]).map_err(DrainError::Sink)?;
    total += n as u64;
  }

  sink.flush().map_err(DrainError::Sink)?;
  Ok(total)
}
