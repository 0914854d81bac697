//! Self-rebuild trampoline.
//!
//! A build script compiled to a binary goes stale as soon as its source is
//! edited. The trampoline runs first thing in `main`: when the source (or any
//! extra watched file) is strictly newer than the running binary, it compiles
//! the source over the binary and replaces the current process with the fresh
//! build, passing the original arguments through. Once it returns, the code
//! executing is at least as new as its source.
//!
//! Scripts built by cargo are rebuilt with `cargo build --bin <name>`, which
//! knows where this crate lives. Scripts compiled by hand with rustc are
//! rebuilt the same way, and need `NOB_RUSTFLAGS` to carry
//! `--extern nob_lib=<rlib> -L dependency=<dir>` if they use this crate.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::{debug, info};

use crate::cmd::{Cmd, RunError};
use crate::config::Tools;
use crate::log;
use crate::status::Status;

#[derive(Debug, Error)]
pub enum RebuildError {
  #[error("failed to locate the running executable: {0}")]
  CurrentExe(#[source] io::Error),

  #[error("failed to read modification time of {path}: {source}")]
  Metadata {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to run the compiler: {0}")]
  Compile(#[from] RunError),

  #[error("rebuild failed with {status}: {command}")]
  CompileFailed { command: String, status: Status },

  #[error("{binary} is still older than its sources after rebuilding")]
  StillStale { binary: PathBuf },

  #[error("failed to restart {binary}: {source}")]
  Restart {
    binary: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// The process-level operations the trampoline depends on.
///
/// [`System`] is the real implementation; tests substitute one that records
/// calls instead of replacing the test process.
pub trait Host {
  fn modified(&self, path: &Path) -> io::Result<SystemTime> {
    std::fs::metadata(path)?.modified()
  }

  fn compile(&mut self, cmd: &Cmd) -> Result<Status, RunError> {
    cmd.run_sync()
  }

  /// Replace the running process with `binary`, passing `args` (including
  /// `args[0]`) unchanged. Only returns on failure.
  fn restart(&mut self, binary: &Path, args: &[OsString]) -> io::Error;
}

/// The running process.
#[derive(Debug, Default)]
pub struct System;

impl Host for System {
  #[cfg(unix)]
  fn restart(&mut self, binary: &Path, args: &[OsString]) -> io::Error {
    use std::os::unix::process::CommandExt;

    let mut command = std::process::Command::new(binary);
    if let Some((arg0, rest)) = args.split_first() {
      command.arg0(arg0).args(rest);
    }
    command.exec()
  }

  /// Without in-place image replacement, run the new binary as a child with
  /// the same arguments and exit with its exact status.
  #[cfg(not(unix))]
  fn restart(&mut self, binary: &Path, args: &[OsString]) -> io::Error {
    let rest = args.get(1..).unwrap_or_default();
    match std::process::Command::new(binary).args(rest).status() {
      Ok(status) => std::process::exit(status.code().unwrap_or(1)),
      Err(err) => err,
    }
  }
}

/// Edition passed to rustc when rebuilding without cargo.
const RUSTC_EDITION: &str = "2024";

/// A cargo binary target, as seen by the crate that expanded
/// [`go_rebuild_urself!`](crate::go_rebuild_urself).
#[derive(Debug, Clone, PartialEq, Eq)]
struct CargoBin {
  manifest_dir: PathBuf,
  name: String,
  release: bool,
}

/// Decides whether the running binary is stale and rebuilds it.
#[derive(Debug, Clone)]
pub struct Trampoline {
  source: PathBuf,
  watched: Vec<PathBuf>,
  binary: Option<PathBuf>,
  compile: Option<Cmd>,
  cargo: Option<CargoBin>,
  tools: Option<Tools>,
}

impl Trampoline {
  /// `source` is the build script's own source file, usually `file!()`.
  pub fn new(source: impl Into<PathBuf>) -> Self {
    Self {
      source: source.into(),
      watched: Vec::new(),
      binary: None,
      compile: None,
      cargo: None,
      tools: None,
    }
  }

  /// Rebuild with `cargo build --bin <name>` for the package in `manifest_dir`.
  ///
  /// `file!()` is relative to the workspace root rather than the package, so
  /// a relative source is looked up in `manifest_dir` and then its ancestors.
  pub fn cargo_bin(mut self, manifest_dir: impl Into<PathBuf>, name: impl Into<String>, release: bool) -> Self {
    let manifest_dir = manifest_dir.into();
    if self.source.is_relative() {
      let found = manifest_dir
        .ancestors()
        .map(|dir| dir.join(&self.source))
        .find(|candidate| candidate.is_file());
      if let Some(found) = found {
        self.source = found;
      }
    }
    self.cargo = Some(CargoBin {
      manifest_dir,
      name: name.into(),
      release,
    });
    self
  }

  /// Use `tools` instead of reading them from the environment.
  pub fn tools(mut self, tools: Tools) -> Self {
    self.tools = Some(tools);
    self
  }

  pub fn source(&self) -> &Path {
    &self.source
  }

  /// Also rebuild when `path` is newer than the binary.
  pub fn watch(mut self, path: impl Into<PathBuf>) -> Self {
    self.watched.push(path.into());
    self
  }

  /// Use `path` as the binary instead of the running executable.
  pub fn binary(mut self, path: impl Into<PathBuf>) -> Self {
    self.binary = Some(path.into());
    self
  }

  /// Replace the default compile command.
  pub fn compile_with(mut self, cmd: Cmd) -> Self {
    self.compile = Some(cmd);
    self
  }

  /// The command used to rebuild `binary`.
  pub fn compile_command(&self, binary: &Path) -> Cmd {
    if let Some(cmd) = &self.compile {
      return cmd.clone();
    }

    let tools = self.tools.clone().unwrap_or_else(Tools::from_env);
    match &self.cargo {
      Some(target) => {
        let mut cmd = Cmd::new(&tools.cargo);
        cmd
          .add("build")
          .add("--manifest-path")
          .add(target.manifest_dir.join("Cargo.toml"))
          .add("--bin")
          .add(&target.name);
        if target.release {
          cmd.add("--release");
        }
        cmd
      }
      None => {
        let mut cmd = Cmd::new(&tools.rustc);
        cmd
          .add("--edition")
          .add(RUSTC_EDITION)
          .add(&self.source)
          .add("-o")
          .add(binary)
          .add_all(&tools.rustflags);
        cmd
      }
    }
  }

  /// Whether any watched source is strictly newer than `binary`.
  pub fn is_stale<H: Host>(&self, host: &H, binary: &Path) -> Result<bool, RebuildError> {
    let binary_time = mtime(host, binary)?;

    for source in std::iter::once(&self.source).chain(&self.watched) {
      let source_time = mtime(host, source)?;
      if source_time > binary_time {
        debug!(source = %source.display(), binary = %binary.display(), "source is newer than binary");
        return Ok(true);
      }
    }
    Ok(false)
  }

  /// Run the trampoline against `host`.
  ///
  /// Returns `Ok(())` when the binary is current. When it is stale, compiles
  /// once and restarts; reaching the end of that path means the restart
  /// failed.
  pub fn run_with<H: Host>(&self, host: &mut H, args: &[OsString]) -> Result<(), RebuildError> {
    let binary = match &self.binary {
      Some(binary) => binary.clone(),
      None => current_exe()?,
    };

    if let Some(root) = self.source.parent() {
      let root = if root.as_os_str().is_empty() { Path::new(".") } else { root };
      crate::fs::set_project_root(dunce::canonicalize(root).unwrap_or_else(|_| root.to_path_buf()));
    }

    if !self.is_stale(host, &binary)? {
      return Ok(());
    }

    log::info("Rebuilding meself");
    let cmd = self.compile_command(&binary);
    let status = host.compile(&cmd)?;
    if !status.success() {
      return Err(RebuildError::CompileFailed {
        command: cmd.to_string(),
        status,
      });
    }

    // cargo leaves a binary alone when it is not its own output, e.g. a copy
    // outside the target dir. Restarting that would loop forever.
    if self.is_stale(host, &binary)? {
      return Err(RebuildError::StillStale { binary });
    }

    info!(binary = %binary.display(), "restarting rebuilt binary");
    let source = host.restart(&binary, args);
    Err(RebuildError::Restart { binary, source })
  }

  /// Run the trampoline for the current process and its arguments.
  pub fn run(&self) -> Result<(), RebuildError> {
    let args: Vec<OsString> = std::env::args_os().collect();
    self.run_with(&mut System, &args)
  }
}

/// Rebuild and restart the running binary if `source` is newer.
///
/// This rebuilds with rustc. The [`go_rebuild_urself!`](crate::go_rebuild_urself)
/// macro passes `file!()`, picks cargo when the script was built by cargo, and
/// exits on failure.
pub fn go_rebuild_urself(source: impl Into<PathBuf>) -> Result<(), RebuildError> {
  Trampoline::new(source).run()
}

fn current_exe() -> Result<PathBuf, RebuildError> {
  let exe = std::env::current_exe().map_err(RebuildError::CurrentExe)?;
  dunce::canonicalize(&exe).map_err(RebuildError::CurrentExe)
}

fn mtime<H: Host>(host: &H, path: &Path) -> Result<SystemTime, RebuildError> {
  host.modified(path).map_err(|source| RebuildError::Metadata {
    path: path.to_path_buf(),
    source,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;
  use std::time::Duration;
  use tracing_test::traced_test;

  #[derive(Debug, Clone, PartialEq, Eq)]
  enum Call {
    Compile(String),
    Restart(PathBuf, Vec<OsString>),
  }

  /// Fake host with fixed modification times that records what would have
  /// happened to the process.
  struct FakeHost {
    times: HashMap<PathBuf, SystemTime>,
    compile_status: Status,
    compile_writes_binary: bool,
    calls: Vec<Call>,
  }

  impl FakeHost {
    fn new(source_secs: u64, binary_secs: u64) -> Self {
      let at = |secs| SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
      let times = HashMap::from([
        (PathBuf::from("build.rs"), at(source_secs)),
        (PathBuf::from("nob"), at(binary_secs)),
      ]);
      Self {
        times,
        compile_status: Status::Exited { code: 0 },
        compile_writes_binary: true,
        calls: Vec::new(),
      }
    }

    fn compiles(&self) -> usize {
      self.calls.iter().filter(|c| matches!(c, Call::Compile(_))).count()
    }
  }

  impl Host for FakeHost {
    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
      self
        .times
        .get(path)
        .copied()
        .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn compile(&mut self, cmd: &Cmd) -> Result<Status, RunError> {
      self.calls.push(Call::Compile(cmd.to_string()));
      if self.compile_status.success() && self.compile_writes_binary {
        self
          .times
          .insert(PathBuf::from("nob"), SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
      }
      Ok(self.compile_status)
    }

    fn restart(&mut self, binary: &Path, args: &[OsString]) -> io::Error {
      self.calls.push(Call::Restart(binary.to_path_buf(), args.to_vec()));
      io::Error::other("restart intercepted")
    }
  }

  fn trampoline() -> Trampoline {
    let mut compile = Cmd::new("rustc");
    compile.add_all(["build.rs", "-o", "nob"]);
    Trampoline::new("build.rs").binary("nob").compile_with(compile)
  }

  fn args() -> Vec<OsString> {
    vec!["./nob".into(), "build".into(), "--release".into()]
  }

  #[test]
  fn stale_binary_compiles_once_then_restarts() {
    let mut host = FakeHost::new(200, 100);

    let result = trampoline().run_with(&mut host, &args());

    assert!(matches!(result, Err(RebuildError::Restart { .. })));
    assert_eq!(
      host.calls,
      vec![
        Call::Compile("rustc build.rs -o nob".to_string()),
        Call::Restart(PathBuf::from("nob"), args()),
      ]
    );
  }

  #[test]
  fn fresh_binary_is_a_no_op() {
    for (source, binary) in [(100, 100), (100, 200)] {
      let mut host = FakeHost::new(source, binary);
      trampoline().run_with(&mut host, &args()).unwrap();
      assert_eq!(host.compiles(), 0);
      assert!(host.calls.is_empty());
    }
  }

  #[test]
  fn failed_compile_never_restarts() {
    let mut host = FakeHost::new(200, 100);
    host.compile_status = Status::Exited { code: 1 };

    let result = trampoline().run_with(&mut host, &args());

    assert!(matches!(
      result,
      Err(RebuildError::CompileFailed {
        status: Status::Exited { code: 1 },
        ..
      })
    ));
    assert_eq!(host.compiles(), 1);
    assert!(!host.calls.iter().any(|c| matches!(c, Call::Restart(..))));
  }

  #[test]
  fn watched_file_triggers_rebuild() {
    let mut host = FakeHost::new(100, 150);
    host
      .times
      .insert(PathBuf::from("nob.toml"), SystemTime::UNIX_EPOCH + Duration::from_secs(300));

    let result = trampoline().watch("nob.toml").run_with(&mut host, &args());

    assert!(matches!(result, Err(RebuildError::Restart { .. })));
    assert_eq!(host.compiles(), 1);
  }

  #[test]
  fn missing_source_is_an_error() {
    let mut host = FakeHost::new(100, 100);
    let result = Trampoline::new("missing.rs").binary("nob").run_with(&mut host, &args());
    assert!(matches!(result, Err(RebuildError::Metadata { path, .. }) if path == Path::new("missing.rs")));
    assert!(host.calls.is_empty());
  }

  #[test]
  fn untouched_binary_is_not_restarted() {
    let mut host = FakeHost::new(200, 100);
    host.compile_writes_binary = false;

    let result = trampoline().run_with(&mut host, &args());

    assert!(matches!(result, Err(RebuildError::StillStale { .. })));
    assert_eq!(host.compiles(), 1);
    assert!(!host.calls.iter().any(|c| matches!(c, Call::Restart(..))));
  }

  #[test]
  fn default_compile_command_uses_rustc() {
    let tools = Tools {
      rustflags: vec!["--extern".into(), "nob_lib=/t/libnob_lib.rlib".into()],
      ..Tools::default()
    };
    let cmd = Trampoline::new("nob.rs").tools(tools).compile_command(Path::new("/tmp/nob"));
    assert_eq!(
      cmd.to_string(),
      "rustc --edition 2024 nob.rs -o /tmp/nob --extern nob_lib=/t/libnob_lib.rlib"
    );
  }

  #[test]
  fn cargo_target_rebuilds_with_cargo() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let package = temp_dir.path().join("scripts");
    std::fs::create_dir_all(package.join("src")).unwrap();
    std::fs::write(package.join("src/nob.rs"), "fn main() {}").unwrap();

    let trampoline = Trampoline::new("src/nob.rs")
      .cargo_bin(&package, "nob", true)
      .tools(Tools::default());

    assert_eq!(trampoline.source(), package.join("src/nob.rs"));
    let expected: Vec<OsString> = vec![
      "cargo".into(),
      "build".into(),
      "--manifest-path".into(),
      package.join("Cargo.toml").into_os_string(),
      "--bin".into(),
      "nob".into(),
      "--release".into(),
    ];
    assert_eq!(trampoline.compile_command(Path::new("/ignored")).tokens(), expected.as_slice());
  }

  #[test]
  fn cargo_source_found_from_workspace_root() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let package = temp_dir.path().join("crates/scripts");
    std::fs::create_dir_all(package.join("src")).unwrap();
    std::fs::write(package.join("src/nob.rs"), "fn main() {}").unwrap();

    // As file!() reports it when cargo compiles from the workspace root.
    let trampoline = Trampoline::new("crates/scripts/src/nob.rs").cargo_bin(&package, "nob", false);

    assert_eq!(trampoline.source(), package.join("src/nob.rs"));
    assert!(!trampoline.compile_command(Path::new("/ignored")).to_string().contains("--release"));
  }

  #[traced_test]
  #[test]
  fn stale_decision_is_traced() {
    let host = FakeHost::new(200, 100);
    assert!(trampoline().is_stale(&host, Path::new("nob")).unwrap());
    assert!(logs_contain("source is newer than binary"));
  }

  #[cfg(unix)]
  #[test]
  fn real_mtimes_from_filesystem() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let source = temp_dir.path().join("build.rs");
    let binary = temp_dir.path().join("build");
    std::fs::write(&source, "fn main() {}").unwrap();
    std::fs::write(&binary, "").unwrap();

    let old = SystemTime::now() - Duration::from_secs(3600);
    std::fs::File::options()
      .write(true)
      .open(&source)
      .unwrap()
      .set_modified(old)
      .unwrap();

    let trampoline = Trampoline::new(&source);
    assert!(!trampoline.is_stale(&System, &binary).unwrap());

    std::fs::File::options()
      .write(true)
      .open(&binary)
      .unwrap()
      .set_modified(old - Duration::from_secs(60))
      .unwrap();
    assert!(trampoline.is_stale(&System, &binary).unwrap());
  }
}
