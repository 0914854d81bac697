//! Filesystem helpers for build scripts.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;
use tracing::debug;

use crate::log;

static PROJECT_ROOT: OnceLock<PathBuf> = OnceLock::new();

#[derive(Debug, Error)]
pub enum FsError {
  /// A directory was required but something else occupies the path.
  #[error("{0} exists and is not a directory")]
  NotADirectory(PathBuf),

  #[error("failed to create directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to change directory to {path}: {source}")]
  ChangeDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to remove {path}: {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Create `path` and any missing parents.
///
/// Succeeds without doing anything when `path` is already a directory, and
/// fails with [`FsError::NotADirectory`] when a file occupies it. Both answers
/// are stable across repeated calls.
pub fn mkdir(path: impl AsRef<Path>) -> Result<(), FsError> {
  let path = path.as_ref();

  if path.exists() {
    if path.is_dir() {
      debug!(path = %path.display(), "directory already exists");
      log::info(format_args!("{} already exists, not creating", path.display()));
      return Ok(());
    }
    return Err(FsError::NotADirectory(path.to_path_buf()));
  }

  debug!(path = %path.display(), "creating directory");
  match std::fs::create_dir_all(path) {
    Ok(()) => Ok(()),
    // A parent component is a regular file.
    Err(_) if path.ancestors().skip(1).any(|p| p.is_file()) => Err(FsError::NotADirectory(path.to_path_buf())),
    Err(source) => Err(FsError::CreateDir {
      path: path.to_path_buf(),
      source,
    }),
  }
}

/// Change the working directory of the whole build script.
///
/// Prefer [`Cmd::set_wd`](crate::cmd::Cmd::set_wd) to run a single command
/// elsewhere.
pub fn cd(path: impl AsRef<Path>) -> Result<(), FsError> {
  let path = path.as_ref();
  log::info(format_args!("Changing directory to {}", path.display()));
  std::env::set_current_dir(path).map_err(|source| FsError::ChangeDir {
    path: path.to_path_buf(),
    source,
  })
}

/// Remove a file or a directory tree. Missing paths are not an error.
pub fn remove_recursive(path: impl AsRef<Path>) -> Result<(), FsError> {
  let path = path.as_ref();

  let result = match std::fs::symlink_metadata(path) {
    Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
    Err(err) => Err(err),
    Ok(meta) if meta.is_dir() => {
      log::info(format_args!("Removing {}", path.display()));
      std::fs::remove_dir_all(path)
    }
    Ok(_) => {
      log::info(format_args!("Removing {}", path.display()));
      std::fs::remove_file(path)
    }
  };

  result.map_err(|source| FsError::Remove {
    path: path.to_path_buf(),
    source,
  })
}

/// Record the project root. The first call wins.
pub(crate) fn set_project_root(path: PathBuf) {
  let _ = PROJECT_ROOT.set(path);
}

/// The directory the build script considers its project root.
///
/// This is the directory containing the script's source once the rebuild
/// trampoline has run, and otherwise the working directory at the time of
/// the first call.
pub fn project_root() -> PathBuf {
  PROJECT_ROOT
    .get_or_init(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    .clone()
}
