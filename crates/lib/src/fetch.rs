//! Download and extract dependency archives.
//!
//! Everything here is a thin composition of [`Cmd`] invocations of external
//! tools (curl, tar, gunzip, bzip2, unzip). Each operation fails closed at the
//! first failing step and leaves whatever was produced so far on disk; nothing
//! is cleaned up.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::archive::{self, ArchiveKind};
use crate::cmd::{Cmd, RunError};
use crate::config::Tools;
use crate::fs::{self, FsError};
use crate::status::Status;

/// How chatty the external tool should be. Has no effect on our own log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
  Quiet,
  Quieter,
  Verbose,
}

#[derive(Debug, Error)]
pub enum FetchError {
  /// An external tool ran but reported failure.
  #[error("command failed with {status}: {command}")]
  CommandFailed { command: String, status: Status },

  #[error("unrecognized archive format: {0}")]
  UnknownFormat(PathBuf),

  #[error("failed to create {path}: {source}")]
  CreateOutput {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read {path}: {source}")]
  ReadDownload {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// SHA256 hash mismatch after download.
  #[error("hash mismatch for {url}: expected {expected}, got {actual}")]
  HashMismatch {
    url: String,
    expected: String,
    actual: String,
  },

  #[error(transparent)]
  Run(#[from] RunError),

  #[error(transparent)]
  Fs(#[from] FsError),
}

/// Runs download and extraction commands with a fixed set of tools.
#[derive(Debug, Clone, Default)]
pub struct Fetcher {
  tools: Tools,
}

impl Fetcher {
  pub fn new(tools: Tools) -> Self {
    Self { tools }
  }

  /// A fetcher using [`Tools::from_env`].
  pub fn from_env() -> Self {
    Self::new(Tools::from_env())
  }

  pub fn tools(&self) -> &Tools {
    &self.tools
  }

  /// Download `url` with redirects followed.
  ///
  /// Without `dest`, curl names the file itself (last URL segment) in the
  /// current directory.
  pub fn download(&self, url: &str, dest: Option<&Path>, verbosity: Option<Verbosity>) -> Result<(), FetchError> {
    let mut cmd = Cmd::new(&self.tools.curl);
    cmd.add("-L").add("--fail");
    match verbosity {
      Some(Verbosity::Verbose) => {
        cmd.add("-v");
      }
      Some(Verbosity::Quiet | Verbosity::Quieter) => {
        cmd.add("-s");
      }
      None => {}
    }
    match dest {
      Some(dest) => cmd.add("-o").add(dest),
      None => cmd.add("-O"),
    };
    cmd.add(url);

    run_checked(&cmd)
  }

  /// Download `url` to `dest` and verify its SHA-256 digest.
  ///
  /// A file with the wrong digest is removed before the error is returned.
  pub fn download_verified(
    &self,
    url: &str,
    dest: &Path,
    sha256: &str,
    verbosity: Option<Verbosity>,
  ) -> Result<(), FetchError> {
    self.download(url, Some(dest), verbosity)?;

    let actual = hash_file(dest).map_err(|source| FetchError::ReadDownload {
      path: dest.to_path_buf(),
      source,
    })?;
    if !actual.eq_ignore_ascii_case(sha256) {
      let _ = std::fs::remove_file(dest);
      return Err(FetchError::HashMismatch {
        url: url.to_string(),
        expected: sha256.to_string(),
        actual,
      });
    }

    debug!(path = %dest.display(), sha256 = %actual, "download verified");
    Ok(())
  }

  /// Extract `archive`, choosing the tool from its suffix.
  ///
  /// Without `dest`, the result lands next to the archive, named after it with
  /// the suffix stripped. Archives produce a directory, which is created when
  /// missing; single compressed files produce a file. Returns the destination.
  pub fn extract(
    &self,
    archive: &Path,
    dest: Option<&Path>,
    verbosity: Option<Verbosity>,
  ) -> Result<PathBuf, FetchError> {
    let detected = archive::detect(archive).ok_or_else(|| FetchError::UnknownFormat(archive.to_path_buf()))?;
    let kind = detected.kind;
    let target = dest.map_or_else(|| detected.default_destination(archive), Path::to_path_buf);
    debug!(archive = %archive.display(), kind = %kind, dest = %target.display(), "extracting");

    match kind {
      ArchiveKind::TarGz | ArchiveKind::TarBz2 => {
        fs::mkdir(&target)?;
        let mut cmd = Cmd::new(&self.tools.tar);
        cmd.add("-x").add(if kind == ArchiveKind::TarGz { "-z" } else { "-j" });
        if verbosity == Some(Verbosity::Verbose) {
          cmd.add("-v");
        }
        cmd.add("-f").add(archive).add("-C").add(&target);
        run_checked(&cmd)?;
      }
      ArchiveKind::Zip => {
        fs::mkdir(&target)?;
        let mut cmd = Cmd::new(&self.tools.unzip);
        match verbosity {
          Some(Verbosity::Quiet) => {
            cmd.add("-q");
          }
          Some(Verbosity::Quieter) => {
            cmd.add("-qq");
          }
          Some(Verbosity::Verbose) | None => {}
        }
        cmd.add(archive).add("-d").add(&target);
        run_checked(&cmd)?;
      }
      ArchiveKind::Gz | ArchiveKind::Bz2 => {
        let mut cmd = if kind == ArchiveKind::Gz {
          Cmd::new(&self.tools.gunzip)
        } else {
          let mut cmd = Cmd::new(&self.tools.bzip2);
          cmd.add("-d");
          cmd
        };
        match verbosity {
          Some(Verbosity::Verbose) => {
            cmd.add("-v");
          }
          Some(Verbosity::Quiet | Verbosity::Quieter) => {
            cmd.add("-q");
          }
          None => {}
        }
        cmd.add("-k");

        if dest.is_some() {
          // The tool can only pick its own output name, so stream to stdout
          // and write the file ourselves.
          cmd.add("-c").add(archive);
          let mut file = File::create(&target).map_err(|source| FetchError::CreateOutput {
            path: target.clone(),
            source,
          })?;
          let status = cmd.run_sync_capture(&mut file)?;
          check(&cmd, status)?;
        } else {
          cmd.add(archive);
          run_checked(&cmd)?;
        }
      }
    }

    Ok(target)
  }

  /// Download `url` and extract it into the directory `dest`.
  ///
  /// The archive is saved under the name of the URL's last path segment in
  /// the current directory. Without `dest`, extraction follows the
  /// [`extract`](Self::extract) default. Returns the extracted path.
  pub fn download_and_extract(
    &self,
    url: &str,
    dest: Option<&Path>,
    verbosity: Option<Verbosity>,
  ) -> Result<PathBuf, FetchError> {
    let filename = url_to_filename(url);
    let archive = PathBuf::from(&filename);
    let detected = archive::detect(&archive).ok_or_else(|| FetchError::UnknownFormat(archive.clone()))?;

    info!(url = %url, file = %filename, kind = %detected.kind, "downloading archive");
    self.download(url, Some(&archive), verbosity)?;

    let Some(dest) = dest else {
      return self.extract(&archive, None, verbosity);
    };

    // Archives create their own destination; a single file needs its
    // parent directory first.
    if detected.kind.produces_directory() {
      self.extract(&archive, Some(dest), verbosity)
    } else {
      fs::mkdir(dest)?;
      self.extract(&archive, Some(&dest.join(&detected.base)), verbosity)
    }
  }
}

/// [`Fetcher::download`] with tools from the environment.
pub fn download(url: &str, dest: Option<&Path>, verbosity: Option<Verbosity>) -> Result<(), FetchError> {
  Fetcher::from_env().download(url, dest, verbosity)
}

/// [`Fetcher::extract`] with tools from the environment.
pub fn extract(archive: &Path, dest: Option<&Path>, verbosity: Option<Verbosity>) -> Result<PathBuf, FetchError> {
  Fetcher::from_env().extract(archive, dest, verbosity)
}

/// [`Fetcher::download_and_extract`] with tools from the environment.
pub fn download_and_extract(
  url: &str,
  dest: Option<&Path>,
  verbosity: Option<Verbosity>,
) -> Result<PathBuf, FetchError> {
  Fetcher::from_env().download_and_extract(url, dest, verbosity)
}

fn run_checked(cmd: &Cmd) -> Result<(), FetchError> {
  let status = cmd.run_sync()?;
  check(cmd, status)
}

fn check(cmd: &Cmd, status: Status) -> Result<(), FetchError> {
  if status.success() {
    Ok(())
  } else {
    Err(FetchError::CommandFailed {
      command: cmd.to_string(),
      status,
    })
  }
}

/// Compute SHA256 hash of a file.
fn hash_file(path: &Path) -> io::Result<String> {
  let mut file = File::open(path)?;
  let mut hasher = Sha256::new();
  let mut buf = [0u8; 8192];
  loop {
    let n = file.read(&mut buf)?;
    if n == 0 {
      break;
    }
    hasher.update(&buf[..n]);
  }
  Ok(hex::encode(hasher.finalize()))
}

/// Convert a URL to a safe filename.
///
/// Takes the last path component and sanitizes it. Falls back to hash of URL
/// if no suitable filename can be extracted.
pub fn url_to_filename(url: &str) -> String {
  let path = url.split(['?', '#']).next().unwrap_or(url);

  if let Some(filename) = path.rsplit('/').next() {
    // Sanitize: only allow alphanumeric, dash, underscore, dot
    let sanitized: String = filename
      .chars()
      .map(|c| {
        if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
          c
        } else {
          '_'
        }
      })
      .collect();

    if !sanitized.is_empty() && sanitized != "." && sanitized != ".." {
      return sanitized;
    }
  }

  // Fallback: hash the URL
  let mut hasher = Sha256::new();
  hasher.update(url.as_bytes());
  format!("download_{}", &hex::encode(hasher.finalize())[..16])
}
