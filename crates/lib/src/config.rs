//! External tool configuration.
//!
//! Every external program the core runs is resolved by name through `PATH`.
//! The names can be overridden per variable, e.g. `NOB_CURL=/opt/curl/bin/curl`.
//! Unset or empty variables fall back to the plain tool name.

use serde::Serialize;

use crate::consts::{ENV_BZIP2, ENV_CARGO, ENV_CURL, ENV_GUNZIP, ENV_RUSTC, ENV_RUSTFLAGS, ENV_TAR, ENV_UNZIP};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tools {
  /// Rebuilds scripts that were themselves built by cargo.
  pub cargo: String,
  /// Compiler for scripts built directly with rustc.
  pub rustc: String,
  /// Extra flags appended to the rustc rebuild command. A script that uses
  /// this crate needs `--extern nob_lib=<rlib>` and `-L dependency=<dir>` here.
  pub rustflags: Vec<String>,
  pub curl: String,
  pub tar: String,
  pub gunzip: String,
  pub bzip2: String,
  pub unzip: String,
}

impl Default for Tools {
  fn default() -> Self {
    Self {
      cargo: "cargo".to_string(),
      rustc: "rustc".to_string(),
      rustflags: Vec::new(),
      curl: "curl".to_string(),
      tar: "tar".to_string(),
      gunzip: "gunzip".to_string(),
      bzip2: "bzip2".to_string(),
      unzip: "unzip".to_string(),
    }
  }
}

impl Tools {
  /// Defaults with environment overrides applied.
  pub fn from_env() -> Self {
    let defaults = Self::default();
    Self {
      cargo: env_or(ENV_CARGO, defaults.cargo),
      rustc: env_or(ENV_RUSTC, defaults.rustc),
      rustflags: std::env::var(ENV_RUSTFLAGS)
        .map(|flags| flags.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default(),
      curl: env_or(ENV_CURL, defaults.curl),
      tar: env_or(ENV_TAR, defaults.tar),
      gunzip: env_or(ENV_GUNZIP, defaults.gunzip),
      bzip2: env_or(ENV_BZIP2, defaults.bzip2),
      unzip: env_or(ENV_UNZIP, defaults.unzip),
    }
  }
}

fn env_or(var: &str, default: String) -> String {
  match std::env::var(var) {
    Ok(value) if !value.trim().is_empty() => value,
    _ => default,
  }
}
