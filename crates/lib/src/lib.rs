//! nob-lib: a build-system runtime that lives inside the build script itself.
//!
//! Instead of shelling out to a separate build tool, a build script links this
//! crate and gets:
//! - `Cmd`: an argument-list builder with synchronous run and stdout capture
//! - `rebuild`: a trampoline that recompiles and restarts a stale script binary
//! - `fetch`: download and extract dependency archives by compound extension
//! - `log` and `fs`: leveled line logging and small filesystem helpers
//!
//! Failures of the host itself (a child cannot be spawned, a pipe cannot be
//! read) come back as errors rather than statuses. Propagate them out of
//! `main` with `?` so the script stops with a non-zero exit.
//!
//! ```no_run
//! use nob_lib::{cmd, fs, log};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!   // Exits with status 1 by itself if the rebuild fails.
//!   nob_lib::go_rebuild_urself!();
//!
//!   fs::mkdir("build")?;
//!   let status = cmd!("cc", "-Wall", "src/main.c", "-o", "build/main").run_sync()?;
//!   if !status.success() {
//!     log::error(format!("compilation failed: {}", status));
//!     std::process::exit(1);
//!   }
//!   Ok(())
//! }
//! ```

pub mod archive;
pub mod cmd;
pub mod config;
pub mod consts;
pub mod fetch;
pub mod fs;
pub mod log;
pub mod macros;
pub mod rebuild;
pub mod status;

#[cfg(test)]
pub mod testutil;

pub use cmd::{Cmd, RunError};
pub use config::Tools;
pub use fetch::{FetchError, Verbosity};
pub use log::LogLevel;
pub use status::Status;
