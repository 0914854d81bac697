mod capture;
mod download;
mod extract;
mod fetch;
mod info;
mod mkdir;
mod run;

use std::process::ExitCode;

use nob_lib::Status;

pub use capture::cmd_capture;
pub use download::cmd_download;
pub use extract::cmd_extract;
pub use fetch::cmd_fetch;
pub use info::cmd_info;
pub use mkdir::cmd_mkdir;
pub use run::cmd_run;

/// Map a child's status onto our own exit code. Codes outside 0..=255 and
/// abnormal terminations become 1.
fn exit_code(status: Status) -> ExitCode {
  match status {
    Status::Exited { code } => u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from),
    Status::Signaled { .. } | Status::LaunchFailed => ExitCode::FAILURE,
  }
}
