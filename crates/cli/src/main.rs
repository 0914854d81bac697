mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use nob_lib::Verbosity;

use crate::output::OutputFormat;

/// nob - run, capture, download and extract from the command line
#[derive(Parser)]
#[command(name = "nob")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug diagnostics
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format for command results
  #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a program and exit with its status
  Run {
    /// Working directory for the program
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Program followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    argv: Vec<String>,
  },

  /// Run a program and capture its standard output
  Capture {
    /// Working directory for the program
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Write captured output to this file instead of stdout
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,

    /// Program followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    argv: Vec<String>,
  },

  /// Download a URL, following redirects
  Download {
    url: String,

    /// Destination file (default: name from the URL)
    #[arg(short = 'd', long = "dest")]
    dest: Option<PathBuf>,

    #[arg(long, value_enum)]
    verbosity: Option<VerbosityArg>,
  },

  /// Extract an archive, choosing the tool from its extension
  Extract {
    path: PathBuf,

    /// Destination (default: archive name without its extension)
    #[arg(short = 'd', long = "dest")]
    dest: Option<PathBuf>,

    #[arg(long, value_enum)]
    verbosity: Option<VerbosityArg>,
  },

  /// Download an archive and extract it into a directory
  Fetch {
    url: String,

    /// Directory to extract into
    dest: Option<PathBuf>,

    #[arg(long, value_enum)]
    verbosity: Option<VerbosityArg>,
  },

  /// Create a directory if it does not exist
  Mkdir { path: PathBuf },

  /// Show the external tools that will be used
  Info,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VerbosityArg {
  Quiet,
  Quieter,
  Verbose,
}

impl From<VerbosityArg> for Verbosity {
  fn from(arg: VerbosityArg) -> Self {
    match arg {
      VerbosityArg::Quiet => Verbosity::Quiet,
      VerbosityArg::Quieter => Verbosity::Quieter,
      VerbosityArg::Verbose => Verbosity::Verbose,
    }
  }
}

fn main() -> Result<ExitCode> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  // Keep stdout for results when it carries JSON or captured bytes.
  let stdout_is_data = cli.output == OutputFormat::Json || matches!(cli.command, Commands::Capture { file: None, .. });
  nob_lib::log::set_info_to_stderr(stdout_is_data);

  let output = cli.output;
  match cli.command {
    Commands::Run { cwd, argv } => cmd::cmd_run(&argv, cwd.as_deref(), output),
    Commands::Capture { cwd, file, argv } => cmd::cmd_capture(&argv, cwd.as_deref(), file.as_deref(), output),
    Commands::Download { url, dest, verbosity } => {
      cmd::cmd_download(&url, dest.as_deref(), verbosity.map(Into::into), output)
    }
    Commands::Extract { path, dest, verbosity } => {
      cmd::cmd_extract(&path, dest.as_deref(), verbosity.map(Into::into), output)
    }
    Commands::Fetch { url, dest, verbosity } => cmd::cmd_fetch(&url, dest.as_deref(), verbosity.map(Into::into), output),
    Commands::Mkdir { path } => cmd::cmd_mkdir(&path, output),
    Commands::Info => cmd::cmd_info(output),
  }
}
