use std::process::ExitCode;

use anyhow::Result;

use nob_lib::Tools;

use crate::output::{OutputFormat, print_json};

/// Show which external programs nob will run, after `NOB_*` overrides.
pub fn cmd_info(output: OutputFormat) -> Result<ExitCode> {
  let tools = Tools::from_env();

  if output == OutputFormat::Json {
    print_json(&tools)?;
    return Ok(ExitCode::SUCCESS);
  }

  println!("nob v{}", env!("CARGO_PKG_VERSION"));
  let rustflags = tools.rustflags.join(" ");
  for (name, value) in [
    ("cargo", &tools.cargo),
    ("rustc", &tools.rustc),
    ("rustflags", &rustflags),
    ("curl", &tools.curl),
    ("tar", &tools.tar),
    ("gunzip", &tools.gunzip),
    ("bzip2", &tools.bzip2),
    ("unzip", &tools.unzip),
  ] {
    if !value.is_empty() {
      println!("  {:<10}{}", name, value);
    }
  }
  Ok(ExitCode::SUCCESS)
}
