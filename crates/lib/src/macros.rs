//! Terse macros for build scripts.

/// Build a [`Cmd`](crate::cmd::Cmd) from a list of tokens.
///
/// ```
/// let cmd = nob_lib::cmd!("cc", "-Wall", "-o", "build/app", "src/main.c");
/// assert_eq!(cmd.to_string(), "cc -Wall -o build/app src/main.c");
/// ```
#[macro_export]
macro_rules! cmd {
  ( $( $tok:expr ),+ $(,)? ) => {{
    let mut __c = $crate::cmd::Cmd::default();
    $( __c.add($tok); )+
    __c
  }};
}

/// Rebuild and restart the running build script if its source changed.
///
/// Must be the first statement of `main`. Aborts the process with status 1
/// when the rebuild fails, so stale build logic never runs.
///
/// The build context is read where the macro expands: a script built by
/// cargo as a `[[bin]]` target is rebuilt with `cargo build --bin <name>`,
/// in the same profile. Anything else is rebuilt with rustc.
#[macro_export]
macro_rules! go_rebuild_urself {
  () => {
    $crate::go_rebuild_urself!(file!())
  };
  ( $source:expr $(, $watch:expr )* $(,)? ) => {{
    let mut __t = $crate::rebuild::Trampoline::new($source) $( .watch($watch) )*;
    if let (::std::option::Option::Some(__dir), ::std::option::Option::Some(__bin)) =
      (::std::option_env!("CARGO_MANIFEST_DIR"), ::std::option_env!("CARGO_BIN_NAME"))
    {
      __t = __t.cargo_bin(__dir, __bin, !cfg!(debug_assertions));
    }
    if let Err(err) = __t.run() {
      $crate::log::error(format_args!("{}", err));
      ::std::process::exit(1);
    }
  }};
}

#[cfg(test)]
mod tests {
  #[test]
  fn cmd_macro_keeps_order() {
    let cmd = cmd!("c++", "-Wall", "-Wextra", std::path::Path::new("src/test.cpp"), "-o", "build/test");
    assert_eq!(cmd.to_string(), "c++ -Wall -Wextra src/test.cpp -o build/test");
  }

  #[test]
  fn cmd_macro_trailing_comma() {
    let cmd = cmd!("make",);
    assert_eq!(cmd.tokens().len(), 1);
  }
}
