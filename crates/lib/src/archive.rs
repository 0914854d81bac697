//! Archive format detection by file-name suffix.
//!
//! Detection is table driven. The table is ordered longest suffix first and
//! the first match wins, so `foo.tar.gz` is a gzipped tarball and never a
//! plain gzipped file.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveKind {
  /// gzip-compressed tarball, unpacked by `tar -xz`.
  TarGz,
  /// bzip2-compressed tarball, unpacked by `tar -xj`.
  TarBz2,
  /// A single gzip-compressed file.
  Gz,
  /// A single bzip2-compressed file.
  Bz2,
  /// A zip archive, unpacked by `unzip`.
  Zip,
}

/// Known suffixes, longest first. [`detect`] takes the first match, so a
/// compound suffix must precede any suffix it ends with.
pub const SUFFIXES: &[(&str, ArchiveKind)] = &[
  (".tar.bz2", ArchiveKind::TarBz2),
  (".tar.gz", ArchiveKind::TarGz),
  (".tbz2", ArchiveKind::TarBz2),
  (".tbz", ArchiveKind::TarBz2),
  (".tgz", ArchiveKind::TarGz),
  (".bz2", ArchiveKind::Bz2),
  (".zip", ArchiveKind::Zip),
  (".gz", ArchiveKind::Gz),
];

impl ArchiveKind {
  /// Whether extraction produces a directory tree rather than a single file.
  pub fn produces_directory(self) -> bool {
    match self {
      ArchiveKind::TarGz | ArchiveKind::TarBz2 | ArchiveKind::Zip => true,
      ArchiveKind::Gz | ArchiveKind::Bz2 => false,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      ArchiveKind::TarGz => "tar.gz",
      ArchiveKind::TarBz2 => "tar.bz2",
      ArchiveKind::Gz => "gz",
      ArchiveKind::Bz2 => "bz2",
      ArchiveKind::Zip => "zip",
    }
  }
}

impl fmt::Display for ArchiveKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Result of matching a file name against [`SUFFIXES`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detected {
  pub kind: ArchiveKind,
  /// The suffix that matched, as written in the table.
  pub suffix: &'static str,
  /// The file name with the matched suffix removed.
  pub base: String,
}

impl Detected {
  /// Where `archive` extracts to when no destination is given: next to the
  /// archive, named after it with the suffix stripped.
  pub fn default_destination(&self, archive: &Path) -> PathBuf {
    archive.with_file_name(&self.base)
  }
}

/// Match the file name of `path` against the suffix table in order and take
/// the first hit. Matching ignores ASCII case. Returns `None` for unknown formats and
/// for names that are nothing but a suffix (`.gz`).
pub fn detect(path: &Path) -> Option<Detected> {
  let name = path.file_name()?.to_str()?;

  SUFFIXES.iter().find_map(|&(suffix, kind)| {
    let start = name.len().checked_sub(suffix.len())?;
    let tail = name.get(start..)?;
    (start > 0 && tail.eq_ignore_ascii_case(suffix)).then(|| Detected {
      kind,
      suffix,
      base: name[..start].to_string(),
    })
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kind_and_base(name: &str) -> Option<(ArchiveKind, String)> {
    detect(Path::new(name)).map(|d| (d.kind, d.base))
  }

  #[test]
  fn compound_suffix_wins() {
    assert_eq!(kind_and_base("archive.tar.gz"), Some((ArchiveKind::TarGz, "archive".to_string())));
    assert_eq!(kind_and_base("archive.tar.bz2"), Some((ArchiveKind::TarBz2, "archive".to_string())));
    assert_eq!(kind_and_base("raylib-5.0.tgz"), Some((ArchiveKind::TarGz, "raylib-5.0".to_string())));
  }

  #[test]
  fn single_suffix_without_tar() {
    assert_eq!(kind_and_base("archive.bz2"), Some((ArchiveKind::Bz2, "archive".to_string())));
    assert_eq!(kind_and_base("notes.txt.gz"), Some((ArchiveKind::Gz, "notes.txt".to_string())));
    assert_eq!(kind_and_base("bundle.zip"), Some((ArchiveKind::Zip, "bundle".to_string())));
  }

  #[test]
  fn unknown_formats_are_rejected() {
    assert_eq!(detect(Path::new("archive.rar")), None);
    assert_eq!(detect(Path::new("archive")), None);
    assert_eq!(detect(Path::new(".gz")), None);
    assert_eq!(detect(Path::new("archive.tar")), None);
  }

  #[test]
  fn case_is_ignored() {
    assert_eq!(kind_and_base("ARCHIVE.TAR.GZ"), Some((ArchiveKind::TarGz, "ARCHIVE".to_string())));
  }

  #[test]
  fn only_file_name_is_considered() {
    let detected = detect(Path::new("downloads.tar.gz/archive.zip")).unwrap();
    assert_eq!(detected.kind, ArchiveKind::Zip);
    assert_eq!(
      detected.default_destination(Path::new("downloads.tar.gz/archive.zip")),
      PathBuf::from("downloads.tar.gz/archive")
    );
  }

  #[test]
  fn table_is_longest_first() {
    for pair in SUFFIXES.windows(2) {
      assert!(pair[0].0.len() >= pair[1].0.len(), "{} listed before {}", pair[0].0, pair[1].0);
    }
  }

  #[test]
  fn every_compound_suffix_shadows_its_tail() {
    // For each suffix that ends with another known suffix, a name carrying the
    // longer one must resolve to the longer one.
    for &(long, long_kind) in SUFFIXES {
      for &(short, _) in SUFFIXES {
        if long.len() > short.len() && long.ends_with(short) {
          let name = format!("x{}", long);
          assert_eq!(detect(Path::new(&name)).map(|d| d.kind), Some(long_kind), "{}", name);
        }
      }
    }
  }
}
