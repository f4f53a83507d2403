#![deny(clippy::all)]
//! End-to-end tests for pruning yarn monorepos
//!
//! Each fixture under `fixtures/` is a small monorepo. Tests copy one into a
//! temporary directory, prune it, and check the output tree and lockfile.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

/// Path of a fixture inside the repository's fixtures directory
pub fn fixture_path(name: &str) -> PathBuf {
  Path::new(env!("CARGO_MANIFEST_DIR"))
    .parent()
    .unwrap()
    .parent()
    .unwrap()
    .join("fixtures")
    .join(name)
}

/// Load a fixture file from the fixtures directory
pub fn load_fixture(name: &str) -> String {
  let path = fixture_path(name);
  std::fs::read_to_string(&path)
    .unwrap_or_else(|e| panic!("Failed to read fixture file {}: {}", path.display(), e))
}

/// Copy a fixture monorepo into a fresh temporary directory
pub fn copy_fixture(name: &str) -> TempDir {
  let source = fixture_path(name);
  let dir = tempfile::tempdir().expect("failed to create temporary directory");

  for entry in WalkDir::new(&source) {
    let entry = entry.unwrap();
    let dest = dir.path().join(entry.path().strip_prefix(&source).unwrap());
    if entry.file_type().is_dir() {
      std::fs::create_dir_all(&dest).unwrap();
    } else {
      std::fs::copy(entry.path(), &dest).unwrap();
    }
  }

  dir
}

/// Every file below `dir`, relative and with forward slashes, sorted
pub fn list_files(dir: &Path) -> Vec<String> {
  let mut files: Vec<String> = WalkDir::new(dir)
    .into_iter()
    .filter_map(Result::ok)
    .filter(|e| e.file_type().is_file())
    .map(|e| {
      e.path()
        .strip_prefix(dir)
        .unwrap()
        .to_string_lossy()
        .replace('\\', "/")
    })
    .collect();
  files.sort();
  files
}
