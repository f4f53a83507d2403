//! Laying out the pruned repository on disk.
//!
//! Flat layout copies everything into the output directory. The docker layout
//! splits it into `full/` (complete workspaces) and `json/` (only manifests),
//! so an image can install dependencies before the sources are added.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::trace;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::workspace::{PACKAGE_JSON, PackageInfo, YARN_LOCK};

const FULL_DIR: &str = "full";
const JSON_DIR: &str = "json";

#[derive(Debug)]
pub struct OutputAssembler {
  root: PathBuf,
  out_dir: PathBuf,
  docker: bool,
}

impl OutputAssembler {
  pub fn new(root: &Path, out_dir: &Path, docker: bool) -> Self {
    Self {
      root: root.to_path_buf(),
      out_dir: out_dir.to_path_buf(),
      docker,
    }
  }

  /// Where the rewritten lockfile goes
  pub fn lockfile_path(&self) -> PathBuf {
    self.out_dir.join(YARN_LOCK)
  }

  pub fn prepare(&self) -> Result<()> {
    create_dir(&self.out_dir, "output directory")
  }

  /// Copy one workspace, plus its manifest into `json/` for docker output
  pub fn copy_workspace(&self, info: &PackageInfo) -> Result<()> {
    let source = self.root.join(&info.dir);
    let target = if self.docker {
      self.out_dir.join(FULL_DIR).join(&info.dir)
    } else {
      self.out_dir.join(&info.dir)
    };

    create_dir(&target, &info.name)?;
    recursive_copy(&source, &target).map_err(|source| Error::Copy {
      source,
      path: target.clone(),
      target: info.name.clone(),
    })?;

    if self.docker {
      let json_target = self.out_dir.join(JSON_DIR).join(&info.package_json_path);
      if let Some(parent) = json_target.parent() {
        create_dir(parent, &info.name)?;
      }
      copy_file(&self.root.join(&info.package_json_path), &json_target, &info.name)?;
    }

    trace!(workspace = %info.name, target = %target.display(), "copied workspace");
    Ok(())
  }

  /// `package.json` always, `.gitignore` and `turbo.json` when they exist.
  /// In docker layout only the manifest is needed in `json/`.
  pub fn copy_root_files(&self) -> Result<()> {
    let full = if self.docker {
      self.out_dir.join(FULL_DIR)
    } else {
      self.out_dir.clone()
    };
    create_dir(&full, "root files")?;

    for optional in [".gitignore", "turbo.json"] {
      let source = self.root.join(optional);
      if source.is_file() {
        copy_file(&source, &full.join(optional), optional)?;
      }
    }

    let manifest = self.root.join(PACKAGE_JSON);
    copy_file(&manifest, &full.join(PACKAGE_JSON), PACKAGE_JSON)?;
    if self.docker {
      let json = self.out_dir.join(JSON_DIR);
      create_dir(&json, "root files")?;
      copy_file(&manifest, &json.join(PACKAGE_JSON), PACKAGE_JSON)?;
    }
    Ok(())
  }
}

fn create_dir(path: &Path, target: &str) -> Result<()> {
  fs::create_dir_all(path).map_err(|source| Error::DirectoryCreation {
    source,
    path: path.to_path_buf(),
    target: target.to_string(),
  })
}

fn copy_file(from: &Path, to: &Path, target: &str) -> Result<()> {
  fs::copy(from, to).map(|_| ()).map_err(|source| Error::Copy {
    source,
    path: to.to_path_buf(),
    target: target.to_string(),
  })
}

/// Copy a directory tree, skipping installed `node_modules`
fn recursive_copy(from: &Path, to: &Path) -> io::Result<()> {
  let walker = WalkDir::new(from)
    .follow_links(false)
    .into_iter()
    .filter_entry(|e| e.file_name() != "node_modules");

  for entry in walker {
    let entry = entry?;
    let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
    let dest = to.join(relative);

    if entry.file_type().is_dir() {
      fs::create_dir_all(&dest)?;
    } else if entry.file_type().is_file() || entry.path().is_file() {
      fs::copy(entry.path(), &dest)?;
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use rstest::rstest;
  use std::collections::BTreeSet;

  fn info() -> PackageInfo {
    PackageInfo {
      name: "a".to_string(),
      dir: "packages/a".to_string(),
      package_json_path: "packages/a/package.json".to_string(),
      internal_deps: BTreeSet::new(),
      external_deps: Default::default(),
      sub_lockfile: Default::default(),
    }
  }

  fn repo() -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();
    let a = root.path().join("packages/a");
    fs::create_dir_all(a.join("src")).unwrap();
    fs::create_dir_all(a.join("node_modules/left-pad")).unwrap();
    fs::write(a.join("package.json"), r#"{"name":"a"}"#).unwrap();
    fs::write(a.join("src/index.js"), "module.exports = 1;\n").unwrap();
    fs::write(a.join("node_modules/left-pad/index.js"), "").unwrap();
    fs::write(root.path().join("package.json"), "{}").unwrap();
    fs::write(root.path().join(".gitignore"), "node_modules\n").unwrap();
    root
  }

  fn files(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(dir)
      .into_iter()
      .filter_map(std::result::Result::ok)
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

  #[rstest]
  #[case(false, vec![".gitignore", "package.json", "packages/a/package.json", "packages/a/src/index.js"])]
  #[case(true, vec![
    "full/.gitignore",
    "full/package.json",
    "full/packages/a/package.json",
    "full/packages/a/src/index.js",
    "json/package.json",
    "json/packages/a/package.json",
  ])]
  fn test_layouts(#[case] docker: bool, #[case] expected: Vec<&str>) {
    let root = repo();
    let out = tempfile::tempdir().unwrap();
    let assembler = OutputAssembler::new(root.path(), out.path(), docker);

    assembler.prepare().unwrap();
    assembler.copy_workspace(&info()).unwrap();
    assembler.copy_root_files().unwrap();

    assert_eq!(files(out.path()), expected);
  }

  #[test]
  fn test_missing_workspace_is_copy_error() {
    let root = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let assembler = OutputAssembler::new(root.path(), out.path(), false);
    let err = assembler.copy_workspace(&info()).unwrap_err();
    assert!(matches!(err, Error::Copy { target, .. } if target == "a"));
  }
}
