use std::io::Cursor;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};

use crate::assemble::OutputAssembler;
use crate::error::{Error, Result};
use crate::graph::resolve_targets;
use crate::lockfile::{Dialect, LockfileEntries};
use crate::merge::{BerryDeduplicator, merge_classic};
use crate::serialize::to_generic_yaml;
use crate::syml::{CLASSIC_HEADER, berry_header, write_lockfile};
use crate::workspace::Repository;

#[derive(Debug, Clone)]
pub struct PruneOptions {
  /// Workspace to prune down to
  pub scope: String,
  /// Split the output into `full/` and `json/`
  pub docker: bool,
  /// Output directory, relative to the repository root unless absolute
  pub out_dir: PathBuf,
}

impl PruneOptions {
  pub fn new(scope: impl Into<String>) -> Self {
    Self {
      scope: scope.into(),
      docker: false,
      out_dir: PathBuf::from("out"),
    }
  }

  #[must_use]
  pub const fn with_docker(mut self, docker: bool) -> Self {
    self.docker = docker;
    self
  }

  #[must_use]
  pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
    self.out_dir = out_dir.into();
    self
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneSummary {
  /// The scope first, then its workspace dependencies in name order
  pub targets: Vec<String>,
  pub lockfile_path: PathBuf,
}

/// Prune the repository at `root` down to `options.scope`.
#[tracing::instrument(skip(options), fields(scope = %options.scope))]
pub fn prune(root: &Path, options: &PruneOptions) -> Result<PruneSummary> {
  if options.scope.is_empty() {
    return Err(Error::InvalidScope {
      scope: options.scope.clone(),
    });
  }

  let repo = Repository::load(root)?;
  let targets = resolve_targets(&options.scope, &repo.graph, |name| {
    repo.package_infos.contains_key(name)
  })?;
  debug!(?targets, "resolved prune targets");

  let out_dir = root.join(&options.out_dir);
  trace!(docker = options.docker, out_dir = %out_dir.display(), "preparing output");
  let assembler = OutputAssembler::new(root, &out_dir, options.docker);
  assembler.prepare()?;

  let mut combined = repo.root_sub_lockfile.clone();
  let mut dedup = match repo.dialect {
    Dialect::Classic => None,
    Dialect::Berry => {
      let mut dedup = BerryDeduplicator::new();
      dedup.add(&combined);
      combined.clear();
      Some(dedup)
    }
  };

  for target in &targets {
    let Some(info) = repo.package_infos.get(target) else {
      return Err(Error::InvalidScope {
        scope: target.clone(),
      });
    };
    trace!(
      target = %target,
      dir = %info.dir,
      internal_deps = ?info.internal_deps,
      external_deps = info.external_deps.len(),
      "adding workspace"
    );
    assembler.copy_workspace(info)?;
    info!(workspace = %target, "added workspace");

    match dedup.as_mut() {
      Some(dedup) => dedup.add(&info.sub_lockfile),
      None => merge_classic(&mut combined, &info.sub_lockfile),
    }
  }
  if let Some(dedup) = dedup {
    dedup.finish_into(&mut combined);
  }

  assembler.copy_root_files()?;

  let lockfile_path = assembler.lockfile_path();
  write_combined(&repo, &combined, &lockfile_path)?;
  info!(
    targets = targets.len(),
    entries = combined.len(),
    lockfile = %lockfile_path.display(),
    "pruned repository"
  );

  Ok(PruneSummary {
    targets,
    lockfile_path,
  })
}

fn write_combined(repo: &Repository, combined: &LockfileEntries, target: &Path) -> Result<()> {
  let generic = to_generic_yaml(combined)?;
  let header = match &repo.lockfile.metadata {
    Some(metadata) if repo.dialect == Dialect::Berry => berry_header(metadata),
    _ => CLASSIC_HEADER.to_string(),
  };
  write_lockfile(Cursor::new(generic.as_bytes()), &header, repo.dialect, target)
}
