//! Reading a yarn monorepo from disk: package manifests, workspace discovery,
//! package manager and linker detection.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::graph::PackageGraph;
use crate::lockfile::{Dialect, Lockfile, LockfileEntries};
use crate::package::DependencyMap;

pub const PACKAGE_JSON: &str = "package.json";
pub const YARN_LOCK: &str = "yarn.lock";
pub const YARNRC: &str = ".yarnrc.yml";

/// The parts of a `package.json` pruning cares about
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub package_manager: Option<String>,
  #[serde(default)]
  pub workspaces: Option<Workspaces>,
  #[serde(default)]
  pub dependencies: DependencyMap,
  #[serde(default)]
  pub dev_dependencies: DependencyMap,
  #[serde(default)]
  pub optional_dependencies: DependencyMap,
  #[serde(default)]
  pub peer_dependencies: DependencyMap,
}

/// `workspaces` is either a list of globs or `{ packages: [...] }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Workspaces {
  Globs(Vec<String>),
  Config {
    #[serde(default)]
    packages: Vec<String>,
  },
}

impl Workspaces {
  pub fn globs(&self) -> &[String] {
    match self {
      Self::Globs(globs) | Self::Config { packages: globs } => globs,
    }
  }
}

impl PackageJson {
  pub fn read(path: &Path) -> Result<Self> {
    read_json_file(path)
  }

  /// Every declared dependency; later maps win on duplicate names, matching
  /// how yarn lets `dependencies` override `devDependencies`.
  pub fn all_dependencies(&self) -> DependencyMap {
    let mut all = DependencyMap::new();
    for deps in [
      &self.peer_dependencies,
      &self.optional_dependencies,
      &self.dev_dependencies,
      &self.dependencies,
    ] {
      all.extend(deps.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    all
  }
}

/// One workspace of the monorepo
#[derive(Debug, Clone)]
pub struct PackageInfo {
  pub name: String,
  /// Directory relative to the repository root, `/` separated
  pub dir: String,
  /// `package.json` relative to the repository root
  pub package_json_path: String,
  pub internal_deps: BTreeSet<String>,
  pub external_deps: DependencyMap,
  /// The lockfile entries this workspace needs on its own
  pub sub_lockfile: LockfileEntries,
}

/// The loaded monorepo
#[derive(Debug)]
pub struct Repository {
  pub dialect: Dialect,
  /// Lockfile entries needed by the root manifest itself
  pub root_sub_lockfile: LockfileEntries,
  pub lockfile: Lockfile,
  pub package_infos: BTreeMap<String, PackageInfo>,
  pub graph: PackageGraph,
}

impl Repository {
  /// Load the repository at `root`.
  ///
  /// Berry repositories must use the node-modules linker; this is checked
  /// before anything else is read.
  #[tracing::instrument]
  pub fn load(root: &Path) -> Result<Self> {
    let root_package_json = PackageJson::read(&root.join(PACKAGE_JSON))?;
    let dialect = detect_dialect(root, &root_package_json)?;
    debug!(%dialect, "detected package manager");
    if dialect == Dialect::Berry {
      ensure_node_modules_linker(root)?;
    }

    let lockfile = Lockfile::read(&root.join(YARN_LOCK), dialect)?;
    let globs = root_package_json
      .workspaces
      .as_ref()
      .map(Workspaces::globs)
      .unwrap_or_default();
    let dirs = resolve_workspace_dirs(root, globs)?;

    let mut manifests = BTreeMap::new();
    for dir in dirs {
      let path = dir.join(PACKAGE_JSON);
      let package_json = PackageJson::read(&path)?;
      let name = package_json
        .name
        .clone()
        .ok_or_else(|| Error::ManifestInvalid {
          path: path.clone(),
          message: "workspace has no `name`".to_string(),
        })?;
      if manifests.contains_key(&name) {
        return Err(Error::ManifestInvalid {
          path,
          message: format!("duplicate workspace name `{name}`"),
        });
      }
      manifests.insert(name, (relative_unix(root, &dir), package_json));
    }

    let names: BTreeSet<String> = manifests.keys().cloned().collect();
    let mut package_infos = BTreeMap::new();
    for (name, (dir, package_json)) in manifests {
      let (internal_deps, external_deps): (DependencyMap, DependencyMap) = package_json
        .all_dependencies()
        .into_iter()
        .partition(|(dep, _)| names.contains(dep));

      let mut sub_lockfile = lockfile.subgraph(&external_deps);
      sub_lockfile.extend(lockfile.workspace_entries(&name, &dir));
      trace!(workspace = %name, entries = sub_lockfile.len(), "computed sub-lockfile");

      package_infos.insert(
        name.clone(),
        PackageInfo {
          package_json_path: format!("{dir}/{PACKAGE_JSON}"),
          name,
          dir,
          internal_deps: internal_deps.into_keys().collect(),
          external_deps,
          sub_lockfile,
        },
      );
    }

    let mut root_sub_lockfile = lockfile.subgraph(
      &root_package_json
        .all_dependencies()
        .into_iter()
        .filter(|(dep, _)| !names.contains(dep))
        .collect::<DependencyMap>(),
    );
    if let Some(name) = &root_package_json.name {
      root_sub_lockfile.extend(lockfile.workspace_entries(name, "."));
    }

    let graph = PackageGraph::from_internal_deps(
      package_infos
        .iter()
        .map(|(name, info)| (name.as_str(), &info.internal_deps)),
    );

    Ok(Self {
      dialect,
      root_sub_lockfile,
      lockfile,
      package_infos,
      graph,
    })
  }
}

/// Decide between classic and berry.
///
/// The `packageManager` field wins; otherwise a `.yarnrc.yml` means berry and
/// a lone `yarn.lock` means classic.
pub fn detect_dialect(root: &Path, package_json: &PackageJson) -> Result<Dialect> {
  if let Some(spec) = &package_json.package_manager {
    let (manager, version) = spec.split_once('@').unwrap_or((spec.as_str(), ""));
    let major = version.split('.').next().and_then(|m| m.parse::<u32>().ok());
    return match (manager, major) {
      ("yarn", Some(1)) => Ok(Dialect::Classic),
      ("yarn", Some(_)) => Ok(Dialect::Berry),
      _ => Err(Error::UnsupportedPackageManager {
        manager: spec.clone(),
      }),
    };
  }

  if root.join(YARNRC).is_file() {
    Ok(Dialect::Berry)
  } else if root.join(YARN_LOCK).is_file() {
    Ok(Dialect::Classic)
  } else {
    Err(Error::UnsupportedPackageManager {
      manager: "unknown".to_string(),
    })
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YarnRc {
  #[serde(default)]
  node_linker: Option<String>,
}

/// Berry defaults to Plug'n'Play, which has no per-workspace node_modules to prune.
pub fn ensure_node_modules_linker(root: &Path) -> Result<()> {
  let path = root.join(YARNRC);
  let yarnrc = if path.is_file() {
    let contents =
      fs::read_to_string(&path).map_err(|e| Error::io(e, &path, "reading .yarnrc.yml"))?;
    serde_yaml::from_str::<Option<YarnRc>>(&contents)
      .map_err(|source| Error::Yaml { source, path })?
      .unwrap_or_default()
  } else {
    YarnRc::default()
  };

  match yarnrc.node_linker.as_deref() {
    Some("node-modules") => Ok(()),
    other => Err(Error::UnsupportedLinkerMode {
      linker: other.unwrap_or("pnp").to_string(),
    }),
  }
}

/// Expand the `workspaces` globs into directories holding a `package.json`
pub fn resolve_workspace_dirs(root: &Path, globs: &[String]) -> Result<Vec<PathBuf>> {
  let mut dirs = BTreeSet::new();
  let mut excluded = BTreeSet::new();

  for pattern in globs {
    let (negated, pattern) = pattern
      .strip_prefix('!')
      .map_or((false, pattern.as_str()), |p| (true, p));
    let full = root.join(pattern.trim_end_matches('/'));
    let matches = glob::glob(&full.to_string_lossy()).map_err(|e| Error::ManifestInvalid {
      path: root.join(PACKAGE_JSON),
      message: format!("invalid workspace glob `{pattern}`: {e}"),
    })?;

    for path in matches.filter_map(std::result::Result::ok) {
      if !path.join(PACKAGE_JSON).is_file()
        || path.components().any(|c| c.as_os_str() == "node_modules")
      {
        continue;
      }
      if negated {
        excluded.insert(path);
      } else {
        dirs.insert(path);
      }
    }
  }

  Ok(dirs.difference(&excluded).cloned().collect())
}

fn relative_unix(root: &Path, path: &Path) -> String {
  let relative = path.strip_prefix(root).unwrap_or(path);
  relative
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}

fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
  let content = fs::read_to_string(path).map_err(|e| Error::io(e, path, "reading json file"))?;

  serde_json::from_str(&content).map_err(|source| Error::Json {
    source,
    path: path.to_path_buf(),
  })
}
