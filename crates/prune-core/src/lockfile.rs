use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::package::LockfileEntry;
use crate::parse::parse_classic_lockfile;

/// Lockfile entries keyed by raw requirement string (or composite key once merged)
pub type LockfileEntries = BTreeMap<String, LockfileEntry>;

/// The two on-disk lockfile formats yarn has used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
  /// yarn v1
  Classic,
  /// yarn v2+
  Berry,
}

impl fmt::Display for Dialect {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Classic => f.write_str("yarn classic"),
      Self::Berry => f.write_str("yarn berry"),
    }
  }
}

/// A parsed yarn lockfile, indexed by individual alias.
#[derive(Debug)]
pub struct Lockfile {
  pub dialect: Dialect,
  /// Lockfile version and cache key, berry only
  pub metadata: Option<Metadata>,
  /// The entries in the lockfile, composite keys already split
  pub entries: LockfileEntries,
}

impl Lockfile {
  pub fn read(path: &Path, dialect: Dialect) -> Result<Self> {
    if !path.is_file() {
      return Err(Error::MissingLockfile {
        path: path.to_path_buf(),
      });
    }
    let contents =
      fs::read_to_string(path).map_err(|e| Error::io(e, path, "reading lockfile"))?;

    let lockfile = match dialect {
      Dialect::Classic => Self::parse_classic(&contents),
      Dialect::Berry => Self::parse_berry(&contents),
    }
    .map_err(|message| Error::LockfileParse {
      path: path.to_path_buf(),
      message,
    })?;

    debug!(path = %path.display(), entries = lockfile.entries.len(), "read lockfile");
    Ok(lockfile)
  }

  pub fn parse_classic(contents: &str) -> std::result::Result<Self, String> {
    let (rest, entries) = parse_classic_lockfile(contents).map_err(|e| e.to_string())?;
    if let Some(line) = rest.lines().find(|line| !line.trim().is_empty()) {
      return Err(format!("unexpected content: {line}"));
    }

    Ok(Self {
      dialect: Dialect::Classic,
      metadata: None,
      entries,
    })
  }

  pub fn parse_berry(contents: &str) -> std::result::Result<Self, String> {
    let mut raw: LockfileEntries = serde_yaml::from_str(contents).map_err(|e| e.to_string())?;

    let metadata = raw
      .remove(Metadata::KEY)
      .ok_or_else(|| format!("missing {} block", Metadata::KEY))?;
    let metadata = Metadata::new(metadata.version, metadata.cache_key.unwrap_or_default());

    let mut entries = LockfileEntries::new();
    for (composite_key, entry) in raw {
      for key in composite_key.split(", ") {
        entries.insert(key.to_string(), entry.clone());
      }
    }

    Ok(Self {
      dialect: Dialect::Berry,
      metadata: Some(metadata),
      entries,
    })
  }

  /// Find the alias a `name` + `range` requirement was locked under.
  /// Berry records registry ranges with an explicit `npm:` protocol.
  pub fn resolve(&self, name: &str, range: &str) -> Option<(&str, &LockfileEntry)> {
    let mut candidates = vec![format!("{name}@{range}")];
    if self.dialect == Dialect::Berry && !range.contains(':') {
      candidates.push(format!("{name}@npm:{range}"));
    }

    candidates
      .into_iter()
      .find_map(|key| self.entries.get_key_value(&key))
      .map(|(key, entry)| (key.as_str(), entry))
  }

  /// The berry record of a workspace itself, under every alias that resolves
  /// to it, e.g. `a@workspace:packages/a` and `a@workspace:^`
  pub fn workspace_entries(&self, name: &str, dir: &str) -> LockfileEntries {
    let resolution = format!("{name}@workspace:{dir}");
    self
      .entries
      .iter()
      .filter(|(_, entry)| entry.resolution.as_deref() == Some(resolution.as_str()))
      .map(|(key, entry)| (key.clone(), entry.clone()))
      .collect()
  }

  /// The transitive closure of `dependencies` over this lockfile, keyed by
  /// the raw aliases that were visited.
  pub fn subgraph<'a>(
    &self,
    dependencies: impl IntoIterator<Item = (&'a String, &'a String)>,
  ) -> LockfileEntries {
    let mut visited = BTreeSet::new();
    let mut subgraph = LockfileEntries::new();
    let mut queue: Vec<(String, String)> = dependencies
      .into_iter()
      .map(|(name, range)| (name.clone(), range.clone()))
      .collect();

    while let Some((name, range)) = queue.pop() {
      let Some((key, entry)) = self.resolve(&name, &range) else {
        warn!(%name, %range, "dependency is missing from the lockfile, skipping");
        continue;
      };
      if !visited.insert(key.to_string()) {
        continue;
      }

      queue.extend(
        entry
          .all_dependencies()
          .map(|(name, range)| (name.clone(), range.clone())),
      );
      subgraph.insert(key.to_string(), entry.clone());
    }

    subgraph
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  const BERRY: &str = r#"# This file is generated by running "yarn install" inside your project.
# Manual changes might be lost - proceed with caution!

__metadata:
  version: 6
  cacheKey: 8

"a@workspace:*, a@workspace:packages/a":
  version: 0.0.0-use.local
  resolution: "a@workspace:packages/a"
  dependencies:
    debug: ^4.1.0
    decimal: 1.10
  languageName: unknown
  linkType: soft

"debug@npm:^4.1.0, debug@npm:^4.3.0":
  version: 4.3.4
  resolution: "debug@npm:4.3.4"
  dependencies:
    ms: 2.1.2
  languageName: node
  linkType: hard

"decimal@npm:1.10":
  version: 1.10.0
  resolution: "decimal@npm:1.10.0"
  languageName: node
  linkType: hard

"ms@npm:2.1.2":
  version: 2.1.2
  resolution: "ms@npm:2.1.2"
  languageName: node
  linkType: hard

"unused@npm:^1.0.0":
  version: 1.0.0
  resolution: "unused@npm:1.0.0"
  languageName: node
  linkType: hard
"#;

  #[test]
  fn test_parse_berry_splits_composite_keys() {
    let lockfile = Lockfile::parse_berry(BERRY).unwrap();
    assert_eq!(
      lockfile.metadata,
      Some(Metadata::new("6".to_string(), "8".to_string()))
    );
    assert_eq!(lockfile.entries["debug@npm:^4.1.0"], lockfile.entries["debug@npm:^4.3.0"]);
    assert!(!lockfile.entries.contains_key(Metadata::KEY));
  }

  #[test]
  fn test_berry_resolve_adds_npm_protocol() {
    let lockfile = Lockfile::parse_berry(BERRY).unwrap();
    let (key, entry) = lockfile.resolve("debug", "^4.1.0").unwrap();
    assert_eq!(key, "debug@npm:^4.1.0");
    assert_eq!(entry.version, "4.3.4");
    assert!(lockfile.resolve("debug", "^5.0.0").is_none());
  }

  #[test]
  fn test_subgraph_is_transitive() {
    let lockfile = Lockfile::parse_berry(BERRY).unwrap();
    let deps = BTreeMap::from([("debug".to_string(), "^4.1.0".to_string())]);
    let subgraph = lockfile.subgraph(&deps);
    assert_eq!(
      subgraph.keys().map(String::as_str).collect::<Vec<_>>(),
      vec!["debug@npm:^4.1.0", "ms@npm:2.1.2"]
    );
  }

  #[test]
  fn test_subgraph_keeps_decimal_looking_ranges() {
    let lockfile = Lockfile::parse_berry(BERRY).unwrap();
    let a = &lockfile.entries["a@workspace:packages/a"];
    assert_eq!(a.dependencies["decimal"], "1.10");

    let subgraph = lockfile.subgraph(&a.dependencies);
    assert_eq!(
      subgraph.keys().map(String::as_str).collect::<Vec<_>>(),
      vec!["debug@npm:^4.1.0", "decimal@npm:1.10", "ms@npm:2.1.2"]
    );
  }

  #[test]
  fn test_workspace_entries_keep_every_alias() {
    let lockfile = Lockfile::parse_berry(BERRY).unwrap();
    let entries = lockfile.workspace_entries("a", "packages/a");
    assert_eq!(
      entries.keys().map(String::as_str).collect::<Vec<_>>(),
      vec!["a@workspace:*", "a@workspace:packages/a"]
    );
    assert_eq!(entries["a@workspace:*"].link_type.as_deref(), Some("soft"));
    assert!(lockfile.workspace_entries("a", "packages/b").is_empty());
  }

  #[test]
  fn test_parse_classic_rejects_garbage() {
    let err = Lockfile::parse_classic("lodash@^4.0.0:\n  version \"4.0.0\"\n<<<<<<< HEAD\n")
      .unwrap_err();
    assert!(err.contains("<<<<<<< HEAD"), "{err}");
  }
}
