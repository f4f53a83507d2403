use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A map of package name to version requirement, e.g. `ms: 2.1.2`
pub type DependencyMap = BTreeMap<String, String>;

/// One resolved dependency record of a lockfile.
///
/// Every scalar is kept as the text yarn wrote. Berry leaves `version: 6` or
/// `foo: 1.10` unquoted, and reading those as numbers would turn `1.10` into
/// `1.1`.
///
/// The same type is used for both dialects. Classic entries only fill
/// `version`, `resolved`, `integrity` and the dependency maps; berry entries
/// use the rest. Field order is the order yarn writes them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockfileEntry {
  /// Resolved version for the entry, e.g. `1.2.3`, `0.0.0-use.local`
  #[serde(default)]
  pub version: String,

  /// Only present on the berry `__metadata` record
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cache_key: Option<String>,

  /// Classic only: tarball url the entry was fetched from
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub resolved: Option<String>,

  /// Classic only: subresource integrity hash
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub integrity: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub resolution: Option<String>,

  /// A map of the package's dependencies. There's no distinction between prod
  /// dependencies and dev dependencies, because those have already been merged
  /// during the resolution process
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub dependencies: DependencyMap,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub optional_dependencies: DependencyMap,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub peer_dependencies: DependencyMap,

  /// e.g. `react: { optional: true }`
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub peer_dependencies_meta: BTreeMap<String, BTreeMap<String, bool>>,

  /// Binary name to the path shipped by the package
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub bin: BTreeMap<String, String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub checksum: Option<String>,

  /// A set of constraints indicating whether the package supports the host environments
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub conditions: Option<String>,

  /// The "language" of the package (eg. `node`), for use with multi-linkers.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub language_name: Option<String>,

  /// `hard` for packages yarn owns, `soft` for workspaces and links
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub link_type: Option<String>,
}

impl LockfileEntry {
  pub fn new(version: impl Into<String>) -> Self {
    Self {
      version: version.into(),
      ..Self::default()
    }
  }

  #[must_use]
  pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
    self.resolution = Some(resolution.into());
    self
  }

  #[must_use]
  pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
    self.checksum = Some(checksum.into());
    self
  }

  #[must_use]
  pub fn with_dependency(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
    self.dependencies.insert(name.into(), range.into());
    self
  }

  /// Every dependency yarn will install for this entry
  pub fn all_dependencies(&self) -> impl Iterator<Item = (&String, &String)> {
    self.dependencies.iter().chain(self.optional_dependencies.iter())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_deserialize_berry_entry_with_numeric_scalars() {
    let input = r#"
version: 4.3.4
resolution: "debug@npm:4.3.4"
dependencies:
  ms: 2
peerDependenciesMeta:
  supports-color:
    optional: true
checksum: abc123
languageName: node
linkType: hard
"#;
    let entry: LockfileEntry = serde_yaml::from_str(input).unwrap();
    assert_eq!(entry.version, "4.3.4");
    assert_eq!(entry.resolution.as_deref(), Some("debug@npm:4.3.4"));
    assert_eq!(entry.dependencies.get("ms").map(String::as_str), Some("2"));
    assert_eq!(
      entry.peer_dependencies_meta["supports-color"].get("optional"),
      Some(&true)
    );
    assert_eq!(entry.link_type.as_deref(), Some("hard"));
  }

  #[test]
  fn test_unquoted_ranges_keep_their_text() {
    let input = "version: 1.10\ndependencies:\n  foo: 1.10\n  bar: 2.0\n  baz: 3\n";
    let entry: LockfileEntry = serde_yaml::from_str(input).unwrap();
    assert_eq!(entry.version, "1.10");
    assert_eq!(entry.dependencies["foo"], "1.10");
    assert_eq!(entry.dependencies["bar"], "2.0");
    assert_eq!(entry.dependencies["baz"], "3");
  }

  #[test]
  fn test_serialize_skips_empty_fields() {
    let entry = LockfileEntry::new("1.0.0").with_resolution("a@npm:1.0.0");
    let yaml = serde_yaml::to_string(&entry).unwrap();
    assert_eq!(yaml, "version: 1.0.0\nresolution: a@npm:1.0.0\n");
  }
}
