use crate::error::{Error, Result};
use crate::lockfile::LockfileEntries;

/// Render the combined lockfile as plain YAML with 2-space indentation.
///
/// Keys come out in lexicographic order, so the output is byte-reproducible.
/// This is the input of the dialect rewriter, it is not yet a valid yarn.lock.
/// An empty lockfile renders as no lines at all rather than a `{}` flow map.
pub fn to_generic_yaml(lockfile: &LockfileEntries) -> Result<String> {
  if lockfile.is_empty() {
    return Ok(String::new());
  }
  serde_yaml::to_string(lockfile).map_err(|source| Error::Serialization { source })
}
