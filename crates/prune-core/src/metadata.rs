/// The start of a berry lockfile, typically at the top of the file
/// e.g.
/// __metadata:
///   version: 6
///   cacheKey: 8
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
  pub version: String,
  pub cache_key: String,
}

impl Metadata {
  /// The key of the synthetic metadata record
  pub const KEY: &'static str = "__metadata";

  pub fn new(version: String, cache_key: String) -> Self {
    Self { version, cache_key }
  }
}
