use crate::ident::{Descriptor, Ident};
use std::fmt;

/// Locators are just like idents, except that they also contain a reference.
/// They are in this regard very similar to descriptors except that each
/// descriptor may reference multiple valid candidate packages whereas each
/// locator can only reference a single package.
///
/// Two lockfile keys that produce the same locator point at the same physical
/// install, which is what the berry merger folds on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator {
  ident: Ident,
  /// A package reference uniquely identifies a package (eg. `1.2.3`).
  reference: String,
}

impl Locator {
  /// Create a new Locator from an Ident and a reference
  pub fn new(ident: Ident, reference: String) -> Self {
    Self { ident, reference }
  }

  /// The locator a raw lockfile key resolved to, given the resolved version
  /// of its entry. A key without a range is taken to be a bare package name.
  pub fn resolved(raw_key: &str, version: &str) -> Self {
    let ident = Descriptor::parse(raw_key)
      .map_or_else(|| Ident::parse(raw_key), |d| d.ident().clone());
    Self::new(ident, version.to_string())
  }

  /// Returns the Ident of the Locator (e.g. `@scope/package`)
  pub fn ident(&self) -> &Ident {
    &self.ident
  }

  /// Returns the reference of the Locator (e.g. `1.2.3`)
  pub fn reference(&self) -> &str {
    &self.reference
  }
}

impl fmt::Display for Locator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}@{}", self.ident, self.reference)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_aliases_share_locator() {
    let caret = Locator::resolved("pkg@^1.0.0", "1.0.2");
    let tilde = Locator::resolved("pkg@~1.0.1", "1.0.2");
    assert_eq!(caret, tilde);
    assert_eq!(caret.to_string(), "pkg@1.0.2");
  }

  #[test]
  fn test_scoped_locator() {
    let locator = Locator::resolved("@types/node@npm:^18.0.0", "18.11.9");
    assert_eq!(locator.ident().scope(), Some("@types"));
    assert_eq!(locator.reference(), "18.11.9");
    assert_eq!(locator.to_string(), "@types/node@18.11.9");
  }
}
