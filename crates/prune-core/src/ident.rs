// Types from
// https://github.com/yarnpkg/berry/blob/master/packages/yarnpkg-core/sources/types.ts#L19

use std::fmt;

/// Scope + name of the package, e.g. `@babel/code-frame` or `debug`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident {
  /// The scope of the package, e.g. for `@scope/package`, this is `@scope`
  scope: Option<String>,
  /// The name of the package, e.g. for `@scope/package`, this is `package`
  name: String,
}

impl Ident {
  pub fn new(scope: Option<String>, name: String) -> Self {
    Self { scope, name }
  }

  /// Split a full package name into scope and name.
  /// A malformed scoped name (no `/`) is kept whole as the name.
  pub fn parse(full_name: &str) -> Self {
    match full_name.strip_prefix('@').and_then(|s| s.split_once('/')) {
      Some((scope, name)) => Self::new(Some(format!("@{scope}")), name.to_string()),
      None => Self::new(None, full_name.to_string()),
    }
  }

  pub fn scope(&self) -> Option<&str> {
    self.scope.as_deref()
  }

  pub fn name(&self) -> &str {
    &self.name
  }
}

impl fmt::Display for Ident {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.scope {
      Some(scope) => write!(f, "{scope}/{}", self.name),
      None => f.write_str(&self.name),
    }
  }
}

/// Descriptors are just like idents, except that they also contain a range,
/// e.g. `lodash@^4.17.21` or `debug@npm:^4.1.0`.
///
/// This is the shape of every raw key in a lockfile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Descriptor {
  ident: Ident,
  range: String,
}

impl Descriptor {
  pub fn new(ident: Ident, range: String) -> Self {
    Self { ident, range }
  }

  /// Parse a raw requirement string. The package name is everything before
  /// the final `@`, so `@scope/pkg@^1.0.0` keeps its scope.
  pub fn parse(raw: &str) -> Option<Self> {
    let at = raw.rfind('@').filter(|&idx| idx > 0)?;
    let (name, range) = (&raw[..at], &raw[at + 1..]);
    Some(Self::new(Ident::parse(name), range.to_string()))
  }

  pub fn ident(&self) -> &Ident {
    &self.ident
  }

  pub fn range(&self) -> &str {
    &self.range
  }
}

impl fmt::Display for Descriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}@{}", self.ident, self.range)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use rstest::rstest;

  #[rstest]
  #[case("debug@npm:1.0.0", None, "debug", "npm:1.0.0")]
  #[case("@babel/code-frame@npm:7.12.11", Some("@babel"), "code-frame", "npm:7.12.11")]
  #[case("a@workspace:packages/a", None, "a", "workspace:packages/a")]
  #[case("lodash@^4.17.21", None, "lodash", "^4.17.21")]
  fn test_parse_descriptor(
    #[case] raw: &str,
    #[case] scope: Option<&str>,
    #[case] name: &str,
    #[case] range: &str,
  ) {
    let descriptor = Descriptor::parse(raw).expect("descriptor should parse");
    assert_eq!(descriptor.ident().scope(), scope);
    assert_eq!(descriptor.ident().name(), name);
    assert_eq!(descriptor.range(), range);
    assert_eq!(descriptor.to_string(), raw);
  }

  #[test]
  fn test_parse_descriptor_without_range() {
    assert_eq!(Descriptor::parse("@babel/core"), None);
    assert_eq!(Descriptor::parse("lodash"), None);
  }
}
