//! Parser for the classic (yarn v1) lockfile format.
//!
//! The classic format looks like YAML but isn't: fields are `key value`
//! pairs, keys may be comma separated lists, and strings are double quoted
//! only when they need to be.

use nom::{
  IResult, Parser,
  branch::alt,
  bytes::complete::{is_not, tag, take_while, take_while1},
  character::complete::{char, line_ending, not_line_ending, space0, space1},
  combinator::{eof, opt, verify},
  multi::many0,
  sequence::{delimited, preceded, terminated},
};

use crate::lockfile::LockfileEntries;
use crate::package::{DependencyMap, LockfileEntry};

/// A parsed classic lockfile entry: every alias it is listed under + the entry
type ClassicEntry = (Vec<String>, LockfileEntry);

enum Property<'a> {
  Field(&'a str, String),
  Block(&'a str, DependencyMap),
}

/// Entrypoint for parsing a classic yarn lockfile.
///
/// Composite keys are split, so every alias maps to its own copy of the entry.
pub fn parse_classic_lockfile(input: &str) -> IResult<&str, LockfileEntries> {
  let (rest, _) = many0(alt((parse_comment_line, parse_blank_line))).parse(input)?;
  let (rest, entries) =
    many0(terminated(parse_classic_entry, many0(parse_blank_line))).parse(rest)?;

  let mut lockfile = LockfileEntries::new();
  for (keys, entry) in entries {
    for key in keys {
      lockfile.insert(key, entry.clone());
    }
  }

  Ok((rest, lockfile))
}

/// Parse a single entry
/// Example input:
/// ```text
/// "@babel/code-frame@^7.0.0", "@babel/code-frame@^7.10.4":
///   version "7.12.11"
///   resolved "https://registry.yarnpkg.com/@babel/code-frame/-/code-frame-7.12.11.tgz"
///   integrity sha512-Zt1yodBx1UcyiePMSkWnU4hPqhwq7hGi2nFL1LeA3EUl+q2LQx16MISgJ0+z7dnmgvP9QtIleuETGOiOH1RcIw==
///   dependencies:
///     "@babel/highlight" "^7.10.4"
/// ```
pub fn parse_classic_entry(input: &str) -> IResult<&str, ClassicEntry> {
  let (rest, keys) = parse_key_line(input)?;
  let (rest, properties) = many0(parse_property).parse(rest)?;

  let mut entry = LockfileEntry::default();
  for property in properties {
    match property {
      Property::Field("version", value) => entry.version = value,
      Property::Field("resolved", value) => entry.resolved = Some(value),
      Property::Field("integrity", value) => entry.integrity = Some(value),
      Property::Block("dependencies", deps) => entry.dependencies = deps,
      Property::Block("optionalDependencies", deps) => entry.optional_dependencies = deps,
      // uid, peerDependencies etc. carry nothing yarn needs to install
      Property::Field(..) | Property::Block(..) => {}
    }
  }

  Ok((rest, (keys, entry)))
}

/// Parse the line listing every requirement an entry satisfies, like
/// `"@babel/code-frame@^7.0.0", "@babel/code-frame@^7.10.4":`
fn parse_key_line(input: &str) -> IResult<&str, Vec<String>> {
  let (rest, line) = terminated(
    verify(not_line_ending, |line: &str| {
      !line.starts_with([' ', '#']) && line.trim_end().ends_with(':')
    }),
    parse_line_end,
  )
  .parse(input)?;

  let line = line.trim_end();
  let keys = line
    .strip_suffix(':')
    .unwrap_or(line)
    .split(", ")
    .map(|key| key.trim().trim_matches('"').to_string())
    .collect();

  Ok((rest, keys))
}

fn parse_property(input: &str) -> IResult<&str, Property<'_>> {
  alt((parse_dependencies_block, parse_simple_property)).parse(input)
}

/// e.g. `  version "1.0.0"` or `  integrity sha1-...`
fn parse_simple_property(input: &str) -> IResult<&str, Property<'_>> {
  let (rest, (_, key, _, _, value, _)) = (
    tag("  "),
    parse_field_name,
    opt(char(':')),
    space1,
    parse_value,
    parse_line_end,
  )
    .parse(input)?;

  Ok((rest, Property::Field(key, value)))
}

/// A field holding a nested map, e.g. `  dependencies:`
fn parse_dependencies_block(input: &str) -> IResult<&str, Property<'_>> {
  let (rest, (_, key, _, _, _, lines)) = (
    tag("  "),
    parse_field_name,
    char(':'),
    space0,
    parse_line_end,
    many0(parse_dependency_line),
  )
    .parse(input)?;

  Ok((rest, Property::Block(key, lines.into_iter().collect())))
}

/// Parse a single dependency line with 4-space indentation
/// Example: `    "@babel/highlight" "^7.10.4"`
fn parse_dependency_line(input: &str) -> IResult<&str, (String, String)> {
  let (rest, (_, name, _, _, range, _)) = (
    tag("    "),
    alt((parse_quoted, take_while1(|c: char| !c.is_whitespace() && c != ':' && c != '"'))),
    opt(char(':')),
    space1,
    parse_value,
    parse_line_end,
  )
    .parse(input)?;

  Ok((rest, (name.to_string(), range)))
}

fn parse_field_name(input: &str) -> IResult<&str, &str> {
  take_while1(|c: char| c.is_alphanumeric() || c == '_').parse(input)
}

fn parse_quoted(input: &str) -> IResult<&str, &str> {
  delimited(char('"'), take_while(|c: char| c != '"'), char('"')).parse(input)
}

fn parse_value(input: &str) -> IResult<&str, String> {
  let (rest, value) = alt((parse_quoted, is_not("\r\n"))).parse(input)?;
  Ok((rest, value.trim_end().to_string()))
}

fn parse_line_end(input: &str) -> IResult<&str, &str> {
  alt((line_ending, eof)).parse(input)
}

fn parse_comment_line(input: &str) -> IResult<&str, &str> {
  terminated(preceded(char('#'), not_line_ending), line_ending).parse(input)
}

fn parse_blank_line(input: &str) -> IResult<&str, &str> {
  terminated(space0, line_ending).parse(input)
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_parse_key_line_composite() {
    let input = "\"@babel/code-frame@^7.0.0\", \"@babel/code-frame@^7.10.4\":\n";
    let (rest, keys) = parse_key_line(input).unwrap();
    assert_eq!(rest, "");
    assert_eq!(keys, vec!["@babel/code-frame@^7.0.0", "@babel/code-frame@^7.10.4"]);
  }

  #[test]
  fn test_parse_key_line_rejects_indented() {
    assert!(parse_key_line("  version \"1.0.0\"\n").is_err());
  }

  #[test]
  fn test_parse_classic_entry() {
    let input = r#"debug@^4.1.0:
  version "4.3.4"
  resolved "https://registry.yarnpkg.com/debug/-/debug-4.3.4.tgz#1319f6579357f2338d3337d2cdd4914bb5dcc865"
  integrity sha512-PRWFHuSU3eDtQJPvnNY7Jcket1j0t5OuOsFzPPzsekD52Zl8qUfFIPEiswXqIvHWGVHOgX+7G/vCNNhehwxfkQ==
  dependencies:
    ms "2.1.2"
"#;
    let (rest, (keys, entry)) = parse_classic_entry(input).unwrap();
    assert_eq!(rest, "");
    assert_eq!(keys, vec!["debug@^4.1.0"]);
    assert_eq!(entry.version, "4.3.4");
    assert!(entry.resolved.as_deref().unwrap().ends_with(".tgz#1319f6579357f2338d3337d2cdd4914bb5dcc865"));
    assert!(entry.integrity.as_deref().unwrap().starts_with("sha512-"));
    assert_eq!(entry.dependencies.get("ms").map(String::as_str), Some("2.1.2"));
  }

  #[test]
  fn test_parse_classic_lockfile() {
    let input = r#"# THIS IS AN AUTOGENERATED FILE. DO NOT EDIT THIS FILE DIRECTLY.
# yarn lockfile v1


"@babel/highlight@^7.10.4":
  version "7.10.4"
  dependencies:
    chalk "^2.0.0"
  optionalDependencies:
    fsevents "~2.3.1"

chalk@^2.0.0, chalk@^2.4.2:
  version "2.4.2"
"#;
    let (rest, lockfile) = parse_classic_lockfile(input).unwrap();
    assert_eq!(rest, "");
    assert_eq!(
      lockfile.keys().map(String::as_str).collect::<Vec<_>>(),
      vec!["@babel/highlight@^7.10.4", "chalk@^2.0.0", "chalk@^2.4.2"]
    );
    assert_eq!(lockfile["chalk@^2.0.0"], lockfile["chalk@^2.4.2"]);
    let highlight = &lockfile["@babel/highlight@^7.10.4"];
    assert_eq!(highlight.optional_dependencies.get("fsevents").map(String::as_str), Some("~2.3.1"));
  }

  #[test]
  fn test_parse_colon_separated_fields() {
    let input = "lodash@^4.17.21:\n  version: \"4.17.21\"\n";
    let (rest, (_, entry)) = parse_classic_entry(input).unwrap();
    assert_eq!(rest, "");
    assert_eq!(entry.version, "4.17.21");
  }
}
