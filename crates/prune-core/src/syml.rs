//! Rewriting generic YAML into the dialect yarn actually reads.
//!
//! Yarn lockfiles ("SYML") look like YAML but yarn's own parser expects a
//! few conventions YAML encoders don't follow: every top level key is double
//! quoted and separated by a blank line, `resolution` values are always
//! quoted, and simple dependency ranges are never quoted. Instead of a full
//! parser this is a line transducer with three states.
//!
//! The final file is written to a temporary file next to the target and
//! renamed over it, so an interrupted prune never leaves half a lockfile.

use std::borrow::Cow;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use nom::{
  IResult, Parser,
  bytes::complete::{tag, take_until},
  character::complete::space0,
};
use tracing::debug;

use crate::error::{Error, Result};
use crate::lockfile::Dialect;
use crate::metadata::Metadata;

pub const CLASSIC_HEADER: &str =
  "# THIS IS AN AUTOGENERATED FILE. DO NOT EDIT THIS FILE DIRECTLY.\n# yarn lockfile v1\n\n";

const RESOLUTION_FIELD: &str = "  resolution";
const RESOLUTION_PREFIX: &str = "  resolution: ";
const DEPENDENCIES_FIELD: &str = "  dependencies:";
const DEPENDENCY_INDENT: usize = 4;

/// The banner and `__metadata` block every berry lockfile starts with
pub fn berry_header(metadata: &Metadata) -> String {
  format!(
    "# This file is generated by running \"yarn install\" inside your project.\n# Manual changes might be lost - proceed with caution!\n\n{}:\n  version: {}\n  cacheKey: {}\n",
    Metadata::KEY,
    metadata.version,
    metadata.cache_key
  )
}

/// Where the rewriter is relative to a `dependencies:` block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanState {
  #[default]
  Other,
  InDependencies,
  AfterDependencies,
}

/// Line by line transducer from generic YAML to yarn's lockfile dialect.
///
/// Berry gets the full treatment. Classic lockfiles only need the complex key
/// unwrapping, top level framing and quote style.
#[derive(Debug)]
pub struct SymlRewriter {
  dialect: Dialect,
  state: ScanState,
}

impl SymlRewriter {
  pub fn new(dialect: Dialect) -> Self {
    Self {
      dialect,
      state: ScanState::Other,
    }
  }

  pub fn state(&self) -> ScanState {
    self.state
  }

  /// Rewrite one line of generic YAML (without its newline). The result
  /// carries its own line breaks, including the blank line that separates
  /// top level blocks.
  pub fn rewrite_line(&mut self, line: &str) -> String {
    if line.is_empty() {
      return "\n".to_string();
    }

    let line = unwrap_complex_key(line);
    if !line.starts_with(' ') {
      return format!("\n{}\n", frame_top_level_key(&line));
    }

    let line = match self.dialect {
      Dialect::Classic => line,
      Dialect::Berry => self.rewrite_nested(line),
    };
    format!("{}\n", line.replace('\'', "\""))
  }

  /// Rewrite a whole document, without header
  pub fn rewrite_str(&mut self, generic: &str) -> String {
    generic.lines().map(|line| self.rewrite_line(line)).collect()
  }

  fn rewrite_nested<'a>(&mut self, line: Cow<'a, str>) -> Cow<'a, str> {
    if line.starts_with(RESOLUTION_FIELD) {
      return Cow::Owned(quote_resolution(&line));
    }
    if line.starts_with(DEPENDENCIES_FIELD) {
      self.state = ScanState::InDependencies;
      return line;
    }
    if self.state == ScanState::InDependencies {
      if indentation(&line) < DEPENDENCY_INDENT {
        self.state = ScanState::AfterDependencies;
        return line;
      }
      return Cow::Owned(unquote_dependency_range(&line).into_owned());
    }
    line
  }
}

/// Long keys come out of the encoder as explicit `? key` / `: value` pairs.
/// Fold them back into a plain key line and a nested first field.
fn unwrap_complex_key(line: &str) -> Cow<'_, str> {
  if let Ok((key, _)) = parse_marker(line, "? ") {
    Cow::Borrowed(key)
  } else if let Ok((value, _)) = parse_marker(line, ":") {
    Cow::Owned(format!(" {value}"))
  } else {
    Cow::Borrowed(line)
  }
}

/// `lodash@^4.0.0` -> `"lodash@^4.0.0":`
fn frame_top_level_key(line: &str) -> String {
  let mut line = line.replace('\'', "\"");
  if !line.ends_with(':') {
    line.push(':');
  }
  if line.starts_with('"') {
    line
  } else {
    format!("\"{}\":", &line[..line.len() - 1])
  }
}

fn quote_resolution(line: &str) -> String {
  let Some(value) = line.strip_prefix(RESOLUTION_PREFIX) else {
    return line.to_string();
  };
  match value.chars().next() {
    Some('\'') => line.replace('\'', "\""),
    Some('"') | None => line.to_string(),
    Some(_) => format!("{RESOLUTION_PREFIX}\"{value}\""),
  }
}

/// `debug: "4"` -> `debug: 4`, while `semver: ">=1.0.0"` keeps its quotes
fn unquote_dependency_range(line: &str) -> Cow<'_, str> {
  let Ok((_, (prefix, range))) = parse_dependency_line(line) else {
    return Cow::Borrowed(line);
  };
  let quoted = range.len() >= 2 && (range.starts_with('"') || range.starts_with('\''));
  if quoted && !range.contains(['>', '<']) {
    Cow::Owned(format!("{prefix}{}", &range[1..range.len() - 1]))
  } else {
    Cow::Borrowed(line)
  }
}

/// Split `    name: range` into `("    name: ", "range")`
fn parse_dependency_line(line: &str) -> IResult<&str, (&str, &str)> {
  let (range, (indent, name, separator)) = (space0, take_until(": "), tag(": ")).parse(line)?;
  let prefix_len = indent.len() + name.len() + separator.len();
  Ok(("", (&line[..prefix_len], range)))
}

fn parse_marker<'a>(line: &'a str, marker: &'static str) -> IResult<&'a str, &'a str> {
  tag(marker).parse(line)
}

fn indentation(line: &str) -> usize {
  space0::<&str, nom::error::Error<&str>>
    .parse(line)
    .map_or(0, |(_, indent)| indent.len())
}

/// Rewrite `generic` into `target`, starting with `header`.
///
/// The output goes to a temporary file in the target's directory which only
/// replaces `target` once everything was written and flushed.
#[tracing::instrument(skip(generic, header))]
pub fn write_lockfile(
  generic: impl BufRead,
  header: &str,
  dialect: Dialect,
  target: &Path,
) -> Result<()> {
  let rewrite_io = |operation: &'static str| {
    move |source: std::io::Error| Error::RewriteIo {
      source,
      operation,
      path: target.to_path_buf(),
    }
  };

  let dir = target.parent().unwrap_or_else(|| Path::new("."));
  let mut tmp = tempfile::Builder::new()
    .prefix("yarn-tmp")
    .suffix(".lock")
    .tempfile_in(dir)
    .map_err(rewrite_io("create temporary lockfile for"))?;
  debug!(tmp = %tmp.path().display(), "writing temporary lockfile");

  {
    let mut writer = BufWriter::new(tmp.as_file_mut());
    writer
      .write_all(header.as_bytes())
      .map_err(rewrite_io("write to temporary lockfile for"))?;

    let mut rewriter = SymlRewriter::new(dialect);
    for line in generic.lines() {
      let line = line.map_err(rewrite_io("read generic lockfile for"))?;
      writer
        .write_all(rewriter.rewrite_line(&line).as_bytes())
        .map_err(rewrite_io("write to temporary lockfile for"))?;
    }

    writer
      .flush()
      .map_err(rewrite_io("flush temporary lockfile for"))?;
  }
  tmp
    .as_file()
    .sync_all()
    .map_err(rewrite_io("close temporary lockfile for"))?;

  tmp
    .persist(target)
    .map_err(|e| rewrite_io("finalize lockfile")(e.error))?;
  Ok(())
}
