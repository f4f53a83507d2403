//! Error types for pruning a monorepo.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for prune operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while pruning.
///
/// Every variant names the operation and the path or identifier that failed.
/// Nothing in the pipeline recovers from these, they bubble up to the binary.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
  /// The requested scope is not a workspace of this repository.
  #[error("invalid scope: package {scope} not found")]
  #[diagnostic(
    code(prune::invalid_scope),
    help("Pass the `name` field of one of the workspace package.json files")
  )]
  InvalidScope { scope: String },

  #[error("this command is not yet implemented for {manager}")]
  #[diagnostic(
    code(prune::unsupported_package_manager),
    help("Only yarn classic (v1) and yarn berry (v2+) repositories can be pruned")
  )]
  UnsupportedPackageManager { manager: String },

  #[error("only yarn v2/v3 with `nodeLinker: node-modules` is supported at this time (found `{linker}`)")]
  #[diagnostic(
    code(prune::unsupported_linker),
    help("Set `nodeLinker: node-modules` in .yarnrc.yml")
  )]
  UnsupportedLinkerMode { linker: String },

  #[error("could not traverse the dependency graph from {node}: {message}")]
  #[diagnostic(code(prune::graph_traversal))]
  GraphTraversal { node: String, message: String },

  #[error("failed to create folder {} for {target}: {source}", path.display())]
  #[diagnostic(code(prune::directory_creation))]
  DirectoryCreation {
    #[source]
    source: std::io::Error,
    path: PathBuf,
    target: String,
  },

  #[error("failed to copy {target} into {}: {source}", path.display())]
  #[diagnostic(code(prune::copy))]
  Copy {
    #[source]
    source: std::io::Error,
    path: PathBuf,
    target: String,
  },

  #[error("failed to materialize sub-lockfile: {source}")]
  #[diagnostic(
    code(prune::serialization),
    help(
      "This can happen if your lockfile contains merge conflicts or is somehow corrupted. Please report this if it occurs"
    )
  )]
  Serialization {
    #[source]
    source: serde_yaml::Error,
  },

  /// Reading, flushing or renaming while writing the final lockfile.
  #[error("failed to {operation} {}: {source}", path.display())]
  #[diagnostic(code(prune::rewrite_io))]
  RewriteIo {
    #[source]
    source: std::io::Error,
    operation: &'static str,
    path: PathBuf,
  },

  #[error("I/O error during {operation}{}: {source}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
  #[diagnostic(code(prune::io))]
  Io {
    #[source]
    source: std::io::Error,
    path: Option<PathBuf>,
    operation: String,
  },

  #[error("JSON parsing error in {}: {source}", path.display())]
  #[diagnostic(code(prune::json))]
  Json {
    #[source]
    source: serde_json::Error,
    path: PathBuf,
  },

  #[error("YAML parsing error in {}: {source}", path.display())]
  #[diagnostic(code(prune::yaml))]
  Yaml {
    #[source]
    source: serde_yaml::Error,
    path: PathBuf,
  },

  #[error("failed to parse lockfile at {}: {message}", path.display())]
  #[diagnostic(
    code(prune::lockfile_parse),
    help("The lockfile may be corrupted. Try regenerating it with `yarn install`")
  )]
  LockfileParse { path: PathBuf, message: String },

  #[error("lockfile not found at {}", path.display())]
  #[diagnostic(
    code(prune::missing_lockfile),
    help("Run `yarn install` to generate a lockfile before pruning")
  )]
  MissingLockfile { path: PathBuf },

  #[error("invalid manifest {}: {message}", path.display())]
  #[diagnostic(code(prune::manifest_invalid))]
  ManifestInvalid { path: PathBuf, message: String },
}

impl Error {
  pub(crate) fn io(source: std::io::Error, path: impl Into<PathBuf>, operation: &str) -> Self {
    Self::Io {
      source,
      path: Some(path.into()),
      operation: operation.to_string(),
    }
  }
}
