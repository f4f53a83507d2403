//! # Prune
//!
//! Carve a subset of a yarn monorepo out into a standalone directory: the
//! selected workspace, every workspace it depends on, and a lockfile that only
//! lists what those workspaces need. Works with both yarn classic (v1) and
//! yarn berry lockfiles.
#![deny(clippy::all)]
pub mod assemble;
pub mod error;
pub mod graph;
pub mod ident;
pub mod locator;
pub mod lockfile;
pub mod merge;
pub mod metadata;
pub mod package;
pub mod parse;
pub mod prune;
pub mod serialize;
pub mod syml;
pub mod workspace;

pub use error::{Error, Result};
pub use lockfile::Dialect;
pub use prune::{PruneOptions, PruneSummary, prune};
