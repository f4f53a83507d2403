//! Folding per-workspace partial lockfiles into one combined lockfile.
//!
//! The two dialects use different conflict policies:
//! - classic: the last workspace to write a raw key wins
//! - berry: the first entry seen for a resolved package wins, and every raw
//!   key that resolved to it is folded into one composite key

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::lockfile::LockfileEntries;
use crate::locator::Locator;
use crate::package::LockfileEntry;

/// Write every entry of `partial` into `combined`, overwriting existing keys.
pub fn merge_classic(combined: &mut LockfileEntries, partial: &LockfileEntries) {
  for (key, entry) in partial {
    if let Some(previous) = combined.insert(key.clone(), entry.clone()) {
      if previous != *entry {
        trace!(%key, "overwrote lockfile entry from an earlier workspace");
      }
    }
  }
}

/// One physical package and every raw key that resolved to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeduplicationRecord {
  pub entry: LockfileEntry,
  pub aliases: BTreeSet<String>,
}

impl DeduplicationRecord {
  /// Aliases in lexicographic order joined with `", "`, e.g.
  /// `pkg@^1.0.0, pkg@~1.0.1`
  pub fn composite_key(&self) -> String {
    self
      .aliases
      .iter()
      .map(String::as_str)
      .collect::<Vec<_>>()
      .join(", ")
  }
}

/// Accumulates berry partial lockfiles keyed by resolved identity.
#[derive(Debug, Default)]
pub struct BerryDeduplicator {
  records: BTreeMap<Locator, DeduplicationRecord>,
}

impl BerryDeduplicator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&mut self, partial: &LockfileEntries) {
    for (key, entry) in partial {
      let locator = Locator::resolved(key, &entry.version);
      self
        .records
        .entry(locator)
        .or_insert_with(|| DeduplicationRecord {
          entry: entry.clone(),
          aliases: BTreeSet::new(),
        })
        .aliases
        .insert(key.clone());
    }
  }

  pub fn records(&self) -> impl Iterator<Item = (&Locator, &DeduplicationRecord)> {
    self.records.iter()
  }

  /// Write one `(composite key, entry)` pair per resolved package into `combined`
  pub fn finish_into(self, combined: &mut LockfileEntries) {
    for record in self.records.into_values() {
      combined.insert(record.composite_key(), record.entry);
    }
  }
}
