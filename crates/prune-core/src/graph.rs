//! The workspace dependency graph and the entry resolver built on top of it.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use tracing::trace;

use crate::error::{Error, Result};

/// Name of the virtual node every workspace without internal dependencies
/// points at. It is never a prune target.
pub const ROOT_NODE: &str = "___ROOT___";

/// The graph query the entry resolver needs.
pub trait WorkspaceGraph {
  /// Every workspace `id` transitively depends on, not including `id` itself.
  /// The virtual root may be part of the answer.
  fn ancestors(&self, id: &str) -> Result<BTreeSet<String>>;
}

/// Directed graph over workspaces, with an edge from each dependent to each
/// of its internal dependencies.
#[derive(Debug, Default)]
pub struct PackageGraph {
  graph: DiGraph<String, ()>,
  nodes: BTreeMap<String, NodeIndex>,
}

impl PackageGraph {
  pub fn new() -> Self {
    let mut graph = Self::default();
    graph.add_node(ROOT_NODE);
    graph
  }

  /// Build from `workspace -> internal dependency names`
  pub fn from_internal_deps<'a>(
    workspaces: impl IntoIterator<Item = (&'a str, &'a BTreeSet<String>)>,
  ) -> Self {
    let mut graph = Self::new();
    for (name, deps) in workspaces {
      graph.add_node(name);
      if deps.is_empty() {
        graph.add_edge(name, ROOT_NODE);
      }
      for dep in deps {
        graph.add_edge(name, dep);
      }
    }
    graph
  }

  pub fn add_node(&mut self, name: &str) -> NodeIndex {
    if let Some(&idx) = self.nodes.get(name) {
      return idx;
    }
    let idx = self.graph.add_node(name.to_string());
    self.nodes.insert(name.to_string(), idx);
    idx
  }

  pub fn add_edge(&mut self, from: &str, to: &str) {
    let from = self.add_node(from);
    let to = self.add_node(to);
    self.graph.update_edge(from, to, ());
  }
}

impl WorkspaceGraph for PackageGraph {
  fn ancestors(&self, id: &str) -> Result<BTreeSet<String>> {
    let start = *self.nodes.get(id).ok_or_else(|| Error::GraphTraversal {
      node: id.to_string(),
      message: "node is not part of the workspace graph".to_string(),
    })?;

    let mut ancestors = BTreeSet::new();
    let mut dfs = Dfs::new(&self.graph, start);
    while let Some(idx) = dfs.next(&self.graph) {
      if idx != start {
        ancestors.insert(self.graph[idx].clone());
      }
    }
    Ok(ancestors)
  }
}

/// Compute the workspaces a prune of `scope` has to keep: the scope first,
/// then its internal dependencies in name order. The virtual root is dropped.
///
/// `is_workspace` decides whether a name is a known workspace.
#[tracing::instrument(skip(graph, is_workspace))]
pub fn resolve_targets<G: WorkspaceGraph + ?Sized>(
  scope: &str,
  graph: &G,
  is_workspace: impl Fn(&str) -> bool,
) -> Result<Vec<String>> {
  if !is_workspace(scope) {
    return Err(Error::InvalidScope {
      scope: scope.to_string(),
    });
  }

  let ancestors = graph.ancestors(scope)?;
  trace!(internal_deps = ?ancestors, "resolved internal dependencies");

  let mut targets = vec![scope.to_string()];
  targets.extend(
    ancestors
      .into_iter()
      .filter(|name| name != ROOT_NODE && name != scope),
  );
  Ok(targets)
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use rstest::{fixture, rstest};

  /// app -> ui -> utils, app -> utils, docs standalone
  #[fixture]
  fn graph() -> PackageGraph {
    let deps = BTreeMap::from([
      ("app", BTreeSet::from(["ui".to_string(), "utils".to_string()])),
      ("ui", BTreeSet::from(["utils".to_string()])),
      ("utils", BTreeSet::new()),
      ("docs", BTreeSet::new()),
    ]);
    PackageGraph::from_internal_deps(deps.iter().map(|(k, v)| (*k, v)))
  }

  fn known(name: &str) -> bool {
    ["app", "ui", "utils", "docs"].contains(&name)
  }

  #[rstest]
  #[case("app", vec!["app", "ui", "utils"])]
  #[case("ui", vec!["ui", "utils"])]
  #[case("utils", vec!["utils"])]
  #[case("docs", vec!["docs"])]
  fn test_resolve_targets(graph: PackageGraph, #[case] scope: &str, #[case] expected: Vec<&str>) {
    let targets = resolve_targets(scope, &graph, known).unwrap();
    assert_eq!(targets, expected);
  }

  #[rstest]
  fn test_ancestors_include_root(graph: PackageGraph) {
    let ancestors = graph.ancestors("ui").unwrap();
    assert!(ancestors.contains(ROOT_NODE));
    assert!(!ancestors.contains("ui"));
  }

  #[rstest]
  fn test_invalid_scope(graph: PackageGraph) {
    let err = resolve_targets("missing", &graph, known).unwrap_err();
    assert!(matches!(err, Error::InvalidScope { scope } if scope == "missing"));
  }

  #[test]
  fn test_scope_missing_from_graph_is_traversal_error() {
    let graph = PackageGraph::new();
    let err = resolve_targets("app", &graph, |_| true).unwrap_err();
    assert!(matches!(err, Error::GraphTraversal { .. }));
  }

  #[test]
  fn test_cycles_terminate() {
    let mut graph = PackageGraph::new();
    graph.add_edge("a", "b");
    graph.add_edge("b", "a");
    let targets = resolve_targets("a", &graph, |_| true).unwrap();
    assert_eq!(targets, vec!["a", "b"]);
  }
}
