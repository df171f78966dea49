//! Dependency graph and build-order resolution.
//!
//! This module turns a [`PackageRegistry`] into a directed graph over package
//! names and computes a linear build order where every package appears after
//! all of its dependencies.
//!
//! A dependency name that matches no registry entry is logged and the edge is
//! dropped; the referencing package is still built, just without a guaranteed
//! ordering against the missing name. A cycle fails resolution outright;
//! there is no heuristic break point.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;
use tracing::warn;

use crate::registry::PackageRegistry;

/// Errors that can occur during build-order resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// The registry contains a dependency cycle.
  #[error("dependency cycle detected involving '{package}'")]
  Cycle { package: String },
}

/// Visit state for the depth-first walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
  Unvisited,
  InProgress,
  Done,
}

/// Directed dependency graph over package names.
///
/// Edges point from a dependency to its dependent, matching the order in
/// which packages must be installed. Nodes are created in registry order,
/// which makes resolution deterministic for a fixed registry.
pub struct DependencyGraph {
  graph: DiGraph<String, ()>,
  nodes: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
  /// Build the graph from a registry.
  ///
  /// Unresolved dependency names are warned about and skipped; they never
  /// fail graph construction.
  pub fn from_registry(registry: &PackageRegistry) -> Self {
    let mut graph = DiGraph::new();
    let mut nodes = HashMap::new();

    for spec in registry.iter() {
      let idx = graph.add_node(spec.name().to_string());
      nodes.insert(spec.name().to_string(), idx);
    }

    for spec in registry.iter() {
      let dependent_idx = nodes[spec.name()];

      for dep in &spec.dependencies {
        match nodes.get(dep.as_str()) {
          Some(&dep_idx) => {
            // Edge from dependency to dependent
            graph.add_edge(dep_idx, dependent_idx, ());
          }
          None => {
            warn!(
              package = spec.name(),
              dependency = %dep,
              "dependency not found in registry, edge dropped"
            );
          }
        }
      }
    }

    Self { graph, nodes }
  }

  /// Compute the build order.
  ///
  /// Post-order depth-first traversal with three-state marking: packages are
  /// visited in registry order, and each package's dependencies are visited
  /// (in declaration order) before the package itself is appended. The
  /// returned order is stable and reproducible for a fixed registry.
  ///
  /// # Errors
  ///
  /// Returns [`ResolveError::Cycle`] naming the package at which a cycle was
  /// detected. No partial order is produced.
  pub fn resolve(&self) -> Result<Vec<String>, ResolveError> {
    let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
    let mut order = Vec::with_capacity(self.graph.node_count());

    for idx in self.graph.node_indices() {
      self.visit(idx, &mut marks, &mut order)?;
    }

    Ok(order)
  }

  fn visit(&self, idx: NodeIndex, marks: &mut [Mark], order: &mut Vec<String>) -> Result<(), ResolveError> {
    match marks[idx.index()] {
      Mark::Done => return Ok(()),
      Mark::InProgress => {
        return Err(ResolveError::Cycle {
          package: self.graph[idx].clone(),
        });
      }
      Mark::Unvisited => {}
    }

    marks[idx.index()] = Mark::InProgress;

    for dep_idx in self.dependency_indices(idx) {
      self.visit(dep_idx, marks, order)?;
    }

    marks[idx.index()] = Mark::Done;
    order.push(self.graph[idx].clone());
    Ok(())
  }

  /// The direct dependencies of a package, in declaration order.
  pub fn dependencies_of(&self, name: &str) -> Vec<String> {
    let Some(&idx) = self.nodes.get(name) else {
      return Vec::new();
    };

    self
      .dependency_indices(idx)
      .into_iter()
      .map(|dep_idx| self.graph[dep_idx].clone())
      .collect()
  }

  /// Incoming neighbors (dependencies) in edge-insertion order.
  ///
  /// petgraph iterates neighbors most-recently-added first; reversing
  /// restores the declaration order the edges were added in.
  fn dependency_indices(&self, idx: NodeIndex) -> Vec<NodeIndex> {
    let mut deps: Vec<NodeIndex> = self.graph.neighbors_directed(idx, Direction::Incoming).collect();
    deps.reverse();
    deps
  }

  /// Number of packages in the graph.
  pub fn package_count(&self) -> usize {
    self.graph.node_count()
  }
}
