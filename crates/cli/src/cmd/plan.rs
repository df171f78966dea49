//! Implementation of the `srcpack plan` command.
//!
//! Resolves the registry into a build order and prints it without fetching
//! or building anything. Useful for sanity-checking dependency declarations.

use std::path::Path;

use anyhow::{Context, Result};

use srcpack_lib::graph::DependencyGraph;

use crate::config::load_registry;

/// Execute the plan command.
pub fn cmd_plan(config: &Path) -> Result<()> {
  let registry = load_registry(config)?;

  let graph = DependencyGraph::from_registry(&registry);
  let order = graph.resolve().context("Dependency resolution failed")?;

  println!("Packages: {}", registry.len());
  println!("Build order:");
  for (idx, name) in order.iter().enumerate() {
    println!("  {}. {}", idx + 1, name);
  }

  Ok(())
}
