//! Package registry types.
//!
//! The registry is the declarative input to the whole pipeline: an ordered,
//! immutable collection of package specifications. It is produced by an
//! external configuration layer (the CLI loads it from a TOML file) and is
//! never mutated after construction.
//!
//! # Naming
//!
//! A package's name is not stored; it is derived from its source URL as the
//! final path segment. Dependencies refer to these derived names, never to
//! URLs. Names must be unique within a registry.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while assembling a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
  /// Two entries derive the same package name.
  #[error("duplicate package name '{0}' in registry")]
  DuplicateName(String),
}

/// Specification of one buildable package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSpec {
  /// Source repository URL. The package name is the final path segment.
  pub url: String,

  /// Branch, tag, or commit to build.
  pub branch: String,

  /// Build-type label forwarded to the build system (e.g. `Release`).
  pub build_type: String,

  /// C++ standard the package requires (e.g. 17, 20), if any.
  pub cxx_standard: Option<u32>,

  /// Derived names of packages that must be installed before this one.
  pub dependencies: Vec<String>,

  /// Configuration defines, forwarded to the build system in order.
  pub defines: Vec<(String, String)>,
}

impl PackageSpec {
  /// Create a spec with default branch (`master`) and build type (`Release`).
  pub fn new(url: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      branch: "master".to_string(),
      build_type: "Release".to_string(),
      cxx_standard: None,
      dependencies: Vec::new(),
      defines: Vec::new(),
    }
  }

  /// The package name derived from the source URL.
  pub fn name(&self) -> &str {
    let trimmed = self.url.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
  }
}

/// Ordered, immutable collection of package specifications.
///
/// Iteration order is declaration order; dependency resolution is
/// deterministic relative to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageRegistry {
  specs: Vec<PackageSpec>,
}

impl PackageRegistry {
  /// Build a registry, rejecting duplicate derived names.
  ///
  /// # Errors
  ///
  /// Returns [`RegistryError::DuplicateName`] when two entries derive the
  /// same package name.
  pub fn new(specs: Vec<PackageSpec>) -> Result<Self, RegistryError> {
    for (i, spec) in specs.iter().enumerate() {
      if specs[..i].iter().any(|other| other.name() == spec.name()) {
        return Err(RegistryError::DuplicateName(spec.name().to_string()));
      }
    }
    Ok(Self { specs })
  }

  /// Look up a spec by derived name.
  pub fn get(&self, name: &str) -> Option<&PackageSpec> {
    self.specs.iter().find(|spec| spec.name() == name)
  }

  /// Whether a package with this derived name exists.
  pub fn contains(&self, name: &str) -> bool {
    self.get(name).is_some()
  }

  /// Iterate specs in declaration order.
  pub fn iter(&self) -> impl Iterator<Item = &PackageSpec> {
    self.specs.iter()
  }

  /// Number of registered packages.
  pub fn len(&self) -> usize {
    self.specs.len()
  }

  /// Whether the registry has no packages.
  pub fn is_empty(&self) -> bool {
    self.specs.is_empty()
  }
}
