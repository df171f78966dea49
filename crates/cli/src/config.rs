//! Registry file loading.
//!
//! Packages are declared in a TOML file:
//!
//! ```toml
//! [[package]]
//! url = "https://github.com/example/gflags"
//! branch = "master"
//! build_type = "Release"
//! cxx_standard = 17
//! define = [["BUILD_SHARED_LIBS", "OFF"], ["BUILD_STATIC_LIBS", "ON"]]
//!
//! [[package]]
//! url = "https://github.com/example/glog"
//! cxx_standard = 17
//! dependencies = ["gflags"]
//! ```
//!
//! Dependencies refer to derived package names (the final URL path segment),
//! not URLs.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use srcpack_lib::registry::{PackageRegistry, PackageSpec};

#[derive(Debug, Deserialize)]
struct RegistryFile {
  #[serde(default)]
  package: Vec<PackageEntry>,
}

#[derive(Debug, Deserialize)]
struct PackageEntry {
  url: String,

  #[serde(default = "default_branch")]
  branch: String,

  #[serde(default = "default_build_type")]
  build_type: String,

  #[serde(default, alias = "c++")]
  cxx_standard: Option<u32>,

  #[serde(default)]
  dependencies: Vec<String>,

  #[serde(default)]
  define: Vec<(String, String)>,
}

fn default_branch() -> String {
  "master".to_string()
}

fn default_build_type() -> String {
  "Release".to_string()
}

/// Load a package registry from a TOML file.
pub fn load_registry(path: &Path) -> Result<PackageRegistry> {
  let raw = fs::read_to_string(path).with_context(|| format!("Failed to read registry file: {}", path.display()))?;

  let file: RegistryFile =
    toml::from_str(&raw).with_context(|| format!("Failed to parse registry file: {}", path.display()))?;

  let specs = file
    .package
    .into_iter()
    .map(|entry| PackageSpec {
      url: entry.url,
      branch: entry.branch,
      build_type: entry.build_type,
      cxx_standard: entry.cxx_standard,
      dependencies: entry.dependencies,
      defines: entry.define,
    })
    .collect();

  PackageRegistry::new(specs).with_context(|| format!("Invalid registry file: {}", path.display()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn write_registry(content: &str) -> (TempDir, std::path::PathBuf) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("packages.toml");
    fs::write(&path, content).unwrap();
    (temp, path)
  }

  #[test]
  fn loads_packages_with_defaults() {
    let (_temp, path) = write_registry(
      r#"
      [[package]]
      url = "https://github.com/example/gflags"
      "#,
    );

    let registry = load_registry(&path).unwrap();
    assert_eq!(registry.len(), 1);

    let spec = registry.get("gflags").unwrap();
    assert_eq!(spec.branch, "master");
    assert_eq!(spec.build_type, "Release");
    assert!(spec.cxx_standard.is_none());
  }

  #[test]
  fn loads_full_entry() {
    let (_temp, path) = write_registry(
      r#"
      [[package]]
      url = "https://github.com/example/glog"
      branch = "v0.6.0"
      build_type = "Debug"
      cxx_standard = 17
      dependencies = ["gflags"]
      define = [["WITH_GFLAGS", "ON"], ["BUILD_SHARED_LIBS", "OFF"]]
      "#,
    );

    let registry = load_registry(&path).unwrap();
    let spec = registry.get("glog").unwrap();
    assert_eq!(spec.branch, "v0.6.0");
    assert_eq!(spec.build_type, "Debug");
    assert_eq!(spec.cxx_standard, Some(17));
    assert_eq!(spec.dependencies, vec!["gflags"]);
    assert_eq!(
      spec.defines,
      vec![
        ("WITH_GFLAGS".to_string(), "ON".to_string()),
        ("BUILD_SHARED_LIBS".to_string(), "OFF".to_string()),
      ]
    );
  }

  #[test]
  fn accepts_cxx_standard_alias() {
    let (_temp, path) = write_registry(
      r#"
      [[package]]
      url = "https://github.com/example/yalantinglibs"
      "c++" = 20
      "#,
    );

    let registry = load_registry(&path).unwrap();
    assert_eq!(registry.get("yalantinglibs").unwrap().cxx_standard, Some(20));
  }

  #[test]
  fn empty_file_is_an_empty_registry() {
    let (_temp, path) = write_registry("");
    let registry = load_registry(&path).unwrap();
    assert!(registry.is_empty());
  }

  #[test]
  fn missing_file_is_an_error() {
    let result = load_registry(Path::new("/nonexistent/packages.toml"));
    assert!(result.is_err());
  }

  #[test]
  fn duplicate_names_are_an_error() {
    let (_temp, path) = write_registry(
      r#"
      [[package]]
      url = "https://github.com/one/zlib"

      [[package]]
      url = "https://github.com/two/zlib"
      "#,
    );

    assert!(load_registry(&path).is_err());
  }
}
