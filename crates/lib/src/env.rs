//! Build environment propagation.
//!
//! Once a dependency is installed into the shared prefix, every later package
//! must be told where to find its headers, libraries, and pkg-config
//! metadata. [`compute_build_env`] turns a registry entry plus the set of
//! already-installed packages into the flags and hints its build system
//! needs; the adapters decide how to spell each piece (generator defines vs.
//! environment variables).
//!
//! # Search-path accumulation
//!
//! The pkg-config search path accumulates for the life of one orchestration
//! run and is only reset by starting a new run. Instead of mutating the real
//! process environment it lives in an explicit [`EnvContext`] threaded
//! through the pipeline, so tests can observe and reset it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::registry::PackageSpec;

/// Run-wide environment state shared by all package builds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvContext {
  /// C compiler override (`CC`), if any.
  pub cc: Option<String>,

  /// C++ compiler override (`CXX`), if any.
  pub cxx: Option<String>,

  pkg_config_dirs: Vec<PathBuf>,
}

impl EnvContext {
  /// Capture compiler overrides from the invoking environment.
  pub fn from_env() -> Self {
    Self {
      cc: std::env::var("CC").ok(),
      cxx: std::env::var("CXX").ok(),
      pkg_config_dirs: Vec::new(),
    }
  }

  /// Append a pkg-config directory unless it is already present.
  ///
  /// Returns `true` when the directory was newly added.
  pub fn add_pkg_config_dir(&mut self, dir: PathBuf) -> bool {
    if self.pkg_config_dirs.contains(&dir) {
      return false;
    }
    debug!(dir = %dir.display(), "adding pkg-config search directory");
    self.pkg_config_dirs.push(dir);
    true
  }

  /// The accumulated `PKG_CONFIG_PATH` value, if any directory was added.
  pub fn pkg_config_path(&self) -> Option<String> {
    if self.pkg_config_dirs.is_empty() {
      return None;
    }
    let joined = self
      .pkg_config_dirs
      .iter()
      .map(|dir| dir.to_string_lossy().into_owned())
      .collect::<Vec<_>>()
      .join(":");
    Some(joined)
  }
}

/// Computed environment for one package build.
///
/// Pure data handed to the build-system adapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildEnv {
  /// C compiler override.
  pub cc: Option<String>,

  /// C++ compiler override.
  pub cxx: Option<String>,

  /// `-std=c++{n}` flag, when the package declares a standard.
  pub std_flag: Option<String>,

  /// Header search flags (`-I`), present only for packages with dependencies.
  pub include_flags: Vec<String>,

  /// Library search flags (`-L`), present only for packages with dependencies.
  pub link_flags: Vec<String>,

  /// CMake cache hints in emission order: build type, then either the
  /// language standard (no dependencies) or the prefix path plus per-dependency
  /// discovery hints.
  pub cmake_hints: Vec<(String, String)>,

  /// Value for `PKG_CONFIG_PATH`, reflecting everything accumulated so far.
  pub pkg_config_path: Option<String>,
}

/// Compute the build environment for one package.
///
/// For a package with no dependencies, only its own language standard and
/// build type are reflected. For a package with dependencies, the shared
/// prefix is exposed through include/link search flags, a `CMAKE_PREFIX_PATH`
/// hint, and `{dep}_DIR`/`{dep}_ROOT` discovery hints (exact-case and
/// lower-case) for every dependency that is already in `built`. A declared
/// dependency missing from `built` gets no hints; that is a detectable
/// misconfiguration, not an error here.
///
/// Side effect: when `{prefix}/lib/pkgconfig` exists on disk it is appended
/// exactly once to the context's pkg-config search path, which all later
/// invocations in the run observe.
pub fn compute_build_env(
  spec: &PackageSpec,
  built: &BTreeSet<String>,
  install_prefix: &Path,
  ctx: &mut EnvContext,
) -> BuildEnv {
  let prefix = install_prefix.to_string_lossy().into_owned();

  let mut env = BuildEnv {
    cc: ctx.cc.clone(),
    cxx: ctx.cxx.clone(),
    std_flag: spec.cxx_standard.map(|std| format!("-std=c++{}", std)),
    ..BuildEnv::default()
  };

  env.cmake_hints.push(("CMAKE_BUILD_TYPE".to_string(), spec.build_type.clone()));

  if spec.dependencies.is_empty() {
    if let Some(std) = spec.cxx_standard {
      env.cmake_hints.push(("CMAKE_CXX_STANDARD".to_string(), std.to_string()));
      env
        .cmake_hints
        .push(("CMAKE_CXX_STANDARD_REQUIRED".to_string(), "ON".to_string()));
    }
  } else {
    env.cmake_hints.push(("CMAKE_PREFIX_PATH".to_string(), prefix.clone()));
    env.include_flags.push(format!("-I{}/include", prefix));
    env.link_flags.push(format!("-L{}/lib", prefix));

    for dep in &spec.dependencies {
      if !built.contains(dep) {
        debug!(
          package = spec.name(),
          dependency = %dep,
          "dependency not installed yet, no discovery hints emitted"
        );
        continue;
      }

      // Some find modules probe exact-case variables, others lower-case.
      env.cmake_hints.push((format!("{}_DIR", dep), prefix.clone()));
      env.cmake_hints.push((format!("{}_ROOT", dep), prefix.clone()));
      let lower = dep.to_lowercase();
      env.cmake_hints.push((format!("{}_DIR", lower), prefix.clone()));
      env.cmake_hints.push((format!("{}_ROOT", lower), prefix.clone()));
    }

    let pkgconfig_dir = install_prefix.join("lib").join("pkgconfig");
    if pkgconfig_dir.exists() {
      ctx.add_pkg_config_dir(pkgconfig_dir);
    }
  }

  env.pkg_config_path = ctx.pkg_config_path();
  env
}
