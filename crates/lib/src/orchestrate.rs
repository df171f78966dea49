//! Build orchestration.
//!
//! The orchestrator walks the resolved order strictly sequentially: fetch the
//! source, compute the build environment from the packages already installed,
//! drive the detected build system, record the outcome. Every package
//! installs into one shared prefix, so the set of successfully installed
//! packages only ever grows across a run and is never rolled back.
//!
//! # Fail-fast
//!
//! The first failure stops the whole remaining run, including packages with
//! no dependency relationship to the failed one. No attempt is made to work
//! out which remaining packages could still proceed. Packages that were never
//! attempted have no result.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::buildsys::{BuildSystem, BuildSystemError};
use crate::env::{EnvContext, compute_build_env};
use crate::fetch::{FetchError, SourceFetcher};
use crate::graph::{DependencyGraph, ResolveError};
use crate::process::ProcessRunner;
use crate::registry::{PackageRegistry, PackageSpec};

/// Errors that fail a single package's build.
#[derive(Debug, Error)]
pub enum BuildError {
  /// Fetching the source failed.
  #[error("fetch failed: {0}")]
  Fetch(#[from] FetchError),

  /// A configure/compile/install step failed.
  #[error(transparent)]
  BuildSystem(#[from] BuildSystemError),
}

/// Outcome of one attempted package build.
///
/// Created when the attempt concludes and immutable afterwards. Packages
/// never attempted have no result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildResult {
  /// Derived package name.
  pub name: String,

  /// Source URL the package was fetched from.
  pub url: String,

  /// Whether the package configured, compiled, and installed.
  pub success: bool,

  /// Human-readable outcome.
  pub message: String,
}

/// Options for an orchestration run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
  /// Shared prefix every package installs into.
  pub install_prefix: PathBuf,

  /// Directory holding per-package checkouts.
  pub build_dir: PathBuf,

  /// Parallelism hint for the compile step.
  pub jobs: usize,
}

impl Default for BuildOptions {
  fn default() -> Self {
    Self {
      install_prefix: PathBuf::from("/output"),
      build_dir: PathBuf::from("build"),
      jobs: default_jobs(),
    }
  }
}

/// Number of CPUs, for the default compile parallelism.
pub fn default_jobs() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

/// Top-level driver for a whole run.
pub struct Orchestrator<'a> {
  fetcher: &'a dyn SourceFetcher,
  runner: &'a dyn ProcessRunner,
}

impl<'a> Orchestrator<'a> {
  pub fn new(fetcher: &'a dyn SourceFetcher, runner: &'a dyn ProcessRunner) -> Self {
    Self { fetcher, runner }
  }

  /// Build every package in dependency order.
  ///
  /// Returns one [`BuildResult`] per attempted package, in attempt order.
  /// On the first failure the failed package gets a result and everything
  /// after it in the order is skipped.
  ///
  /// # Errors
  ///
  /// Only dependency resolution failures abort before any build is attempted;
  /// per-package failures are reported through the result list.
  pub async fn run_all(
    &self,
    registry: &PackageRegistry,
    options: &BuildOptions,
    ctx: &mut EnvContext,
  ) -> Result<Vec<BuildResult>, ResolveError> {
    let graph = DependencyGraph::from_registry(registry);
    let order = graph.resolve()?;
    info!(packages = order.len(), order = ?order, "resolved build order");

    let mut results = Vec::new();
    let mut built: BTreeSet<String> = BTreeSet::new();

    for name in &order {
      // Every name in the order originates from a registry entry.
      let Some(spec) = registry.get(name) else { continue };

      match self.build_package(spec, &built, options, ctx).await {
        Ok(()) => {
          info!(package = %name, "package installed");
          built.insert(name.clone());
          results.push(BuildResult {
            name: name.clone(),
            url: spec.url.clone(),
            success: true,
            message: "Built successfully".to_string(),
          });
        }
        Err(e) => {
          error!(package = %name, error = %e, "package build failed, stopping run");
          results.push(BuildResult {
            name: name.clone(),
            url: spec.url.clone(),
            success: false,
            message: e.to_string(),
          });
          break;
        }
      }
    }

    info!(
      attempted = results.len(),
      succeeded = built.len(),
      skipped = order.len() - results.len(),
      "run complete"
    );

    Ok(results)
  }

  async fn build_package(
    &self,
    spec: &PackageSpec,
    built: &BTreeSet<String>,
    options: &BuildOptions,
    ctx: &mut EnvContext,
  ) -> Result<(), BuildError> {
    let source_dir = options.build_dir.join(spec.name());

    info!(package = spec.name(), url = %spec.url, branch = %spec.branch, "fetching source");
    let commit = self.fetcher.fetch(&spec.url, &spec.branch, &source_dir)?;
    debug!(package = spec.name(), commit = %commit, "source ready");

    let env = compute_build_env(spec, built, &options.install_prefix, ctx);
    let system = BuildSystem::detect(&source_dir);
    debug!(package = spec.name(), system = ?system, "detected build system");

    info!(package = spec.name(), "configuring");
    system
      .configure(spec, &env, &options.install_prefix, &source_dir, self.runner)
      .await?;

    info!(package = spec.name(), jobs = options.jobs, "compiling");
    system.compile(&source_dir, options.jobs, self.runner).await?;

    info!(package = spec.name(), "installing");
    system.install(&source_dir, self.runner).await?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::registry::PackageSpec;
  use crate::testutil::{RecordingRunner, StubFetcher};
  use tempfile::TempDir;

  fn spec(name: &str, deps: &[&str]) -> PackageSpec {
    let mut spec = PackageSpec::new(format!("https://example.com/{}", name));
    spec.dependencies = deps.iter().map(|d| d.to_string()).collect();
    spec
  }

  fn registry(specs: Vec<PackageSpec>) -> PackageRegistry {
    PackageRegistry::new(specs).unwrap()
  }

  fn options(temp: &TempDir) -> BuildOptions {
    BuildOptions {
      install_prefix: temp.path().join("prefix"),
      build_dir: temp.path().join("build"),
      jobs: 2,
    }
  }

  #[tokio::test]
  async fn builds_all_packages_in_order() {
    let temp = TempDir::new().unwrap();
    let fetcher = StubFetcher::cmake_tree();
    let runner = RecordingRunner::new();

    let registry = registry(vec![spec("a", &[]), spec("b", &["a"])]);
    let mut ctx = EnvContext::default();

    let results = Orchestrator::new(&fetcher, &runner)
      .run_all(&registry, &options(&temp), &mut ctx)
      .await
      .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));
    assert_eq!(results[0].name, "a");
    assert_eq!(results[1].name, "b");
    assert_eq!(results[0].message, "Built successfully");

    // Three invocations per package: configure, compile, install.
    let recorded = runner.recorded();
    assert_eq!(recorded.len(), 6);
    assert_eq!(recorded[0].program, "cmake");
    assert_eq!(recorded[1].args, vec!["-j2"]);
    assert_eq!(recorded[2].args, vec!["install"]);
  }

  #[tokio::test]
  async fn built_dependencies_feed_later_environments() {
    let temp = TempDir::new().unwrap();
    let fetcher = StubFetcher::cmake_tree();
    let runner = RecordingRunner::new();

    let registry = registry(vec![spec("a", &[]), spec("b", &["a"])]);
    let mut ctx = EnvContext::default();

    Orchestrator::new(&fetcher, &runner)
      .run_all(&registry, &options(&temp), &mut ctx)
      .await
      .unwrap();

    let recorded = runner.recorded();
    // b's configure (4th invocation) sees discovery hints for the installed a.
    let configure_b = &recorded[3];
    assert_eq!(configure_b.program, "cmake");
    assert!(configure_b.args.iter().any(|a| a.starts_with("-Da_DIR=")));
    assert!(configure_b.args.iter().any(|a| a.starts_with("-Da_ROOT=")));
  }

  #[tokio::test]
  async fn fail_fast_skips_everything_after_the_failure() {
    let temp = TempDir::new().unwrap();
    let fetcher = StubFetcher::cmake_tree();
    // b's checkout directory appears in its invocations' cwd.
    let runner = RecordingRunner::failing_on("/b/build");

    // c does not depend on b, but is skipped anyway.
    let registry = registry(vec![spec("a", &[]), spec("b", &["a"]), spec("c", &[])]);
    let mut ctx = EnvContext::default();

    let results = Orchestrator::new(&fetcher, &runner)
      .run_all(&registry, &options(&temp), &mut ctx)
      .await
      .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results[0].success);
    assert_eq!(results[0].name, "a");
    assert!(!results[1].success);
    assert_eq!(results[1].name, "b");
    assert!(results[1].message.contains("configure failed"));
    assert!(!results.iter().any(|r| r.name == "c"));
  }

  #[tokio::test]
  async fn fetch_failure_is_terminal_for_the_run() {
    let temp = TempDir::new().unwrap();
    let fetcher = StubFetcher::cmake_tree().failing_for("example.com/b");
    let runner = RecordingRunner::new();

    let registry = registry(vec![spec("a", &[]), spec("b", &[]), spec("c", &[])]);
    let mut ctx = EnvContext::default();

    let results = Orchestrator::new(&fetcher, &runner)
      .run_all(&registry, &options(&temp), &mut ctx)
      .await
      .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results[0].success);
    assert!(!results[1].success);
    assert!(results[1].message.contains("fetch failed"));
    // Only a was ever configured/compiled/installed.
    assert_eq!(runner.recorded().len(), 3);
  }

  #[tokio::test]
  async fn cycle_aborts_with_no_results() {
    let temp = TempDir::new().unwrap();
    let fetcher = StubFetcher::cmake_tree();
    let runner = RecordingRunner::new();

    let registry = registry(vec![spec("a", &["b"]), spec("b", &["a"])]);
    let mut ctx = EnvContext::default();

    let result = Orchestrator::new(&fetcher, &runner)
      .run_all(&registry, &options(&temp), &mut ctx)
      .await;

    assert!(matches!(result, Err(ResolveError::Cycle { .. })));
    assert!(runner.recorded().is_empty());
  }

  #[tokio::test]
  async fn unresolved_dependency_does_not_stop_the_package() {
    let temp = TempDir::new().unwrap();
    let fetcher = StubFetcher::cmake_tree();
    let runner = RecordingRunner::new();

    let registry = registry(vec![spec("d", &["missing"])]);
    let mut ctx = EnvContext::default();

    let results = Orchestrator::new(&fetcher, &runner)
      .run_all(&registry, &options(&temp), &mut ctx)
      .await
      .unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].success);

    // No discovery hints for the unknown name, but search flags are present
    // because the package does declare a dependency.
    let configure = &runner.recorded()[0];
    assert!(!configure.args.iter().any(|a| a.contains("missing_DIR")));
    assert!(configure.args.iter().any(|a| a.starts_with("-DCMAKE_CXX_FLAGS=")));
  }

  #[tokio::test]
  async fn autotools_package_is_driven_through_configure() {
    let temp = TempDir::new().unwrap();
    let fetcher = StubFetcher::with_files(vec![("configure".to_string(), String::new())]);
    let runner = RecordingRunner::new();

    let registry = registry(vec![spec("auto", &[])]);
    let mut ctx = EnvContext::default();

    let results = Orchestrator::new(&fetcher, &runner)
      .run_all(&registry, &options(&temp), &mut ctx)
      .await
      .unwrap();

    assert!(results[0].success);
    let recorded = runner.recorded();
    assert!(recorded[0].program.ends_with("configure"));
    assert_eq!(recorded[0].args, vec![format!("--prefix={}", temp.path().join("prefix").display())]);
  }

  #[tokio::test]
  async fn empty_registry_builds_nothing() {
    let temp = TempDir::new().unwrap();
    let fetcher = StubFetcher::cmake_tree();
    let runner = RecordingRunner::new();

    let registry = PackageRegistry::new(Vec::new()).unwrap();
    let mut ctx = EnvContext::default();

    let results = Orchestrator::new(&fetcher, &runner)
      .run_all(&registry, &options(&temp), &mut ctx)
      .await
      .unwrap();

    assert!(results.is_empty());
    assert!(runner.recorded().is_empty());
  }
}
