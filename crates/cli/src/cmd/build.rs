//! Implementation of the `srcpack build` command.
//!
//! Loads the registry, builds every package in dependency order into the
//! shared prefix, writes the build report, and prints a per-package summary.
//! The process exits non-zero when any attempted package failed or when
//! packages were skipped because of an earlier failure.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use srcpack_lib::env::EnvContext;
use srcpack_lib::fetch::GitFetcher;
use srcpack_lib::orchestrate::{BuildOptions, Orchestrator, default_jobs};
use srcpack_lib::process::SystemRunner;
use srcpack_lib::report::Report;

use crate::config::load_registry;
use crate::output;

/// Execute the build command.
pub fn cmd_build(
  config: &Path,
  install_prefix: &Path,
  build_dir: &Path,
  output_dir: &Path,
  jobs: Option<usize>,
) -> Result<()> {
  let registry = load_registry(config)?;

  if registry.is_empty() {
    println!("No packages in registry, nothing to build");
    return Ok(());
  }

  let options = BuildOptions {
    install_prefix: dunce::simplified(install_prefix).to_path_buf(),
    build_dir: dunce::simplified(build_dir).to_path_buf(),
    jobs: jobs.unwrap_or_else(default_jobs),
  };

  info!(
    packages = registry.len(),
    prefix = %options.install_prefix.display(),
    jobs = options.jobs,
    "starting build run"
  );

  let fetcher = GitFetcher;
  let runner = SystemRunner;
  let orchestrator = Orchestrator::new(&fetcher, &runner);
  let mut ctx = EnvContext::from_env();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let results = rt
    .block_on(orchestrator.run_all(&registry, &options, &mut ctx))
    .context("Dependency resolution failed")?;

  let report = Report::from_results(&results);
  report
    .write_to(output_dir)
    .context("Failed to write build report")?;

  println!();
  for result in &results {
    if result.success {
      output::print_success(&result.name);
    } else {
      output::print_error(&format!("{}: {}", result.name, result.message));
    }
  }

  let skipped = registry.len() - results.len();
  println!();
  println!(
    "{} successful, {} failed, {} skipped",
    report.successful(),
    report.failed(),
    skipped
  );
  println!("Report: {}", output_dir.join("build_report.json").display());

  if report.failed() > 0 || skipped > 0 {
    std::process::exit(1);
  }

  Ok(())
}
