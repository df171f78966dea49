//! srcpack command-line interface.
//!
//! Thin shell around `srcpack-lib`: parses arguments, loads the TOML package
//! registry, wires logging, and maps the run outcome to the process exit
//! status.

mod cmd;
mod config;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// srcpack - build native packages from source into a shared prefix
#[derive(Parser)]
#[command(name = "srcpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Fetch, build, and install every package in the registry
  Build {
    /// Path to the package registry file
    #[arg(default_value = "packages.toml")]
    config: PathBuf,

    /// Installation prefix shared by all packages
    #[arg(long, default_value = "/output")]
    install_prefix: PathBuf,

    /// Directory for per-package checkouts and build trees
    #[arg(long, default_value = "build")]
    build_dir: PathBuf,

    /// Directory the build report is written to
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Parallel jobs for the compile step (default: CPU count)
    #[arg(short, long)]
    jobs: Option<usize>,
  },

  /// Resolve and print the build order without building anything
  Plan {
    /// Path to the package registry file
    #[arg(default_value = "packages.toml")]
    config: PathBuf,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_filter = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
    .without_time()
    .init();

  match cli.command {
    Commands::Build {
      config,
      install_prefix,
      build_dir,
      output_dir,
      jobs,
    } => cmd::build::cmd_build(&config, &install_prefix, &build_dir, &output_dir, jobs),
    Commands::Plan { config } => cmd::plan::cmd_plan(&config),
  }
}
