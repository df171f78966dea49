//! Build-system adapters.
//!
//! Every package is driven through the same three steps (configure, compile,
//! install) by the adapter for its detected build system. CMake projects get
//! their configuration as generator defines on the `cmake` command line;
//! autotools projects get it as environment variables on `./configure`.
//!
//! Detection prefers a CMake descriptor when both are present. A tree with
//! neither descriptor is driven down the CMake path anyway: a deliberately
//! permissive default, since some projects ship non-standard top-level
//! layouts. The warning is the only trace of that guess.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::env::BuildEnv;
use crate::process::{Invocation, ProcessRunner};
use crate::registry::PackageSpec;

/// Errors from the configure/compile/install steps.
///
/// Each variant is fatal to the owning package's build; there is no retry
/// within the adapter.
#[derive(Debug, Error)]
pub enum BuildSystemError {
  #[error("configure failed: {detail}")]
  Configure { detail: String },

  #[error("compile failed: {detail}")]
  Compile { detail: String },

  #[error("install failed: {detail}")]
  Install { detail: String },
}

/// Which step an invocation belongs to, for error conversion.
#[derive(Debug, Clone, Copy)]
enum Step {
  Configure,
  Compile,
  Install,
}

impl Step {
  fn failure(self, detail: String) -> BuildSystemError {
    match self {
      Step::Configure => BuildSystemError::Configure { detail },
      Step::Compile => BuildSystemError::Compile { detail },
      Step::Install => BuildSystemError::Install { detail },
    }
  }
}

/// Build system driving one source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildSystem {
  /// CMake project (`CMakeLists.txt` at the source root).
  CMake,
  /// Autotools project (`configure` script or bootstrap descriptor).
  Autotools,
}

impl BuildSystem {
  /// Detect the build system for a source tree.
  pub fn detect(source_dir: &Path) -> Self {
    if source_dir.join("CMakeLists.txt").exists() {
      BuildSystem::CMake
    } else if source_dir.join("configure").exists() || source_dir.join("autogen.sh").exists() {
      BuildSystem::Autotools
    } else {
      warn!(dir = %source_dir.display(), "unknown build system, attempting cmake");
      BuildSystem::CMake
    }
  }

  /// Run the configure step.
  pub async fn configure(
    &self,
    spec: &PackageSpec,
    env: &BuildEnv,
    install_prefix: &Path,
    source_dir: &Path,
    runner: &dyn ProcessRunner,
  ) -> Result<(), BuildSystemError> {
    match self {
      BuildSystem::CMake => configure_cmake(spec, env, install_prefix, source_dir, runner).await,
      BuildSystem::Autotools => configure_autotools(env, install_prefix, source_dir, runner).await,
    }
  }

  /// Run the compile step with a parallelism hint.
  pub async fn compile(
    &self,
    source_dir: &Path,
    jobs: usize,
    runner: &dyn ProcessRunner,
  ) -> Result<(), BuildSystemError> {
    let invocation = Invocation::new("make", self.work_dir(source_dir)).arg(format!("-j{}", jobs));
    run_step(runner, &invocation, Step::Compile).await
  }

  /// Run the install step.
  pub async fn install(&self, source_dir: &Path, runner: &dyn ProcessRunner) -> Result<(), BuildSystemError> {
    let invocation = Invocation::new("make", self.work_dir(source_dir)).arg("install");
    run_step(runner, &invocation, Step::Install).await
  }

  /// Directory compile/install run in: the build subdirectory for CMake,
  /// the source root for autotools.
  fn work_dir(&self, source_dir: &Path) -> PathBuf {
    match self {
      BuildSystem::CMake => source_dir.join("build"),
      BuildSystem::Autotools => source_dir.to_path_buf(),
    }
  }
}

async fn configure_cmake(
  spec: &PackageSpec,
  env: &BuildEnv,
  install_prefix: &Path,
  source_dir: &Path,
  runner: &dyn ProcessRunner,
) -> Result<(), BuildSystemError> {
  let build_dir = source_dir.join("build");
  fs::create_dir_all(&build_dir).map_err(|e| BuildSystemError::Configure {
    detail: format!("failed to create build directory '{}': {}", build_dir.display(), e),
  })?;

  let mut invocation = Invocation::new("cmake", &build_dir).arg("..");

  if let Some(cc) = &env.cc {
    invocation = invocation.arg(format!("-DCMAKE_C_COMPILER={}", cc));
  }
  if let Some(cxx) = &env.cxx {
    invocation = invocation.arg(format!("-DCMAKE_CXX_COMPILER={}", cxx));
  }

  invocation = invocation.arg(format!("-DCMAKE_INSTALL_PREFIX={}", install_prefix.display()));

  for (key, value) in &env.cmake_hints {
    invocation = invocation.arg(format!("-D{}={}", key, value));
  }

  if !env.include_flags.is_empty() {
    let mut flags: Vec<&str> = Vec::new();
    if let Some(std_flag) = &env.std_flag {
      flags.push(std_flag);
    }
    flags.extend(env.include_flags.iter().map(String::as_str));
    invocation = invocation.arg(format!("-DCMAKE_CXX_FLAGS={}", flags.join(" ")));
  }

  if !env.link_flags.is_empty() {
    let link = env.link_flags.join(" ");
    invocation = invocation.arg(format!("-DCMAKE_EXE_LINKER_FLAGS={}", link));
    invocation = invocation.arg(format!("-DCMAKE_SHARED_LINKER_FLAGS={}", link));
  }

  for (key, value) in &spec.defines {
    invocation = invocation.arg(format!("-D{}={}", key, value));
  }

  // Tests are off unless the package explicitly toggles them.
  if !spec.defines.iter().any(|(key, _)| key.contains("BUILD_TESTING")) {
    invocation = invocation.arg("-DBUILD_TESTING=OFF");
  }

  if let Some(path) = &env.pkg_config_path {
    invocation = invocation.env("PKG_CONFIG_PATH", path.clone());
  }

  run_step(runner, &invocation, Step::Configure).await
}

async fn configure_autotools(
  env: &BuildEnv,
  install_prefix: &Path,
  source_dir: &Path,
  runner: &dyn ProcessRunner,
) -> Result<(), BuildSystemError> {
  bootstrap_if_needed(source_dir, runner).await?;

  let configure_script = source_dir.join("configure");
  let mut invocation = Invocation::new(configure_script.to_string_lossy().into_owned(), source_dir)
    .arg(format!("--prefix={}", install_prefix.display()));

  if let Some(cc) = &env.cc {
    invocation = invocation.env("CC", cc.clone());
  }
  if let Some(cxx) = &env.cxx {
    invocation = invocation.env("CXX", cxx.clone());
  }
  if !env.include_flags.is_empty() {
    invocation = invocation.env("CPPFLAGS", env.include_flags.join(" "));
  }
  if !env.link_flags.is_empty() {
    invocation = invocation.env("LDFLAGS", env.link_flags.join(" "));
  }
  if let Some(std_flag) = &env.std_flag {
    invocation = invocation.env("CXXFLAGS", std_flag.clone());
  }
  if let Some(path) = &env.pkg_config_path {
    invocation = invocation.env("PKG_CONFIG_PATH", path.clone());
  }

  run_step(runner, &invocation, Step::Configure).await
}

/// Generate the configure script when only a bootstrap descriptor exists.
async fn bootstrap_if_needed(source_dir: &Path, runner: &dyn ProcessRunner) -> Result<(), BuildSystemError> {
  if source_dir.join("configure").exists() {
    return Ok(());
  }

  let autogen = source_dir.join("autogen.sh");
  let invocation = if autogen.exists() {
    Invocation::new(autogen.to_string_lossy().into_owned(), source_dir)
  } else if source_dir.join("configure.ac").exists() || source_dir.join("configure.in").exists() {
    Invocation::new("autoreconf", source_dir).arg("-fiv")
  } else {
    // Nothing to bootstrap; the configure invocation reports the failure.
    return Ok(());
  };

  run_step(runner, &invocation, Step::Configure).await
}

/// Run one invocation, converting spawn errors and non-zero exits into the
/// step's error variant.
async fn run_step(runner: &dyn ProcessRunner, invocation: &Invocation, step: Step) -> Result<(), BuildSystemError> {
  let captured = match runner.run(invocation).await {
    Ok(captured) => captured,
    Err(e) => {
      return Err(step.failure(format!("failed to spawn `{}`: {}", invocation.display(), e)));
    }
  };

  if !captured.success() {
    return Err(step.failure(format!(
      "`{}` exited with code {:?}: {}",
      invocation.display(),
      captured.code,
      captured.stderr_tail()
    )));
  }

  Ok(())
}
