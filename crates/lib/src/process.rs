//! Structured process invocation.
//!
//! Build steps never concatenate shell strings; every external command is an
//! [`Invocation`] (program, argument vector, working directory, extra
//! environment) executed through a [`ProcessRunner`]. The runner is a trait
//! so tests can record and script invocations without spawning anything.
//!
//! Unlike a hermetic build sandbox, invocations inherit the surrounding
//! environment (native builds need the host toolchain on `PATH`) and only
//! layer the per-build variables on top.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

/// One external command to run.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
  /// Program to execute.
  pub program: String,

  /// Argument vector, passed as-is (no shell interpretation).
  pub args: Vec<String>,

  /// Working directory for the process.
  pub cwd: PathBuf,

  /// Extra environment variables layered over the inherited environment.
  pub env: Vec<(String, String)>,
}

impl Invocation {
  pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: cwd.into(),
      env: Vec::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.push((key.into(), value.into()));
    self
  }

  /// One-line rendering for logs and error messages.
  pub fn display(&self) -> String {
    if self.args.is_empty() {
      return self.program.clone();
    }
    format!("{} {}", self.program, self.args.join(" "))
  }
}

/// Captured outcome of a finished process.
#[derive(Debug, Clone)]
pub struct Captured {
  /// Exit code; `None` when the process was killed by a signal.
  pub code: Option<i32>,

  /// Captured standard output.
  pub stdout: String,

  /// Captured standard error.
  pub stderr: String,
}

impl Captured {
  /// Whether the process exited with status zero.
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }

  /// The last few stderr lines, for compact error messages.
  pub fn stderr_tail(&self) -> String {
    let lines: Vec<&str> = self.stderr.lines().collect();
    let start = lines.len().saturating_sub(5);
    lines[start..].join("\n")
  }
}

/// Executes invocations to completion, capturing their output.
///
/// `Err` means the process could not be spawned or awaited; a process that
/// ran and exited non-zero is an `Ok` with a non-success [`Captured`].
#[async_trait]
pub trait ProcessRunner: Send + Sync {
  async fn run(&self, invocation: &Invocation) -> std::io::Result<Captured>;
}

/// Runner backed by real subprocesses.
#[derive(Debug, Default)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
  async fn run(&self, invocation: &Invocation) -> std::io::Result<Captured> {
    info!(cmd = %invocation.display(), cwd = %invocation.cwd.display(), "running command");

    let mut command = Command::new(&invocation.program);
    command.args(&invocation.args).current_dir(&invocation.cwd);

    for (key, value) in &invocation.env {
      command.env(key, value);
    }

    let output = command.output().await?;

    let captured = Captured {
      code: output.status.code(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !captured.success() {
      debug!(code = ?captured.code, stderr = %captured.stderr_tail(), "command failed");
    }

    Ok(captured)
  }
}
