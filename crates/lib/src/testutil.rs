//! Test doubles for the process and fetch boundaries.
//!
//! These let adapter and orchestrator tests assert exact process invocations
//! and simulate fetch outcomes without running real builds or touching the
//! network.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::fetch::{FetchError, SourceFetcher};
use crate::process::{Captured, Invocation, ProcessRunner};

/// Runner that records every invocation instead of spawning it.
///
/// Invocations whose rendered command line or working directory contains the
/// configured marker report exit code 1; everything else succeeds.
pub struct RecordingRunner {
  invocations: Mutex<Vec<Invocation>>,
  fail_on: Option<String>,
}

impl RecordingRunner {
  pub fn new() -> Self {
    Self {
      invocations: Mutex::new(Vec::new()),
      fail_on: None,
    }
  }

  /// A runner that fails any invocation matching `marker`.
  pub fn failing_on(marker: impl Into<String>) -> Self {
    Self {
      invocations: Mutex::new(Vec::new()),
      fail_on: Some(marker.into()),
    }
  }

  /// Everything run so far, in order.
  pub fn recorded(&self) -> Vec<Invocation> {
    self.invocations.lock().unwrap().clone()
  }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
  async fn run(&self, invocation: &Invocation) -> std::io::Result<Captured> {
    self.invocations.lock().unwrap().push(invocation.clone());

    let fails = self.fail_on.as_ref().is_some_and(|marker| {
      invocation.display().contains(marker) || invocation.cwd.to_string_lossy().contains(marker)
    });

    if fails {
      Ok(Captured {
        code: Some(1),
        stdout: String::new(),
        stderr: "scripted failure".to_string(),
      })
    } else {
      Ok(Captured {
        code: Some(0),
        stdout: String::new(),
        stderr: String::new(),
      })
    }
  }
}

/// Fetcher that materializes a fixed file layout instead of running git.
pub struct StubFetcher {
  files: Vec<(String, String)>,
  fail_for: Option<String>,
}

impl StubFetcher {
  /// A fetcher producing the given (relative path, contents) files.
  pub fn with_files(files: Vec<(String, String)>) -> Self {
    Self { files, fail_for: None }
  }

  /// A fetcher producing a minimal CMake source tree.
  pub fn cmake_tree() -> Self {
    Self::with_files(vec![("CMakeLists.txt".to_string(), String::new())])
  }

  /// Fail fetches whose URL contains `marker`.
  pub fn failing_for(mut self, marker: impl Into<String>) -> Self {
    self.fail_for = Some(marker.into());
    self
  }
}

impl SourceFetcher for StubFetcher {
  fn fetch(&self, url: &str, rev: &str, dest: &Path) -> Result<String, FetchError> {
    if self.fail_for.as_ref().is_some_and(|marker| url.contains(marker)) {
      return Err(FetchError::RevisionNotFound { rev: rev.to_string() });
    }

    std::fs::create_dir_all(dest).unwrap();
    for (rel, contents) in &self.files {
      std::fs::write(dest.join(rel), contents).unwrap();
    }
    Ok("0000000000000000000000000000000000000000".to_string())
  }
}
