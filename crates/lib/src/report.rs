//! Build report rendering.
//!
//! The report is a pure projection of the orchestrator's results: one entry
//! per attempted package, in attempt order, rendered both as a structured
//! JSON document and as a human-readable text summary with aggregate counts.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::info;

use crate::orchestrate::BuildResult;

/// Errors that can occur while writing report files.
#[derive(Debug, Error)]
pub enum ReportError {
  /// Failed to create the report directory.
  #[error("failed to create report directory '{0}': {1}")]
  CreateDir(PathBuf, #[source] std::io::Error),

  /// Failed to write a report file.
  #[error("failed to write report '{0}': {1}")]
  Write(PathBuf, #[source] std::io::Error),

  /// Failed to serialize the structured report.
  #[error("failed to serialize report: {0}")]
  Serialize(#[from] serde_json::Error),
}

/// Projection of a run's results into report documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
  entries: Vec<BuildResult>,
}

impl Report {
  /// Build a report from results, preserving attempt order.
  pub fn from_results(results: &[BuildResult]) -> Self {
    Self {
      entries: results.to_vec(),
    }
  }

  /// Number of packages that built successfully.
  pub fn successful(&self) -> usize {
    self.entries.iter().filter(|entry| entry.success).count()
  }

  /// Number of packages that failed.
  pub fn failed(&self) -> usize {
    self.entries.len() - self.successful()
  }

  /// Name-keyed JSON document, entries in attempt order.
  pub fn to_json(&self) -> Value {
    let mut map = Map::new();
    for entry in &self.entries {
      map.insert(
        entry.name.clone(),
        json!({
          "url": entry.url,
          "success": entry.success,
          "message": entry.message,
        }),
      );
    }
    Value::Object(map)
  }

  /// Human-readable report text.
  pub fn render_text(&self) -> String {
    let mut out = String::new();
    out.push_str("Build Report\n");
    out.push_str(&"=".repeat(50));
    out.push_str("\n\n");

    for entry in &self.entries {
      let status = if entry.success { "SUCCESS" } else { "FAILED" };
      out.push_str(&format!("{}: {}\n", entry.name, status));
      out.push_str(&format!("  URL: {}\n", entry.url));
      out.push_str(&format!("  Message: {}\n\n", entry.message));
    }

    out.push_str(&format!("Summary: {} successful, {} failed\n", self.successful(), self.failed()));
    out
  }

  /// Write `build_report.json` and `build_report.txt` into `dir`.
  ///
  /// # Errors
  ///
  /// Returns [`ReportError`] when the directory cannot be created or either
  /// file cannot be written.
  pub fn write_to(&self, dir: &Path) -> Result<(), ReportError> {
    fs::create_dir_all(dir).map_err(|e| ReportError::CreateDir(dir.to_path_buf(), e))?;

    let json_path = dir.join("build_report.json");
    let json_doc = serde_json::to_string_pretty(&self.to_json())?;
    fs::write(&json_path, json_doc).map_err(|e| ReportError::Write(json_path.clone(), e))?;

    let text_path = dir.join("build_report.txt");
    fs::write(&text_path, self.render_text()).map_err(|e| ReportError::Write(text_path.clone(), e))?;

    info!(dir = %dir.display(), "build report written");
    Ok(())
  }
}
