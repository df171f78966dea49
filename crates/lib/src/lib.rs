//! srcpack-lib: Core pipeline for building native packages from source.
//!
//! This crate provides the whole build pipeline:
//! - `registry`: the declarative package registry handed in by the CLI
//! - `graph`: dependency resolution into a linear build order
//! - `env`: propagation of flags/paths from installed dependencies
//! - `fetch`: clone-or-update source fetching
//! - `buildsys`: CMake and autotools configure/compile/install adapters
//! - `orchestrate`: the sequential, fail-fast run driver
//! - `report`: structured and human-readable build reports

pub mod buildsys;
pub mod env;
pub mod fetch;
pub mod graph;
pub mod orchestrate;
pub mod process;
pub mod registry;
pub mod report;

#[cfg(test)]
pub(crate) mod testutil;
