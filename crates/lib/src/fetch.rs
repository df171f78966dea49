//! Source tree fetching.
//!
//! Each package's source is materialized at a caller-chosen path before it is
//! built. The contract is idempotent: clone when the path is absent, fetch
//! updates in place when a checkout already exists. Fetching sits behind the
//! [`SourceFetcher`] trait so orchestration tests can simulate
//! "already cloned", "clone fails", and "update fails" without network
//! access.

use std::fs;
use std::path::{Path, PathBuf};

use gix::remote::Direction;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during fetch operations.
#[derive(Debug, Error)]
pub enum FetchError {
  /// Failed to create the checkout's parent directory.
  #[error("failed to create checkout directory '{0}': {1}")]
  CreateDir(PathBuf, #[source] std::io::Error),

  /// Failed to clone a git repository.
  #[error("failed to clone repository '{url}': {source}")]
  Clone {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// Failed to open an existing git repository.
  #[error("failed to open repository at '{path}': {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: Box<gix::open::Error>,
  },

  /// Failed to fetch updates from the remote.
  #[error("failed to fetch updates from '{url}': {source}")]
  Update {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// Failed to check out the cloned work tree.
  #[error("failed to check out work tree for '{url}': {source}")]
  Checkout {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// The configured revision does not exist in the repository.
  #[error("revision '{rev}' not found in repository")]
  RevisionNotFound { rev: String },

  /// No remote configured for an existing repository.
  #[error("no remote configured for repository")]
  NoRemote,

  /// Failed to connect to the remote.
  #[error("failed to connect to remote '{url}': {source}")]
  Connect {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

/// Fetches one package's source tree to a local path.
///
/// Implementations must be idempotent: clone when `dest` is absent, update
/// in place when it already holds a checkout.
pub trait SourceFetcher: Send + Sync {
  /// Ensure `dest` holds the source at `url`.
  ///
  /// Returns the commit id the requested revision resolves to.
  fn fetch(&self, url: &str, rev: &str, dest: &Path) -> Result<String, FetchError>;
}

/// Git-backed fetcher.
#[derive(Debug, Default)]
pub struct GitFetcher;

impl SourceFetcher for GitFetcher {
  fn fetch(&self, url: &str, rev: &str, dest: &Path) -> Result<String, FetchError> {
    if let Some(parent) = dest.parent()
      && !parent.exists()
    {
      fs::create_dir_all(parent).map_err(|e| FetchError::CreateDir(parent.to_path_buf(), e))?;
    }

    let repo = if dest.join(".git").exists() {
      debug!(url, path = %dest.display(), "updating existing checkout");
      let repo = gix::open(dest).map_err(|e| FetchError::Open {
        path: dest.to_path_buf(),
        source: Box::new(e),
      })?;

      fetch_updates(&repo, url)?;
      repo
    } else {
      info!(url, path = %dest.display(), "cloning repository");
      clone_repo(url, dest)?
    };

    let commit = resolve_revision(&repo, rev)?;
    debug!(url, rev, commit = %commit, "resolved revision");
    Ok(commit)
  }
}

/// Clone a git repository to the specified path.
fn clone_repo(url: &str, dest: &Path) -> Result<gix::Repository, FetchError> {
  let mut prepared = gix::prepare_clone(url, dest).map_err(|e| FetchError::Clone {
    url: url.to_string(),
    source: Box::new(e),
  })?;

  let (mut checkout, _outcome) = prepared
    .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| FetchError::Clone {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  let (repo, _outcome) = checkout
    .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| FetchError::Checkout {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  Ok(repo)
}

/// Fetch updates from the default remote.
fn fetch_updates(repo: &gix::Repository, url: &str) -> Result<(), FetchError> {
  debug!(url, "fetching updates");

  let remote = repo
    .find_default_remote(Direction::Fetch)
    .ok_or(FetchError::NoRemote)?
    .map_err(|e| FetchError::Connect {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  let connection = remote.connect(Direction::Fetch).map_err(|e| FetchError::Connect {
    url: url.to_string(),
    source: Box::new(e),
  })?;

  connection
    .prepare_fetch(gix::progress::Discard, Default::default())
    .map_err(|e| FetchError::Update {
      url: url.to_string(),
      source: Box::new(e),
    })?
    .receive(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| FetchError::Update {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  Ok(())
}

/// Resolve a revision spec (commit, tag, or branch) to a commit hash.
fn resolve_revision(repo: &gix::Repository, rev: &str) -> Result<String, FetchError> {
  let spec = repo
    .rev_parse(rev)
    .map_err(|_| FetchError::RevisionNotFound { rev: rev.to_string() })?;

  let object_id = spec.single().ok_or_else(|| FetchError::RevisionNotFound {
    rev: format!("{} (ambiguous)", rev),
  })?;

  let commit = object_id.object().map_err(|e| FetchError::RevisionNotFound {
    rev: format!("{}: {}", rev, e),
  })?;

  Ok(commit.id.to_string())
}

// NOTE: Git clone/fetch paths require network access and are exercised by
// integration environments rather than unit tests; orchestration tests use a
// stub SourceFetcher instead.
