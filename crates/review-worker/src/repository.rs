//! Repository access for full-repository tools.
//!
//! `sync` and `checkout` are the only operations the execution core needs;
//! both are fatal for a tool run when they fail. The git implementation
//! keeps a mirror clone per repository as a cache and materializes
//! checkouts as detached worktrees under the scratch root.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::RepositoryConfig;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository sync failed: {message}")]
    Sync { message: String },

    #[error("checkout of `{commit}` failed: {message}")]
    Checkout { commit: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The repository operations the stager depends on.
#[cfg_attr(test, mockall::automock)]
pub trait Repository: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch the latest remote state into the local cache.
    fn sync(&self) -> Result<(), RepositoryError>;

    /// Materialize a working copy at `base_commit_id` (repository default
    /// branch when `None`) and return its path. Ownership of the directory
    /// transfers to the caller; it is scratch space and will not persist.
    fn checkout<'a>(&self, base_commit_id: Option<&'a str>) -> Result<PathBuf, RepositoryError>;
}

static CHECKOUT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Git-CLI-backed repository: bare cache clone plus detached worktrees.
pub struct GitRepository {
    name: String,
    clone_url: String,
    cache_dir: PathBuf,
    scratch_dir: PathBuf,
}

impl GitRepository {
    pub fn new(config: &RepositoryConfig, cache_root: &Path, scratch_root: &Path) -> Self {
        Self {
            name: config.name.clone(),
            clone_url: config.clone_url.clone(),
            cache_dir: cache_root.join(format!("{}.git", config.name)),
            scratch_dir: scratch_root.to_path_buf(),
        }
    }

    fn run_git(args: &[&str], cwd: &Path) -> Result<String, String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| format!("failed to run git: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("git {}: {}", args.join(" "), stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn has_cache(&self) -> bool {
        self.cache_dir.join("HEAD").exists()
    }
}

impl Repository for GitRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn sync(&self) -> Result<(), RepositoryError> {
        let parent = self
            .cache_dir
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        std::fs::create_dir_all(&parent)?;

        if self.has_cache() {
            tracing::debug!(repository = %self.name, "fetching into cache clone");
            Self::run_git(
                &["fetch", "--all", "--prune", "--quiet"],
                &self.cache_dir,
            )
            .map_err(|message| RepositoryError::Sync { message })?;

            // Drop records of scratch worktrees removed by previous runs.
            if let Err(err) = Self::run_git(&["worktree", "prune"], &self.cache_dir) {
                tracing::warn!(repository = %self.name, error = %err, "worktree prune failed");
            }
        } else {
            tracing::info!(repository = %self.name, url = %self.clone_url, "creating cache clone");
            let cache = self.cache_dir.display().to_string();
            // A mirror clone keeps all refs updatable by plain fetch.
            Self::run_git(
                &["clone", "--mirror", "--quiet", &self.clone_url, &cache],
                &parent,
            )
            .map_err(|message| RepositoryError::Sync { message })?;
        }

        Ok(())
    }

    fn checkout(&self, base_commit_id: Option<&str>) -> Result<PathBuf, RepositoryError> {
        std::fs::create_dir_all(&self.scratch_dir)?;

        let seq = CHECKOUT_SEQ.fetch_add(1, Ordering::Relaxed);
        let checkout_dir = self
            .scratch_dir
            .join(format!("{}-{}-{}", self.name, std::process::id(), seq));
        let commit = base_commit_id.unwrap_or("HEAD");

        tracing::info!(
            repository = %self.name,
            commit = %commit,
            path = %checkout_dir.display(),
            "checking out working copy"
        );

        let dir = checkout_dir.display().to_string();
        Self::run_git(
            &["worktree", "add", "--detach", &dir, commit],
            &self.cache_dir,
        )
        .map_err(|message| RepositoryError::Checkout {
            commit: commit.to_string(),
            message,
        })?;

        Ok(checkout_dir)
    }
}
