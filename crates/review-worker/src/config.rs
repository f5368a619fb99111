//! Worker configuration.
//!
//! Loaded from a TOML file when given, otherwise built from environment
//! variables with sensible local defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// A repository the worker is allowed to check out.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfig {
    pub name: String,
    /// Anything git can clone: a URL or a local path.
    pub clone_url: String,
}

/// Top-level worker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Root for checkout scratch space and temp staging.
    #[serde(default = "default_scratch_root")]
    pub scratch_root: PathBuf,
    /// Root for bare cache clones. Defaults to `<scratch_root>/cache`.
    #[serde(default)]
    pub cache_root: Option<PathBuf>,
    #[serde(default)]
    pub repositories: Vec<RepositoryConfig>,
}

fn default_scratch_root() -> PathBuf {
    std::env::var_os("REVIEW_WORKER_SCRATCH_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("review-worker"))
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            scratch_root: default_scratch_root(),
            cache_root: None,
            repositories: Vec::new(),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from a TOML file, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("parsing config {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn repository(&self, name: &str) -> Option<&RepositoryConfig> {
        self.repositories.iter().find(|r| r.name == name)
    }

    pub fn cache_root(&self) -> PathBuf {
        self.cache_root
            .clone()
            .unwrap_or_else(|| self.scratch_root.join("cache"))
    }
}
