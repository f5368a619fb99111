//! Staging: materializing the files a tool will analyze.
//!
//! Full-repository tools get a synced, checked-out working copy with every
//! patched file written into it before any single file is analyzed; other
//! tools get an isolated temp tree. Either way the result is a
//! [`StagedRepository`] guard owning scratch space that is removed on drop,
//! and the working-directory path is threaded explicitly to the tool — no
//! process-wide state is touched.

use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;

use crate::repository::{Repository, RepositoryError};
use crate::review::Review;

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("destination path `{path}` escapes the staging root")]
    PathEscape { path: String },

    #[error("failed to write `{path}`: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
enum Scratch {
    /// A repository checkout; removed when the guard drops.
    Checkout(PathBuf),
    /// A temp tree for isolated staging; TempDir cleans itself up.
    Temp(TempDir),
}

/// Guard over a staged working directory. Holding it keeps the directory
/// alive; dropping it removes the scratch space on every exit path.
#[derive(Debug)]
pub struct StagedRepository {
    scratch: Scratch,
}

impl StagedRepository {
    pub fn path(&self) -> &Path {
        match &self.scratch {
            Scratch::Checkout(path) => path,
            Scratch::Temp(dir) => dir.path(),
        }
    }
}

impl Drop for StagedRepository {
    fn drop(&mut self) {
        if let Scratch::Checkout(path) = &self.scratch {
            if let Err(err) = std::fs::remove_dir_all(path) {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to remove staged checkout"
                );
            }
        }
    }
}

/// Stages review files for tool execution.
pub struct RepositoryStager;

impl RepositoryStager {
    pub fn new() -> Self {
        Self
    }

    /// Stage a review against a full repository checkout.
    ///
    /// Syncs the repository, checks out the review's base commit, then
    /// writes every patched file into the tree in review order. Sync,
    /// checkout, and any single write failure are fatal: a partially
    /// patched tree is never handed to a tool.
    pub fn stage_full_repository(
        &self,
        review: &mut Review,
        repository: &dyn Repository,
    ) -> Result<StagedRepository, StageError> {
        repository.sync()?;
        let root = repository.checkout(review.base_commit_id())?;
        let staged = StagedRepository {
            scratch: Scratch::Checkout(root),
        };

        write_patched_files(review, staged.path())?;
        Ok(staged)
    }

    /// Stage a review into an isolated temp tree, for tools that only need
    /// the files themselves.
    pub fn stage_isolated(&self, review: &mut Review) -> Result<StagedRepository, StageError> {
        let staged = StagedRepository {
            scratch: Scratch::Temp(tempfile::tempdir()?),
        };

        write_patched_files(review, staged.path())?;
        Ok(staged)
    }
}

impl Default for RepositoryStager {
    fn default() -> Self {
        Self::new()
    }
}

fn write_patched_files(review: &mut Review, root: &Path) -> Result<(), StageError> {
    for file in review.files_mut() {
        let dest = stage_path(root, file.dest_path())?;
        tracing::info!(path = file.dest_path(), "staging patched file");

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StageError::Write {
                path: file.dest_path().to_string(),
                source,
            })?;
        }

        std::fs::write(&dest, file.patched_content()).map_err(|source| StageError::Write {
            path: file.dest_path().to_string(),
            source,
        })?;

        file.set_patched_file_path(dest);
    }
    Ok(())
}

/// Resolve a destination path under the staging root, rejecting anything
/// that would land outside it. The check is lexical: absolute paths are
/// refused outright and `..` components may never climb past the root.
fn stage_path(root: &Path, dest_path: &str) -> Result<PathBuf, StageError> {
    let relative = Path::new(dest_path);
    if relative.is_absolute() {
        return Err(StageError::PathEscape {
            path: dest_path.to_string(),
        });
    }

    let mut resolved = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    return Err(StageError::PathEscape {
                        path: dest_path.to_string(),
                    });
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(StageError::PathEscape {
                    path: dest_path.to_string(),
                });
            }
        }
    }

    if resolved.as_os_str().is_empty() {
        return Err(StageError::PathEscape {
            path: dest_path.to_string(),
        });
    }

    Ok(root.join(resolved))
}
