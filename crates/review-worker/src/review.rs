//! Review data model: the files under review and the comments tools attach.
//!
//! A `Review` is owned by one tool run at a time. Files arrive from the job
//! payload with their destination path and full post-patch content; staging
//! fills in the on-disk path, and tools append comments.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A single comment attached to a file by a checking tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub text: String,
    /// 1-based line the comment anchors to. `None` means the comment applies
    /// to the whole file.
    pub first_line: Option<u32>,
    pub rich_text: bool,
}

/// One changed file in a review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    /// Destination path, relative to the repository root.
    dest_path: String,
    /// Full post-patch content of the file.
    patched_content: String,
    /// Where staging wrote the patched content. Unset until staged.
    #[serde(skip)]
    patched_file_path: Option<PathBuf>,
    /// Append-only; populated by tools during `handle_file`.
    #[serde(default)]
    comments: Vec<Comment>,
}

impl File {
    pub fn new(dest_path: impl Into<String>, patched_content: impl Into<String>) -> Self {
        Self {
            dest_path: dest_path.into(),
            patched_content: patched_content.into(),
            patched_file_path: None,
            comments: Vec::new(),
        }
    }

    pub fn dest_path(&self) -> &str {
        &self.dest_path
    }

    pub fn patched_content(&self) -> &[u8] {
        self.patched_content.as_bytes()
    }

    /// The filesystem location of the staged patched content, if staged.
    pub fn patched_file_path(&self) -> Option<&Path> {
        self.patched_file_path.as_deref()
    }

    pub fn set_patched_file_path(&mut self, path: PathBuf) {
        self.patched_file_path = Some(path);
    }

    /// Append a review comment to this file.
    pub fn comment(&mut self, text: impl Into<String>, first_line: Option<u32>, rich_text: bool) {
        self.comments.push(Comment {
            text: text.into(),
            first_line,
            rich_text,
        });
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }
}

/// An ordered collection of files plus the repository context needed by
/// full-repository tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub review_id: Option<String>,
    files: Vec<File>,
    /// Name of the repository the review belongs to, resolved against the
    /// worker configuration. Required only by full-repository tools.
    #[serde(default)]
    repository: Option<String>,
    /// Commit the patches apply on top of.
    #[serde(default)]
    base_commit_id: Option<String>,
}

impl Review {
    pub fn new(files: Vec<File>) -> Self {
        Self {
            review_id: None,
            files,
            repository: None,
            base_commit_id: None,
        }
    }

    pub fn with_repository(
        mut self,
        repository: impl Into<String>,
        base_commit_id: Option<String>,
    ) -> Self {
        self.repository = Some(repository.into());
        self.base_commit_id = base_commit_id;
        self
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    pub fn files_mut(&mut self) -> impl Iterator<Item = &mut File> {
        self.files.iter_mut()
    }

    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref()
    }

    pub fn base_commit_id(&self) -> Option<&str> {
        self.base_commit_id.as_deref()
    }
}
