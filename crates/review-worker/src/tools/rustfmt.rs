//! Formatter-check adapter for rustfmt.

use std::path::Path;

use async_trait::async_trait;

use crate::process::{execute, is_exe_in_path};
use crate::review::File;
use crate::tools::{Settings, Tool};

pub struct RustfmtTool;

impl RustfmtTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustfmtTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for RustfmtTool {
    fn name(&self) -> &'static str {
        "rustfmt"
    }

    fn description(&self) -> &'static str {
        "Checks that Rust code style matches rustfmt."
    }

    fn timeout(&self) -> u64 {
        30
    }

    fn check_dependencies(&self) -> bool {
        is_exe_in_path("rustfmt")
    }

    async fn handle_file(&self, file: &mut File, _settings: &Settings, _working_dir: Option<&Path>) {
        if !file.dest_path().to_lowercase().ends_with(".rs") {
            // Ignore the file.
            return;
        }

        let Some(path) = file.patched_file_path() else {
            return;
        };
        let path = path.display().to_string();

        match execute("rustfmt", &["--check", &path], None, self.timeout(), true).await {
            Ok(output) => {
                if !output.trim().is_empty() {
                    file.comment(
                        "This file contains formatting errors and should be run through \
                         `rustfmt`.",
                        None,
                        true,
                    );
                }
            }
            Err(err) => {
                tracing::error!(path = %path, error = %err, "rustfmt failed for the file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_non_rust_file_is_silently_skipped() {
        let tool = RustfmtTool::new();
        let mut file = File::new("script.py", "print('hi')\n");
        // A staged path exists, but the extension gate fires first.
        file.set_patched_file_path("/tmp/script.py".into());

        tool.handle_file(&mut file, &Settings::new(), None).await;
        assert!(file.comments().is_empty());
    }

    #[tokio::test]
    async fn test_unstaged_file_is_silently_skipped() {
        let tool = RustfmtTool::new();
        let mut file = File::new("src/lib.rs", "fn main(){}\n");

        tool.handle_file(&mut file, &Settings::new(), None).await;
        assert!(file.comments().is_empty());
    }

    #[tokio::test]
    async fn test_badly_formatted_file_gets_one_whole_file_comment() {
        if !is_exe_in_path("rustfmt") {
            eprintln!("rustfmt not installed, skipping");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messy.rs");
        std::fs::write(&path, "fn main( ){println!(\"hi\" ) ;}\n").unwrap();

        let tool = RustfmtTool::new();
        let mut file = File::new("messy.rs", "");
        file.set_patched_file_path(path);

        tool.handle_file(&mut file, &Settings::new(), None).await;

        assert_eq!(file.comments().len(), 1);
        let comment = &file.comments()[0];
        assert!(comment.text.contains("rustfmt"));
        assert_eq!(comment.first_line, None);
        assert!(comment.rich_text);
    }

    #[tokio::test]
    async fn test_clean_file_gets_no_comment() {
        if !is_exe_in_path("rustfmt") {
            eprintln!("rustfmt not installed, skipping");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean.rs");
        std::fs::write(&path, "fn main() {\n    println!(\"hi\");\n}\n").unwrap();

        let tool = RustfmtTool::new();
        let mut file = File::new("clean.rs", "");
        file.set_patched_file_path(path);

        tool.handle_file(&mut file, &Settings::new(), None).await;
        assert!(file.comments().is_empty());
    }

    #[tokio::test]
    async fn test_invocation_failure_is_contained() {
        let tool = RustfmtTool::new();
        let mut file = File::new("gone.rs", "");
        // Points at a file that no longer exists; rustfmt will fail, the
        // adapter logs and moves on.
        file.set_patched_file_path("/nonexistent/gone.rs".into());

        tool.handle_file(&mut file, &Settings::new(), None).await;
        assert!(file.comments().is_empty());
    }
}
