//! The checking-tool contract and the registry of concrete adapters.
//!
//! Every tool implements [`Tool`]: a dependency check that gates it in or
//! out of scheduling, a per-file handler, and a default dispatch loop that
//! filters the review's files through the tool's pattern set. Tools that
//! need the whole repository tree declare it and are handed a staged
//! working directory by the worker.

pub mod clippy;
pub mod rustfmt;
pub mod shellcheck;

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;

use crate::patterns::PatternSet;
use crate::process::ExecError;
use crate::review::{File, Review};

/// String-keyed tool settings from the job payload. Unknown keys are
/// ignored, never an error.
pub type Settings = BTreeMap<String, String>;

/// Default subprocess bound for a tool invocation.
pub const DEFAULT_TIMEOUT_SECS: u64 = 90;

/// Errors that end a tool run. Per-file invocation failures are contained
/// inside the adapters and never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// The contract all checking tools implement.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn version(&self) -> &'static str {
        "1.0"
    }

    fn description(&self) -> &'static str;

    /// Subprocess timeout for this tool, in seconds.
    fn timeout(&self) -> u64 {
        DEFAULT_TIMEOUT_SECS
    }

    /// Whether the required external executables exist on the search path.
    /// Returning false excludes the tool from scheduling; it is a capability
    /// gate, not a failure.
    fn check_dependencies(&self) -> bool;

    /// The active pattern list. `None` puts every file in scope.
    fn file_patterns(&self) -> Option<&PatternSet> {
        None
    }

    /// Whether this tool needs a coherent full-repository checkout rather
    /// than isolated per-file staging.
    fn requires_full_repository(&self) -> bool {
        false
    }

    /// Run the tool over a review. The default iterates files in review
    /// order, skips those outside the pattern set, and delegates to
    /// `handle_file`. `working_dir` is the staged root, threaded explicitly
    /// instead of changing the process working directory.
    async fn execute(
        &self,
        review: &mut Review,
        settings: &Settings,
        working_dir: Option<&Path>,
    ) -> Result<(), ToolError> {
        for file in review.files_mut() {
            if let Some(patterns) = self.file_patterns() {
                if !patterns.matches(file.dest_path()) {
                    tracing::debug!(
                        tool = self.name(),
                        path = file.dest_path(),
                        "file outside pattern set, skipping"
                    );
                    continue;
                }
            }
            self.handle_file(file, settings, working_dir).await;
        }
        Ok(())
    }

    /// Process a single file. Adapters contain their own invocation
    /// failures: log, emit no comment, let the next file proceed.
    async fn handle_file(&self, _file: &mut File, _settings: &Settings, _working_dir: Option<&Path>) {
    }
}

/// Names of all registered tools, in scheduling order.
pub fn tool_names() -> &'static [&'static str] {
    &["rustfmt", "shellcheck", "clippy"]
}

/// Construct a tool by name, resolving its settings once. Unknown names
/// yield `None`; the worker reports them as skipped.
pub fn create_tool(name: &str, settings: &Settings) -> Option<Box<dyn Tool>> {
    match name {
        "rustfmt" => Some(Box::new(rustfmt::RustfmtTool::new())),
        "shellcheck" => Some(Box::new(shellcheck::ShellcheckTool::new(settings))),
        "clippy" => Some(Box::new(clippy::CargoClippyTool::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tool_known_names() {
        let settings = Settings::new();
        for name in tool_names() {
            let tool = create_tool(name, &settings).expect("registered tool");
            assert_eq!(&tool.name(), name);
        }
    }

    #[test]
    fn test_create_tool_unknown_name() {
        assert!(create_tool("flake8", &Settings::new()).is_none());
    }

    struct RecordingTool {
        patterns: PatternSet,
    }

    #[async_trait]
    impl Tool for RecordingTool {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn description(&self) -> &'static str {
            "test double"
        }

        fn check_dependencies(&self) -> bool {
            true
        }

        fn file_patterns(&self) -> Option<&PatternSet> {
            Some(&self.patterns)
        }

        async fn handle_file(
            &self,
            file: &mut File,
            _settings: &Settings,
            _working_dir: Option<&Path>,
        ) {
            file.comment("seen", None, false);
        }
    }

    #[tokio::test]
    async fn test_default_execute_filters_by_pattern() {
        let tool = RecordingTool {
            patterns: PatternSet::compile(vec!["*.rs".to_string()]),
        };
        let mut review = Review::new(vec![
            File::new("src/lib.rs", ""),
            File::new("README.md", ""),
            File::new("src/Main.RS", ""),
        ]);

        tool.execute(&mut review, &Settings::new(), None)
            .await
            .unwrap();

        let files = review.files();
        assert_eq!(files[0].comments().len(), 1);
        assert!(files[1].comments().is_empty());
        assert_eq!(files[2].comments().len(), 1, "matching is case-insensitive");
    }
}
