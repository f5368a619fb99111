//! Build-aware linting via cargo clippy.
//!
//! Clippy needs the whole crate tree to be coherent, so this tool runs
//! against a full repository checkout with every patch already applied. It
//! overrides the per-file dispatch: clippy runs once over the staged tree
//! and its JSON diagnostics are mapped back onto the review's files.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::process::{execute, is_exe_in_path};
use crate::review::Review;
use crate::tools::{Settings, Tool, ToolError};

pub struct CargoClippyTool;

impl CargoClippyTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CargoClippyTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct CargoMessage {
    reason: String,
    #[serde(default)]
    message: Option<Diagnostic>,
}

#[derive(Debug, Deserialize)]
struct Diagnostic {
    message: String,
    level: String,
    #[serde(default)]
    code: Option<DiagnosticCode>,
    #[serde(default)]
    spans: Vec<DiagnosticSpan>,
}

#[derive(Debug, Deserialize)]
struct DiagnosticCode {
    code: String,
}

#[derive(Debug, Deserialize)]
struct DiagnosticSpan {
    file_name: String,
    line_start: u32,
    #[serde(default)]
    is_primary: bool,
}

/// One diagnostic anchored to a file in the staged tree.
#[derive(Debug, PartialEq, Eq, Hash)]
struct Finding {
    file: String,
    line: u32,
    message: String,
}

/// Extract warning/error diagnostics from `cargo clippy
/// --message-format=json` output. Non-JSON lines (build noise) and
/// diagnostics without a primary span (summaries) are skipped; duplicates
/// across compilation units are collapsed.
fn collect_findings(output: &str) -> Vec<Finding> {
    let mut seen = HashSet::new();
    let mut findings = Vec::new();

    for line in output.lines() {
        let Ok(message) = serde_json::from_str::<CargoMessage>(line) else {
            continue;
        };
        if message.reason != "compiler-message" {
            continue;
        }
        let Some(diagnostic) = message.message else {
            continue;
        };
        if diagnostic.level != "warning" && diagnostic.level != "error" {
            continue;
        }
        let Some(span) = diagnostic.spans.iter().find(|s| s.is_primary) else {
            continue;
        };

        let text = match &diagnostic.code {
            Some(code) => format!("{} [{}]", diagnostic.message, code.code),
            None => diagnostic.message.clone(),
        };
        let finding = Finding {
            file: normalize_path(&span.file_name),
            line: span.line_start,
            message: text,
        };
        if seen.insert((finding.file.clone(), finding.line, finding.message.clone())) {
            findings.push(finding);
        }
    }

    findings
}

fn normalize_path(path: &str) -> String {
    let forward = path.replace('\\', "/");
    forward.trim_start_matches("./").to_string()
}

fn paths_equal(a: &str, b: &str) -> bool {
    normalize_path(a).eq_ignore_ascii_case(&normalize_path(b))
}

#[async_trait]
impl Tool for CargoClippyTool {
    fn name(&self) -> &'static str {
        "clippy"
    }

    fn description(&self) -> &'static str {
        "Runs cargo clippy over the patched repository tree."
    }

    fn timeout(&self) -> u64 {
        300
    }

    fn check_dependencies(&self) -> bool {
        is_exe_in_path("cargo") && is_exe_in_path("cargo-clippy")
    }

    fn requires_full_repository(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        review: &mut Review,
        _settings: &Settings,
        working_dir: Option<&Path>,
    ) -> Result<(), ToolError> {
        let Some(root) = working_dir else {
            tracing::warn!("clippy invoked without a staged working directory");
            return Ok(());
        };

        let output = match execute(
            "cargo",
            &["clippy", "--quiet", "--message-format=json"],
            Some(root),
            self.timeout(),
            true,
        )
        .await
        {
            Ok(output) => output,
            Err(err) => {
                // A broken build fails softly: the other tools in the run
                // are unaffected.
                tracing::error!(error = %err, "cargo clippy invocation failed");
                return Ok(());
            }
        };

        let findings = collect_findings(&output);
        tracing::info!(count = findings.len(), "clippy diagnostics collected");

        for file in review.files_mut() {
            for finding in &findings {
                if paths_equal(&finding.file, file.dest_path()) {
                    file.comment(
                        format!("clippy: {}", finding.message),
                        Some(finding.line),
                        false,
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::File;

    const SAMPLE_OUTPUT: &str = concat!(
        r#"{"reason":"compiler-artifact","target":{"name":"demo"}}"#,
        "\n",
        r#"{"reason":"compiler-message","message":{"message":"unused variable: `x`","level":"warning","code":{"code":"unused_variables"},"spans":[{"file_name":"src/main.rs","line_start":4,"is_primary":true}]}}"#,
        "\n",
        r#"{"reason":"compiler-message","message":{"message":"unused variable: `x`","level":"warning","code":{"code":"unused_variables"},"spans":[{"file_name":"src/main.rs","line_start":4,"is_primary":true}]}}"#,
        "\n",
        r#"{"reason":"compiler-message","message":{"message":"this could be rewritten","level":"warning","code":{"code":"clippy::needless_return"},"spans":[{"file_name":".\\src\\lib.rs","line_start":9,"is_primary":true}]}}"#,
        "\n",
        r#"{"reason":"compiler-message","message":{"message":"2 warnings emitted","level":"warning","spans":[]}}"#,
        "\n",
        r#"{"reason":"compiler-message","message":{"message":"some help text","level":"help","spans":[{"file_name":"src/main.rs","line_start":4,"is_primary":true}]}}"#,
        "\n",
        "not json at all\n",
        r#"{"reason":"build-finished","success":true}"#,
        "\n",
    );

    #[test]
    fn test_collect_findings_filters_and_dedupes() {
        let findings = collect_findings(SAMPLE_OUTPUT);
        assert_eq!(findings.len(), 2);

        assert_eq!(findings[0].file, "src/main.rs");
        assert_eq!(findings[0].line, 4);
        assert!(findings[0].message.contains("unused variable"));
        assert!(findings[0].message.contains("[unused_variables]"));

        // Windows-style span path is normalized.
        assert_eq!(findings[1].file, "src/lib.rs");
        assert_eq!(findings[1].line, 9);
    }

    #[test]
    fn test_collect_findings_empty_output() {
        assert!(collect_findings("").is_empty());
    }

    #[test]
    fn test_paths_equal_normalization() {
        assert!(paths_equal("./src/main.rs", "src/main.rs"));
        assert!(paths_equal("src\\Main.RS", "src/main.rs"));
        assert!(!paths_equal("src/main.rs", "src/lib.rs"));
    }

    #[test]
    fn test_findings_map_onto_review_files() {
        // Same mapping loop execute() runs after the clippy invocation,
        // driven with canned output.
        let findings = collect_findings(SAMPLE_OUTPUT);
        let mut review = Review::new(vec![
            File::new("src/main.rs", ""),
            File::new("src/other.rs", ""),
        ]);

        for file in review.files_mut() {
            for finding in &findings {
                if paths_equal(&finding.file, file.dest_path()) {
                    file.comment(format!("clippy: {}", finding.message), Some(finding.line), false);
                }
            }
        }

        assert_eq!(review.files()[0].comments().len(), 1);
        assert_eq!(review.files()[0].comments()[0].first_line, Some(4));
        assert!(review.files()[1].comments().is_empty());
    }

    #[tokio::test]
    async fn test_execute_without_working_dir_is_a_noop() {
        let tool = CargoClippyTool::new();
        let mut review = Review::new(vec![File::new("src/main.rs", "")]);

        tool.execute(&mut review, &Settings::new(), None)
            .await
            .unwrap();
        assert!(review.files()[0].comments().is_empty());
    }
}
