//! Shell-script linting via shellcheck.
//!
//! The file set is fully settings-driven: a `file_patterns` setting (comma
//! separated globs) beats a `file_extensions` setting, which beats the
//! built-in defaults. `extra_args` is split shell-style and appended to the
//! invocation.

use std::path::Path;

use async_trait::async_trait;
use regex::Regex;

use crate::patterns::{resolve_file_patterns, PatternSet};
use crate::process::{execute, is_exe_in_path};
use crate::review::File;
use crate::tools::{Settings, Tool};

const DEFAULT_PATTERNS: &[&str] = &["*.bash", "*.sh"];

const FILE_PATTERNS_SETTING: &str = "file_patterns";
const FILE_EXTENSIONS_SETTING: &str = "file_extensions";
const EXTRA_ARGS_SETTING: &str = "extra_args";

pub struct ShellcheckTool {
    patterns: PatternSet,
    gcc_line: Regex,
}

impl ShellcheckTool {
    pub fn new(settings: &Settings) -> Self {
        let patterns = resolve_file_patterns(
            settings,
            Some(FILE_PATTERNS_SETTING),
            Some(FILE_EXTENSIONS_SETTING),
            DEFAULT_PATTERNS,
            true,
        );

        Self {
            patterns: PatternSet::compile(patterns),
            gcc_line: Regex::new(r"(?m)^.+?:(\d+):\d+:\s*(note|warning|error):\s*(.+)$")
                .expect("hard-coded regex"),
        }
    }

    /// Parse shellcheck's gcc-format output into (line, message) findings.
    fn parse_findings(&self, output: &str) -> Vec<(u32, String)> {
        self.gcc_line
            .captures_iter(output)
            .filter_map(|caps| {
                let line: u32 = caps[1].parse().ok()?;
                let severity = &caps[2];
                let message = caps[3].trim();
                Some((line, format!("shellcheck {severity}: {message}")))
            })
            .collect()
    }
}

#[async_trait]
impl Tool for ShellcheckTool {
    fn name(&self) -> &'static str {
        "shellcheck"
    }

    fn description(&self) -> &'static str {
        "Lints shell scripts with shellcheck."
    }

    fn timeout(&self) -> u64 {
        60
    }

    fn check_dependencies(&self) -> bool {
        is_exe_in_path("shellcheck")
    }

    fn file_patterns(&self) -> Option<&PatternSet> {
        Some(&self.patterns)
    }

    async fn handle_file(&self, file: &mut File, settings: &Settings, _working_dir: Option<&Path>) {
        let Some(path) = file.patched_file_path() else {
            return;
        };
        let path = path.display().to_string();

        let extra_args = settings
            .get(EXTRA_ARGS_SETTING)
            .and_then(|value| shlex::split(value))
            .unwrap_or_default();

        let mut args: Vec<&str> = vec!["--format=gcc"];
        args.extend(extra_args.iter().map(String::as_str));
        args.push(path.as_str());

        match execute("shellcheck", &args, None, self.timeout(), true).await {
            Ok(output) => {
                for (line, message) in self.parse_findings(&output) {
                    file.comment(message, Some(line), false);
                }
            }
            Err(err) => {
                tracing::error!(path = %path, error = %err, "shellcheck failed for the file");
            }
        }
    }
}
