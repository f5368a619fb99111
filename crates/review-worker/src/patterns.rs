//! File-pattern resolution: turning tool settings into an ordered,
//! deduplicated list of glob patterns, compiled into a case-insensitive
//! matcher.
//!
//! Precedence is patterns-setting > extensions-setting > built-in defaults.
//! Malformed values never error; they degrade to the defaults.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::tools::Settings;

/// Escape glob metacharacters (`*`, `?`, `[`) so a token matches literally.
pub fn glob_escape(token: &str) -> String {
    let mut escaped = String::with_capacity(token.len());
    for ch in token.chars() {
        match ch {
            '*' | '?' | '[' => {
                escaped.push('[');
                escaped.push(ch);
                escaped.push(']');
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Split a comma-separated setting value, tolerating surrounding whitespace
/// and repeated commas. Empty tokens are dropped.
fn split_setting_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve the active file-pattern list for a tool.
///
/// A non-empty patterns setting wins outright; otherwise a non-empty
/// extensions setting is turned into `*.<escaped-ext>` globs. When either
/// produced a list and `include_defaults` is set, the tool defaults are
/// appended. The produced list is deduplicated, stripped of empties, and
/// sorted. When neither setting yields a value, the defaults are returned
/// untouched.
pub fn resolve_file_patterns(
    settings: &Settings,
    file_patterns_setting: Option<&str>,
    file_extensions_setting: Option<&str>,
    default_patterns: &[&str],
    include_defaults: bool,
) -> Vec<String> {
    let mut patterns: Vec<String> = Vec::new();

    if let Some(key) = file_patterns_setting {
        if let Some(value) = settings.get(key) {
            patterns = split_setting_list(value);
        }
    }

    if patterns.is_empty() {
        if let Some(key) = file_extensions_setting {
            if let Some(value) = settings.get(key) {
                patterns = split_setting_list(value)
                    .iter()
                    .map(|ext| format!("*.{}", glob_escape(ext.trim_start_matches('.'))))
                    .collect();
            }
        }
    }

    if patterns.is_empty() {
        return default_patterns.iter().map(|p| p.to_string()).collect();
    }

    if include_defaults {
        patterns.extend(default_patterns.iter().map(|p| p.to_string()));
    }

    patterns.sort();
    patterns.dedup();
    patterns.retain(|p| !p.is_empty());
    patterns
}

/// An ordered pattern list compiled for case-insensitive matching against
/// destination paths. Patterns without a separator match anywhere in the
/// path (`*` spans directories), so `*.rs` covers nested files.
#[derive(Debug)]
pub struct PatternSet {
    patterns: Vec<String>,
    matcher: GlobSet,
}

impl PatternSet {
    /// Compile a pattern list. Patterns that fail to parse as globs are
    /// skipped with a warning rather than failing tool construction.
    pub fn compile(patterns: Vec<String>) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::with_capacity(patterns.len());

        for pattern in patterns {
            match GlobBuilder::new(&pattern).case_insensitive(true).build() {
                Ok(glob) => {
                    builder.add(glob);
                    kept.push(pattern);
                }
                Err(err) => {
                    tracing::warn!(pattern = %pattern, error = %err, "skipping invalid file pattern");
                }
            }
        }

        let matcher = match builder.build() {
            Ok(set) => set,
            Err(err) => {
                tracing::warn!(error = %err, "failed to build pattern matcher");
                GlobSet::empty()
            }
        };

        Self {
            patterns: kept,
            matcher,
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Test a destination path against the set. Backslashes are normalized
    /// so Windows-style job payloads match.
    pub fn matches(&self, dest_path: &str) -> bool {
        let normalized = dest_path.replace('\\', "/");
        self.matcher.is_match(&normalized)
    }
}
