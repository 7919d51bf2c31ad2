//! Architectural Enforcement
//!
//! Source scanners shared by the integration tests in `tests/`. They enforce:
//! - No sleep() calls in production code (wait on I/O or use an interval)
//! - The conductor core stays free of terminal UI crates
//!
//! Scanning is line based. Comments are ignored, and everything from a file's
//! `#[cfg(test)]` module onward is treated as test code.

use std::fs;
use std::path::{Path, PathBuf};

/// A forbidden pattern found in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File the pattern was found in
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The offending line, trimmed
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.text)
    }
}

/// Workspace root, two levels above this package
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// All `.rs` files under `dir` (relative to the workspace root)
pub fn rust_sources(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Production lines of `content`: comments stripped, test module excluded
pub fn production_lines(content: &str) -> Vec<(usize, &str)> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .map(|(idx, line)| (idx + 1, line.split("//").next().unwrap_or(line)))
        .filter(|(_, code)| !code.trim().is_empty())
        .collect()
}

/// Lines in production code under `dir` for which `is_forbidden` holds
pub fn scan(dir: &str, is_forbidden: impl Fn(&str) -> bool) -> Vec<Violation> {
    let mut violations = Vec::new();
    for path in rust_sources(dir) {
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };
        for (line, code) in production_lines(&content) {
            if is_forbidden(code) {
                violations.push(Violation {
                    path: path.clone(),
                    line,
                    text: code.trim().to_string(),
                });
            }
        }
    }
    violations
}

/// Whether a line of code calls a sleep function
pub fn calls_sleep(code: &str) -> bool {
    code.contains("::sleep(") || code.contains(".sleep(")
}

/// Whether a line of code names a terminal UI crate
pub fn uses_terminal_ui(code: &str) -> bool {
    ["ratatui", "crossterm"].iter().any(|name| code.contains(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let content = "fn a() {}\n// std::thread::sleep(x)\n#[cfg(test)]\nmod tests { fn b() { std::thread::sleep(x); } }";
        let lines = production_lines(content);
        assert_eq!(lines, vec![(1, "fn a() {}")]);
    }

    #[test]
    fn test_calls_sleep() {
        assert!(calls_sleep("    tokio::time::sleep(Duration::from_millis(5)).await;"));
        assert!(calls_sleep("std::thread::sleep(d);"));
        assert!(!calls_sleep("let mut ticker = tokio::time::interval(tick_rate);"));
    }

    #[test]
    fn test_sources_are_found() {
        assert!(!rust_sources("conductor/core/src").is_empty());
    }
}
