//! The conductor core is UI-agnostic
//!
//! Only surfaces may depend on terminal UI crates.

use std::fs;

use architectural_enforcement::{scan, uses_terminal_ui, workspace_root};

#[test]
fn test_core_sources_do_not_use_terminal_ui() {
    let violations = scan("conductor/core/src", uses_terminal_ui);

    assert!(
        violations.is_empty(),
        "conductor core references terminal UI crates:\n{}",
        violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
    );
}

#[test]
fn test_core_manifest_has_no_terminal_ui_dependency() {
    let manifest = fs::read_to_string(workspace_root().join("conductor/core/Cargo.toml")).unwrap();
    let dependencies = manifest
        .split("[dev-dependencies]")
        .next()
        .unwrap_or(&manifest);

    for name in ["ratatui", "crossterm"] {
        assert!(
            !dependencies.lines().any(|line| line.trim_start().starts_with(name)),
            "conductor core must not depend on {name}"
        );
    }
}
