//! Build profiles live in the root manifest
//!
//! Cargo ignores `[profile.*]` tables in member manifests.

use std::fs;

use architectural_enforcement::workspace_root;

#[test]
fn test_members_declare_no_profiles() {
    for member in ["conductor/core", "tui", "tests/architectural-enforcement"] {
        let manifest = fs::read_to_string(workspace_root().join(member).join("Cargo.toml")).unwrap();
        assert!(
            !manifest.lines().any(|line| line.trim_start().starts_with("[profile")),
            "{member}/Cargo.toml declares a profile"
        );
    }
}

#[test]
fn test_root_declares_release_profile() {
    let manifest = fs::read_to_string(workspace_root().join("Cargo.toml")).unwrap();
    assert!(manifest.lines().any(|line| line.trim() == "[profile.release]"));
}
