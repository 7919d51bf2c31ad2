//! Production code never sleeps
//!
//! Waiting belongs to I/O: a channel receive, a stream poll or a
//! `tokio::time::interval` tick. Test code is exempt.

use architectural_enforcement::{calls_sleep, scan};

#[test]
fn test_no_sleep_in_production_code() {
    let violations: Vec<_> = ["conductor/core/src", "tui/src"]
        .into_iter()
        .flat_map(|dir| scan(dir, calls_sleep))
        .collect();

    if !violations.is_empty() {
        for violation in &violations {
            eprintln!("  {violation}");
        }
        panic!(
            "Found {} sleep call(s) in production code; wait on I/O or use tokio::time::interval",
            violations.len()
        );
    }
}
