use crate::LogSink;

use std::fs;

use tempfile::TempDir;

/// WHAT: Blocks are appended with a titled, timestamped header
/// WHY: Operators read the log top to bottom after a failure
#[test]
#[allow(clippy::unwrap_used)]
fn given_two_blocks_when_written_then_both_appear_in_order() {
    // Given: A sink inside a directory that does not exist yet
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("nixtray.log");
    let sink = LogSink::new(&path);

    // When: Writing two blocks
    sink.block("Startup", &["repo: /etc/nixos", "host: nixos"]);
    sink.block("Command", &["cmd: nix flake lock"]);

    // Then: The file holds both blocks, first one first
    let contents = fs::read_to_string(&path).unwrap();
    let startup = contents.find("=== Startup (").unwrap();
    let command = contents.find("=== Command (").unwrap();
    assert!(startup < command);
    assert!(contents.contains("repo: /etc/nixos\nhost: nixos\n"));
    assert!(contents.starts_with('\n'));
}

/// WHAT: Lines that already end in a newline are not doubled
/// WHY: Captured command output often ends with a newline
#[test]
#[allow(clippy::unwrap_used)]
fn given_line_with_trailing_newline_when_written_then_single_newline_kept() {
    // Given: A sink
    let dir = TempDir::new().unwrap();
    let sink = LogSink::new(dir.path().join("log"));

    // When: Writing a line ending with a newline
    sink.block("Result", &["stdout:\nok\n"]);

    // Then: No blank line follows it
    let contents = fs::read_to_string(sink.path()).unwrap();
    assert!(contents.ends_with("stdout:\nok\n"));
    assert!(!contents.ends_with("\n\n"));
}

/// WHAT: An unwritable log path does not panic
/// WHY: Logging must never fail the operation being logged
#[test]
fn given_unwritable_path_when_writing_block_then_no_panic() {
    // Given: A sink pointing below /dev/null
    let sink = LogSink::new("/dev/null/nixtray.log");

    // When/Then: Writing returns normally
    sink.block("Error", &["ignored"]);
}
