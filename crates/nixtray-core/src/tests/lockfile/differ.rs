use crate::{
    ChangeEntry, LockDocument, LockedAttrs, describe, diff, diff_documents,
    tests::support::lock_json,
};

use std::fs;

use serde_json::json;
use tempfile::TempDir;

fn doc(value: serde_json::Value) -> LockDocument {
    LockDocument::from_json(&value.to_string()).unwrap_or_default()
}

fn locked(value: serde_json::Value) -> LockedAttrs {
    match value {
        serde_json::Value::Object(map) => map,
        _ => LockedAttrs::new(),
    }
}

/// WHAT: A document compared with itself has no changes
/// WHY: An unchanged candidate must report "no updates"
#[test]
fn given_same_document_when_diffed_then_empty() {
    // Given: A realistic lock document
    let a = LockDocument::from_json(&lock_json(&[
        ("nixpkgs", "aaaaaaaaaaaaaaaaaaaa"),
        ("home-manager", "cccccccccccccccccccc"),
    ]))
    .unwrap_or_default();

    // When: Diffing it against itself
    let changes = diff_documents(&a, &a);

    // Then: Nothing changed
    assert!(!changes.has_changes());
    assert!(changes.is_empty());
}

/// WHAT: Swapping arguments swaps Added/Removed and old/new
/// WHY: The diff must not depend on which file is read first
#[test]
fn given_two_documents_when_diffed_both_ways_then_mirrored() {
    // Given: Documents differing by an add, a remove and a modify
    let a = doc(json!({"nodes": {
        "a": {"locked": {"rev": "1111111111111111"}},
        "b": {"locked": {"rev": "2222222222222222"}}
    }}));
    let b = doc(json!({"nodes": {
        "b": {"locked": {"rev": "3333333333333333"}},
        "c": {"locked": {"rev": "4444444444444444"}}
    }}));

    // When: Diffing both ways
    let forward = diff_documents(&a, &b);
    let backward = diff_documents(&b, &a);

    // Then: Entries mirror each other
    assert_eq!(
        forward.entries(),
        &[
            ChangeEntry::Removed("a".to_string()),
            ChangeEntry::Modified {
                key: "b".to_string(),
                old: "222222222222".to_string(),
                new: "333333333333".to_string(),
            },
            ChangeEntry::Added("c".to_string()),
        ]
    );
    assert_eq!(
        backward.entries(),
        &[
            ChangeEntry::Added("a".to_string()),
            ChangeEntry::Modified {
                key: "b".to_string(),
                old: "333333333333".to_string(),
                new: "222222222222".to_string(),
            },
            ChangeEntry::Removed("c".to_string()),
        ]
    );
}

/// WHAT: Key order inside locked objects does not matter
/// WHY: Comparison is structural, not textual
#[test]
fn given_reordered_locked_fields_when_diffed_then_no_entry() {
    // Given: The same locked object written in two key orders
    let a = LockDocument::from_json(
        r#"{"nodes":{"nixpkgs":{"locked":{"owner":"NixOS","repo":"nixpkgs","rev":"abc"}}}}"#,
    )
    .unwrap_or_default();
    let b = LockDocument::from_json(
        r#"{"nodes":{"nixpkgs":{"locked":{"rev":"abc","repo":"nixpkgs","owner":"NixOS"}}}}"#,
    )
    .unwrap_or_default();

    // When: Diffing them
    let changes = diff_documents(&a, &b);

    // Then: No entry is produced
    assert!(changes.is_empty());
}

/// WHAT: A rev bump yields one Modified entry with 12-char revisions
/// WHY: Notifications show short, recognizable revisions
#[test]
#[allow(clippy::unwrap_used, clippy::panic)]
fn given_rev_bump_on_disk_when_diffed_then_single_modified_entry() {
    // Given: Reference and candidate files differing only in nixpkgs.rev
    let dir = TempDir::new().unwrap();
    let old_path = dir.path().join("flake.lock");
    let new_path = dir.path().join("flake.lock.new");
    fs::write(&old_path, lock_json(&[("nixpkgs", "aaaaaaaaaaaaaaaaaaaa")])).unwrap();
    fs::write(&new_path, lock_json(&[("nixpkgs", "bbbbbbbbbbbbbbbbbbbb")])).unwrap();

    // When: Diffing the files
    let (has_changes, changes) = diff(&old_path, &new_path).unwrap();

    // Then: Exactly one Modified entry for nixpkgs
    assert!(has_changes);
    assert_eq!(changes.len(), 1);
    match &changes.entries()[0] {
        ChangeEntry::Modified { key, old, new } => {
            assert_eq!(key, "nixpkgs");
            assert!(old.contains("aaaaaaaaaaaa"));
            assert!(!old.contains("aaaaaaaaaaaaa"));
            assert!(new.contains("bbbbbbbbbbbb"));
            assert!(!new.contains("bbbbbbbbbbbbb"));
        }
        other => panic!("unexpected entry: {other:?}"),
    }
}

/// WHAT: Removed and added nodes are reported in sorted key order
/// WHY: Output must be deterministic across runs
#[test]
fn given_nodes_ab_and_bc_when_diffed_then_removed_a_then_added_c() {
    // Given: {a, b} versus {b, c} with b unchanged
    let old = doc(json!({"nodes": {
        "b": {"locked": {"rev": "same"}},
        "a": {"locked": {"rev": "x"}}
    }}));
    let new = doc(json!({"nodes": {
        "c": {"locked": {"rev": "y"}},
        "b": {"locked": {"rev": "same"}}
    }}));

    // When: Diffing them
    let changes = diff_documents(&old, &new);

    // Then: [Removed(a), Added(c)]
    assert_eq!(
        changes.entries(),
        &[
            ChangeEntry::Removed("a".to_string()),
            ChangeEntry::Added("c".to_string()),
        ]
    );
}

/// WHAT: Descriptions follow owner/repo, ref, then rev-or-fallback
/// WHY: Keeps notification lines short and comparable
#[test]
fn given_locked_variants_when_described_then_precedence_applied() {
    // Given/When/Then: Each combination of recognized fields
    assert_eq!(describe(&locked(json!({}))), "unknown");
    assert_eq!(describe(&locked(json!({"narHash": "sha256-x"}))), "changed");
    assert_eq!(
        describe(&locked(json!({
            "owner": "NixOS",
            "repo": "nixpkgs",
            "ref": "nixos-unstable",
            "rev": "0123456789abcdef0123",
            "lastModified": 1700000000
        }))),
        "NixOS/nixpkgs nixos-unstable 0123456789ab"
    );
    assert_eq!(
        describe(&locked(json!({"owner": "NixOS", "lastModified": 1700000000}))),
        "ts:1700000000"
    );
    assert_eq!(
        describe(&locked(json!({"version": "1.2.3", "narHash": "sha256-x"}))),
        "1.2.3"
    );
    assert_eq!(
        describe(&locked(json!({"lastModified": 5, "version": "1.2.3"}))),
        "ts:5"
    );
}

/// WHAT: Summary lists a headline and at most `limit` entries
/// WHY: Desktop notifications have little room
#[test]
fn given_many_changes_when_summarized_then_truncated() {
    // Given: Seven added nodes
    let old = doc(json!({"nodes": {}}));
    let new = doc(json!({"nodes": {
        "a": {}, "b": {}, "c": {}, "d": {}, "e": {}, "f": {}, "g": {}
    }}));
    let changes = diff_documents(&old, &new);

    // When: Summarizing with a limit of 5
    let summary = changes.summary(5);

    // Then: Headline, five entries and an overflow line
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines[0], "7 flake input update(s) available");
    assert_eq!(lines[1], "a: added");
    assert_eq!(lines[5], "e: added");
    assert_eq!(lines[6], "... and 2 more");
    assert_eq!(lines.len(), 7);
}
