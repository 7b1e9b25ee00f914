use crate::{
    CoreResult,
    lockfile::{ChangeEntry, ChangeSet, LockDocument, LockedAttrs},
};

use std::{collections::BTreeSet, path::Path};

use serde_json::Value;
use tracing::{debug, instrument};

/// Number of `rev` characters kept in a description.
pub const REV_DISPLAY_LEN: usize = 12;

/// Compare the lock files at `old_path` and `new_path`.
///
/// Returns whether anything changed together with the entries.
#[track_caller]
#[instrument]
pub fn diff(old_path: &Path, new_path: &Path) -> CoreResult<(bool, ChangeSet)> {
    let old = LockDocument::parse(old_path)?;
    let new = LockDocument::parse(new_path)?;

    let changes = diff_documents(&old, &new);
    debug!(changed = changes.len(), "Lock files compared");

    Ok((changes.has_changes(), changes))
}

/// Compare two parsed lock documents node by node.
pub fn diff_documents(old: &LockDocument, new: &LockDocument) -> ChangeSet {
    let keys: BTreeSet<&String> = old.nodes.keys().chain(new.nodes.keys()).collect();

    let entries = keys
        .into_iter()
        .filter_map(|key| match (old.nodes.get(key), new.nodes.get(key)) {
            (None, Some(_)) => Some(ChangeEntry::Added(key.clone())),
            (Some(_), None) => Some(ChangeEntry::Removed(key.clone())),
            (Some(o), Some(n)) if o.locked != n.locked => Some(ChangeEntry::Modified {
                key: key.clone(),
                old: describe(&o.locked),
                new: describe(&n.locked),
            }),
            _ => None,
        })
        .collect();

    ChangeSet::new(entries)
}

/// Short human description of a `locked` object.
///
/// `owner/repo`, then `ref`, then the first of a truncated `rev`,
/// `ts:<lastModified>` or `version`.
pub fn describe(locked: &LockedAttrs) -> String {
    if locked.is_empty() {
        return "unknown".to_string();
    }

    let mut parts = Vec::new();

    if let (Some(owner), Some(repo)) = (locked.get("owner"), locked.get("repo")) {
        parts.push(format!("{}/{}", scalar(owner), scalar(repo)));
    }
    if let Some(git_ref) = locked.get("ref") {
        parts.push(scalar(git_ref));
    }
    if let Some(rev) = locked.get("rev") {
        parts.push(scalar(rev).chars().take(REV_DISPLAY_LEN).collect());
    } else if let Some(ts) = locked.get("lastModified") {
        parts.push(format!("ts:{}", scalar(ts)));
    } else if let Some(version) = locked.get("version") {
        parts.push(scalar(version));
    }

    if parts.is_empty() {
        "changed".to_string()
    } else {
        parts.join(" ")
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
