use std::fmt;

/// One difference between two node tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEntry {
    /// Node only present in the new document.
    Added(String),
    /// Node only present in the old document.
    Removed(String),
    /// Node whose `locked` attributes differ.
    Modified {
        /// Node name.
        key: String,
        /// Short description of the old resolved version.
        old: String,
        /// Short description of the new resolved version.
        new: String,
    },
}

impl ChangeEntry {
    /// Node name this entry is about.
    pub fn key(&self) -> &str {
        match self {
            ChangeEntry::Added(key) | ChangeEntry::Removed(key) => key,
            ChangeEntry::Modified { key, .. } => key,
        }
    }
}

impl fmt::Display for ChangeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeEntry::Added(key) => write!(f, "{key}: added"),
            ChangeEntry::Removed(key) => write!(f, "{key}: removed"),
            ChangeEntry::Modified { key, old, new } => write!(f, "{key}: {old} -> {new}"),
        }
    }
}

/// Differences between two lock documents, in sorted node-key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: Vec<ChangeEntry>,
}

impl ChangeSet {
    pub(crate) fn new(entries: Vec<ChangeEntry>) -> Self {
        Self { entries }
    }

    /// True when at least one node differs.
    pub fn has_changes(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Number of changed nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing changed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in sorted node-key order.
    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    /// One line per entry.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }

    /// Headline plus the first `limit` entries, newline separated.
    pub fn summary(&self, limit: usize) -> String {
        let mut text = format!("{} flake input update(s) available", self.entries.len());
        for entry in self.entries.iter().take(limit) {
            text.push('\n');
            text.push_str(&entry.to_string());
        }
        if self.entries.len() > limit {
            text.push_str(&format!("\n... and {} more", self.entries.len() - limit));
        }
        text
    }
}
