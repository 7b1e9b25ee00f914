use crate::{CoreError, CoreResult};

use std::{collections::BTreeMap, fs, panic::Location, path::Path};

use error_location::ErrorLocation;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Resolved-version attributes of a node (`owner`, `repo`, `rev`, ...).
pub type LockedAttrs = Map<String, Value>;

/// A flake lock document, reduced to its node table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LockDocument {
    /// Node records keyed by input name.
    pub nodes: BTreeMap<String, LockNode>,
}

/// One input entry of the node table.
///
/// A missing or null `locked` object is treated as empty. Other node fields
/// (`inputs`, `original`, `flake`) do not take part in comparison.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LockNode {
    /// Resolved-version attributes.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub locked: LockedAttrs,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<LockedAttrs, D::Error> {
    Ok(Option::<LockedAttrs>::deserialize(deserializer)?.unwrap_or_default())
}

impl LockDocument {
    /// Read and parse the lock document at `path`.
    #[track_caller]
    pub fn parse(path: &Path) -> CoreResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| CoreError::ParseError {
            path: path.to_path_buf(),
            reason: format!("Failed to read lock file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Self::from_json(&contents).map_err(|reason| CoreError::ParseError {
            path: path.to_path_buf(),
            reason,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Parse a lock document from JSON text.
    pub fn from_json(contents: &str) -> Result<Self, String> {
        serde_json::from_str(contents).map_err(|e| e.to_string())
    }
}
