use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

/// File name of the candidate lock file inside the cache directory.
pub const CANDIDATE_FILE_NAME: &str = "flake.lock.nixtray.new";

/// What happens to the candidate lock file once a check completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateRetention {
    /// Delete the candidate when no updates were found.
    Delete,
    /// Leave the candidate in place.
    #[default]
    Keep,
    /// Leave it in place and also copy it to a timestamped file.
    Archive,
}

impl FromStr for CandidateRetention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delete" => Ok(CandidateRetention::Delete),
            "keep" => Ok(CandidateRetention::Keep),
            "archive" => Ok(CandidateRetention::Archive),
            other => Err(format!(
                "unknown candidate retention '{other}' (expected delete, keep or archive)"
            )),
        }
    }
}

impl fmt::Display for CandidateRetention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CandidateRetention::Delete => "delete",
            CandidateRetention::Keep => "keep",
            CandidateRetention::Archive => "archive",
        };
        f.write_str(name)
    }
}

/// Tunables of an update session that are not part of any command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Directory holding candidate lock files.
    pub cache_dir: PathBuf,
    /// Candidate lock file policy.
    pub retention: CandidateRetention,
    /// Generations kept by garbage collection after an apply; `None` skips it.
    pub gc_keep_generations: Option<u32>,
    /// Changed inputs listed in the "updates available" notification.
    pub summary_limit: usize,
}

impl SessionSettings {
    /// Settings with the given cache directory and default policies.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            retention: CandidateRetention::default(),
            gc_keep_generations: None,
            summary_limit: 5,
        }
    }

    /// Fixed location of the candidate lock file.
    pub fn candidate_path(&self) -> PathBuf {
        self.cache_dir.join(CANDIDATE_FILE_NAME)
    }

    /// Timestamped archive location for a candidate written at `unix_secs`.
    pub fn archive_path(&self, unix_secs: i64) -> PathBuf {
        self.cache_dir
            .join(format!("flake.lock.nixtray.{unix_secs}.new"))
    }
}
