use crate::config::{default_interval_secs, default_startup_delay_secs};

use std::path::PathBuf;

use nixtray_core::CandidateRetention;
use serde::{Deserialize, Serialize};

/// Update check scheduling and candidate lock file handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Where candidate lock files are written. Defaults to `<repo>/.cache/nixtray`.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// What happens to the candidate after a check.
    #[serde(default)]
    pub candidate_retention: CandidateRetention,
    /// Seconds between scheduled checks.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Seconds before the first scheduled check.
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            candidate_retention: CandidateRetention::default(),
            interval_secs: default_interval_secs(),
            startup_delay_secs: default_startup_delay_secs(),
        }
    }
}
