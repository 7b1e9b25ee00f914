use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application behavior settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehaviourConfig {
    /// Operator log file. Defaults to `<cache dir>/nixtray.log`.
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    /// Verbose diagnostics.
    #[serde(default)]
    pub debug: bool,
    /// Generations kept by garbage collection after apply. Unset skips it.
    #[serde(default)]
    pub gc_keep_generations: Option<u32>,
}
