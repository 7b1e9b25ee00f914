use crate::config::{
    default_bash, default_nix, default_nixgarbage, default_nixos_rebuild, default_pkexec,
};

use std::path::PathBuf;

use nixtray_core::ToolPaths;
use serde::{Deserialize, Serialize};

/// Absolute paths of the external tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// `nix` binary.
    #[serde(default = "default_nix")]
    pub nix: PathBuf,
    /// `bash` binary.
    #[serde(default = "default_bash")]
    pub bash: PathBuf,
    /// `pkexec` wrapper.
    #[serde(default = "default_pkexec")]
    pub pkexec: PathBuf,
    /// `nixos-rebuild` binary.
    #[serde(default = "default_nixos_rebuild")]
    pub nixos_rebuild: PathBuf,
    /// Garbage collection helper.
    #[serde(default = "default_nixgarbage")]
    pub nixgarbage: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        ToolPaths::default().into()
    }
}

impl From<ToolPaths> for ToolsConfig {
    fn from(paths: ToolPaths) -> Self {
        Self {
            nix: paths.nix,
            bash: paths.bash,
            pkexec: paths.pkexec,
            nixos_rebuild: paths.nixos_rebuild,
            nixgarbage: paths.nixgarbage,
        }
    }
}

impl From<&ToolsConfig> for ToolPaths {
    fn from(config: &ToolsConfig) -> Self {
        Self {
            nix: config.nix.clone(),
            bash: config.bash.clone(),
            pkexec: config.pkexec.clone(),
            nixos_rebuild: config.nixos_rebuild.clone(),
            nixgarbage: config.nixgarbage.clone(),
        }
    }
}
