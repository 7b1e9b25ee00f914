use crate::config::{default_host, default_repo};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Flake repository and host selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlakeConfig {
    /// Flake repository checkout.
    #[serde(default = "default_repo")]
    pub repo: PathBuf,
    /// `nixosConfigurations` attribute to rebuild.
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for FlakeConfig {
    fn default() -> Self {
        Self {
            repo: default_repo(),
            host: default_host(),
        }
    }
}
