mod behaviour_config;
mod check_config;
#[allow(clippy::module_inception)]
mod config;
mod flake_config;
mod tools_config;

pub(crate) use {
    behaviour_config::BehaviourConfig, check_config::CheckConfig, config::Config,
    flake_config::FlakeConfig, tools_config::ToolsConfig,
};

use std::path::PathBuf;

use nixtray_core::ToolPaths;

pub(crate) const DEFAULT_REPO: &str = "/etc/nixos";
pub(crate) const DEFAULT_HOST: &str = "nixos";
pub(crate) const DEFAULT_INTERVAL_SECS: u64 = 12 * 60 * 60;
pub(crate) const DEFAULT_STARTUP_DELAY_SECS: u64 = 2;

pub(crate) fn default_repo() -> PathBuf {
    PathBuf::from(DEFAULT_REPO)
}

pub(crate) fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

pub(crate) fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

pub(crate) fn default_startup_delay_secs() -> u64 {
    DEFAULT_STARTUP_DELAY_SECS
}

pub(crate) fn default_nix() -> PathBuf {
    ToolPaths::default().nix
}

pub(crate) fn default_bash() -> PathBuf {
    ToolPaths::default().bash
}

pub(crate) fn default_pkexec() -> PathBuf {
    ToolPaths::default().pkexec
}

pub(crate) fn default_nixos_rebuild() -> PathBuf {
    ToolPaths::default().nixos_rebuild
}

pub(crate) fn default_nixgarbage() -> PathBuf {
    ToolPaths::default().nixgarbage
}
