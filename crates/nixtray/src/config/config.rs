//! Configuration management for nixtray.
//!
//! Handles loading and saving the TOML configuration file from the
//! platform config directory, `NIXTRAY_*` environment overrides, and the
//! startup validation of the flake repository.

use crate::{
    AppError, AppResult,
    config::{BehaviourConfig, CheckConfig, FlakeConfig, ToolsConfig},
};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use nixtray_core::{CandidateRetention, SessionSettings, ToolPaths};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

pub(crate) const ENV_REPO: &str = "NIXTRAY_REPO";
pub(crate) const ENV_HOST: &str = "NIXTRAY_HOST";
pub(crate) const ENV_LOG: &str = "NIXTRAY_LOG";
pub(crate) const ENV_CACHE_DIR: &str = "NIXTRAY_CACHE_DIR";
pub(crate) const ENV_KEEP_LOCK: &str = "NIXTRAY_KEEP_LOCK";
pub(crate) const ENV_RETENTION: &str = "NIXTRAY_RETENTION";
pub(crate) const ENV_DEBUG: &str = "NIXTRAY_DEBUG";
pub(crate) const ENV_GC_KEEP: &str = "NIXTRAY_GC_KEEP";
pub(crate) const ENV_NIX: &str = "NIXTRAY_NIX";
pub(crate) const ENV_BASH: &str = "NIXTRAY_BASH";
pub(crate) const ENV_PKEXEC: &str = "NIXTRAY_PKEXEC";
pub(crate) const ENV_NIXOS_REBUILD: &str = "NIXTRAY_NIXOS_REBUILD";
pub(crate) const ENV_NIXGARBAGE: &str = "NIXTRAY_NIXGARBAGE";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Flake repository and host.
    #[serde(default)]
    pub flake: FlakeConfig,
    /// Update check settings.
    #[serde(default)]
    pub check: CheckConfig,
    /// External tool paths.
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Application behavior settings.
    #[serde(default)]
    pub behaviour: BehaviourConfig,
}

impl Config {
    /// Load configuration from disk, creating a default file if none exists,
    /// then apply `NIXTRAY_*` environment overrides.
    ///
    /// The repository is NOT validated here; call `validate_repo()`.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load `config_path`, writing defaults there first if it does not exist.
    #[track_caller]
    #[instrument]
    pub fn load_from(config_path: &Path) -> AppResult<Self> {
        if !config_path.exists() {
            info!(config_path = ?config_path, "No config found, creating default");
            let config = Config::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to read config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration loaded");

        Ok(config)
    }

    /// Overlay environment variables on top of the file values.
    ///
    /// `lookup` returns the value of a variable, if set. `NIXTRAY_RETENTION`
    /// takes precedence over the older `NIXTRAY_KEEP_LOCK` switch.
    #[track_caller]
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);

        if let Some(repo) = path(ENV_REPO) {
            self.flake.repo = repo;
        }
        if let Some(host) = lookup(ENV_HOST).filter(|v| !v.is_empty()) {
            self.flake.host = host;
        }
        if let Some(log) = path(ENV_LOG) {
            self.behaviour.log_path = Some(log);
        }
        if let Some(cache_dir) = path(ENV_CACHE_DIR) {
            self.check.cache_dir = Some(cache_dir);
        }

        if let Some(keep) = lookup(ENV_KEEP_LOCK) {
            self.check.candidate_retention = if keep.trim() == "1" {
                CandidateRetention::Keep
            } else {
                CandidateRetention::Delete
            };
        }
        if let Some(retention) = lookup(ENV_RETENTION) {
            self.check.candidate_retention =
                retention.parse().map_err(|reason| AppError::ConfigError {
                    reason: format!("{}: {}", ENV_RETENTION, reason),
                    location: ErrorLocation::from(Location::caller()),
                })?;
        }

        if let Some(debug) = lookup(ENV_DEBUG) {
            self.behaviour.debug = debug.trim() == "1";
        }
        if let Some(keep) = lookup(ENV_GC_KEEP) {
            let keep = keep.trim().parse::<u32>().map_err(|e| AppError::ConfigError {
                reason: format!("{}: {}", ENV_GC_KEEP, e),
                location: ErrorLocation::from(Location::caller()),
            })?;
            self.behaviour.gc_keep_generations = Some(keep);
        }

        let tools = [
            (ENV_NIX, &mut self.tools.nix),
            (ENV_BASH, &mut self.tools.bash),
            (ENV_PKEXEC, &mut self.tools.pkexec),
            (ENV_NIXOS_REBUILD, &mut self.tools.nixos_rebuild),
            (ENV_NIXGARBAGE, &mut self.tools.nixgarbage),
        ];
        for (key, slot) in tools {
            if let Some(value) = path(key) {
                *slot = value;
            }
        }

        Ok(())
    }

    /// Check that the repository exists and contains a `flake.nix`.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn validate_repo(&self) -> AppResult<()> {
        let repo = &self.flake.repo;
        if !repo.is_dir() {
            return Err(AppError::ConfigError {
                reason: format!("Flake repository not found at: {:?}", repo),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        if !repo.join("flake.nix").is_file() {
            return Err(AppError::ConfigError {
                reason: format!("No flake.nix in repository: {:?}", repo),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }

    /// Save configuration to `config_path` using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument]
    pub fn save_to(&self, config_path: &Path) -> AppResult<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = config_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Directory holding candidate lock files.
    pub fn cache_dir(&self) -> PathBuf {
        self.check
            .cache_dir
            .clone()
            .unwrap_or_else(|| self.flake.repo.join(".cache").join("nixtray"))
    }

    /// Operator log file.
    pub fn log_path(&self) -> PathBuf {
        self.behaviour
            .log_path
            .clone()
            .unwrap_or_else(|| self.cache_dir().join("nixtray.log"))
    }

    /// Time between scheduled checks.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check.interval_secs.max(1))
    }

    /// Delay before the first scheduled check.
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.check.startup_delay_secs)
    }

    /// Session tunables derived from this configuration.
    pub fn session_settings(&self) -> SessionSettings {
        let mut settings = SessionSettings::new(self.cache_dir());
        settings.retention = self.check.candidate_retention;
        settings.gc_keep_generations = self.behaviour.gc_keep_generations;
        settings
    }

    /// Tool paths for the command catalog.
    pub fn tool_paths(&self) -> ToolPaths {
        ToolPaths::from(&self.tools)
    }

    /// Effective values, one `key: value` line each, for the startup log block.
    pub fn startup_lines(&self) -> Vec<String> {
        vec![
            format!("repo: {}", self.flake.repo.display()),
            format!("host: {}", self.flake.host),
            format!("log: {}", self.log_path().display()),
            format!("cache_dir: {}", self.cache_dir().display()),
            format!("retention: {}", self.check.candidate_retention),
            format!("debug: {}", self.behaviour.debug),
            format!("interval_secs: {}", self.check.interval_secs),
            format!(
                "gc_keep_generations: {}",
                self.behaviour
                    .gc_keep_generations
                    .map_or_else(|| "none".to_string(), |n| n.to_string())
            ),
            format!("nix: {}", self.tools.nix.display()),
            format!("bash: {}", self.tools.bash.display()),
            format!("pkexec: {}", self.tools.pkexec.display()),
            format!("nixos_rebuild: {}", self.tools.nixos_rebuild.display()),
            format!("nixgarbage: {}", self.tools.nixgarbage.display()),
        ]
    }

    #[track_caller]
    fn config_path() -> AppResult<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "nixtray", "nixtray").ok_or_else(|| {
            AppError::ConfigError {
                reason: "Failed to get config directory".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Ok(config_dir.join("config.toml"))
    }
}
