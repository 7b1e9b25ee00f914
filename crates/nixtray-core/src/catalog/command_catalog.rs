//! Fixed templates for the external commands of the update pipeline.
//!
//! Building a [`CommandSpec`] here is pure substitution of the repository
//! path, host name and output path into argument vectors. Nothing is
//! executed and nothing touches the filesystem.

use crate::{catalog::ToolPaths, process::CommandSpec};

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Feature line appended to `NIX_CONFIG` for every nix invocation.
const NIX_FEATURES: &str = "experimental-features = nix-command flakes";

/// Value a template needs before it can become a [`CommandSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Substitution {
    /// Flake repository path.
    RepoPath,
    /// Host configuration name.
    HostName,
    /// Where a generated artifact is written.
    OutputPath,
    /// Number of system generations to retain.
    GenerationsToKeep,
}

/// The external commands the session can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandTemplate {
    /// Re-lock flake inputs into a private output file.
    LockRefresh,
    /// Repository sync script.
    Sync,
    /// Privileged rebuild-and-switch of the host configuration.
    Apply,
    /// Garbage collection keeping the newest N generations.
    GarbageCollect,
}

impl CommandTemplate {
    /// Short name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            CommandTemplate::LockRefresh => "lock-refresh",
            CommandTemplate::Sync => "sync",
            CommandTemplate::Apply => "apply",
            CommandTemplate::GarbageCollect => "garbage-collect",
        }
    }

    /// Values substituted into this template.
    pub fn substitutions(self) -> &'static [Substitution] {
        match self {
            CommandTemplate::LockRefresh => &[Substitution::RepoPath, Substitution::OutputPath],
            CommandTemplate::Sync => &[Substitution::RepoPath],
            CommandTemplate::Apply => &[Substitution::RepoPath, Substitution::HostName],
            CommandTemplate::GarbageCollect => {
                &[Substitution::RepoPath, Substitution::GenerationsToKeep]
            }
        }
    }

    /// Timeout set on the built command.
    pub fn default_timeout(self) -> Duration {
        match self {
            CommandTemplate::LockRefresh => Duration::from_secs(600),
            CommandTemplate::Sync => Duration::from_secs(600),
            CommandTemplate::Apply => Duration::from_secs(3600),
            CommandTemplate::GarbageCollect => Duration::from_secs(1800),
        }
    }
}

/// Builds concrete command specs for one repository and host.
#[derive(Debug, Clone)]
pub struct CommandCatalog {
    repo: PathBuf,
    host: String,
    tools: ToolPaths,
    inherited_nix_config: Option<String>,
}

impl CommandCatalog {
    /// Create a catalog.
    ///
    /// `inherited_nix_config` is the caller's `NIX_CONFIG`, which the
    /// lock-refresh command extends rather than replaces.
    pub fn new(
        repo: impl Into<PathBuf>,
        host: impl Into<String>,
        tools: ToolPaths,
        inherited_nix_config: Option<String>,
    ) -> Self {
        Self {
            repo: repo.into(),
            host: host.into(),
            tools,
            inherited_nix_config,
        }
    }

    /// Flake repository path.
    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// Host configuration name.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Tool paths in use.
    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }

    /// The repository's committed lock file.
    pub fn reference_lock(&self) -> PathBuf {
        self.repo.join("flake.lock")
    }

    /// Script run by the sync step.
    pub fn sync_script(&self) -> PathBuf {
        self.repo.join("scripts").join("git-sync.sh")
    }

    /// Refresh all inputs and write the result to `output` only.
    pub fn lock_refresh(&self, output: &Path) -> CommandSpec {
        CommandSpec::new([
            path_arg(&self.tools.nix),
            "--extra-experimental-features".to_string(),
            "nix-command".to_string(),
            "--extra-experimental-features".to_string(),
            "flakes".to_string(),
            "flake".to_string(),
            "lock".to_string(),
            "--refresh".to_string(),
            "--output-lock-file".to_string(),
            path_arg(output),
            path_arg(&self.repo),
        ])
        .current_dir(&self.repo)
        .env("NIX_CONFIG", self.nix_config())
        .timeout(CommandTemplate::LockRefresh.default_timeout())
    }

    /// Run the repository sync script.
    pub fn sync(&self) -> CommandSpec {
        CommandSpec::new([path_arg(&self.tools.bash), path_arg(&self.sync_script())])
            .current_dir(&self.repo)
            .timeout(CommandTemplate::Sync.default_timeout())
    }

    /// Rebuild and switch to the host configuration through `pkexec`.
    pub fn apply(&self) -> CommandSpec {
        let script = format!(
            "cd {} && {} switch --flake {}",
            shell_words::quote(&path_arg(&self.repo)),
            shell_words::quote(&path_arg(&self.tools.nixos_rebuild)),
            shell_words::quote(&format!(".#{}", self.host)),
        );

        CommandSpec::new([
            path_arg(&self.tools.pkexec),
            path_arg(&self.tools.bash),
            "-lc".to_string(),
            script,
        ])
        .current_dir(&self.repo)
        .timeout(CommandTemplate::Apply.default_timeout())
    }

    /// Collect garbage, keeping the newest `keep` generations.
    pub fn garbage_collect(&self, keep: u32) -> CommandSpec {
        CommandSpec::new([path_arg(&self.tools.nixgarbage), keep.to_string()])
            .current_dir(&self.repo)
            .timeout(CommandTemplate::GarbageCollect.default_timeout())
    }

    fn nix_config(&self) -> String {
        match self.inherited_nix_config.as_deref() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{NIX_FEATURES}"),
            _ => NIX_FEATURES.to_string(),
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
