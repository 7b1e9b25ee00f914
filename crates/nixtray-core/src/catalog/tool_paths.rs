use std::path::PathBuf;

/// Absolute paths of the external tools the catalog invokes.
///
/// Defaults point into the running NixOS system profile so commands do
/// not depend on the caller's `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    /// `nix` binary.
    pub nix: PathBuf,
    /// `bash` binary.
    pub bash: PathBuf,
    /// `pkexec` wrapper used to gain privileges for the rebuild.
    pub pkexec: PathBuf,
    /// `nixos-rebuild` binary.
    pub nixos_rebuild: PathBuf,
    /// Garbage-collect helper taking the number of generations to keep.
    pub nixgarbage: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            nix: PathBuf::from("/run/current-system/sw/bin/nix"),
            bash: PathBuf::from("/run/current-system/sw/bin/bash"),
            pkexec: PathBuf::from("/run/wrappers/bin/pkexec"),
            nixos_rebuild: PathBuf::from("/run/current-system/sw/bin/nixos-rebuild"),
            nixgarbage: PathBuf::from("/run/current-system/sw/bin/nixgarbage"),
        }
    }
}
