use crate::process::{CommandResult, CommandSpec};

/// Executes supervised commands on behalf of an update session.
///
/// `run` must never panic or return an error: every failure is folded
/// into the returned [`CommandResult`]. Callers guarantee that at most
/// one `run` is in flight per runner.
pub trait CommandRunner: Send + Sync {
    /// Run `spec` to completion, timeout, or kill.
    fn run(&self, spec: &CommandSpec) -> CommandResult;

    /// Terminate the running command's process group, if any.
    fn kill_active(&self);
}
