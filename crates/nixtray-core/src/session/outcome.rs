use crate::{CoreError, lockfile::ChangeSet};

/// Result of [`UpdateSession::check`](crate::UpdateSession::check).
#[derive(Debug)]
pub enum CheckOutcome {
    /// Another operation was in flight; nothing happened.
    AlreadyRunning,
    /// The candidate lock file matches the reference.
    NoUpdates,
    /// Newer inputs are available.
    UpdatesAvailable(ChangeSet),
    /// The check could not complete.
    Failed(CoreError),
}

/// Result of [`UpdateSession::sync_apply`](crate::UpdateSession::sync_apply).
#[derive(Debug)]
pub enum ApplyOutcome {
    /// Another operation was in flight; nothing happened.
    AlreadyRunning,
    /// Sync and rebuild-switch both succeeded.
    Applied,
    /// Sync or rebuild-switch failed.
    Failed(CoreError),
}

/// Result of [`UpdateSession::check_then_sync_apply`](crate::UpdateSession::check_then_sync_apply).
#[derive(Debug)]
pub enum CheckThenApplyOutcome {
    /// Another operation was in flight; nothing happened.
    AlreadyRunning,
    /// Nothing to apply; sync and apply were skipped.
    NoUpdates,
    /// Updates were found and applied.
    Applied(ChangeSet),
    /// The check failed; nothing was applied.
    CheckFailed(CoreError),
    /// Updates were found but sync or apply failed.
    ApplyFailed(CoreError),
}
