use uuid::Uuid;

/// Commands sent to the main application loop.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Look for flake input updates.
    Check {
        /// Unique ID for this operation, used in diagnostics.
        operation_id: Uuid,
    },
    /// Sync the repository and switch to the new configuration.
    SyncApply {
        /// Unique ID for this operation, used in diagnostics.
        operation_id: Uuid,
    },
    /// Check, then sync and apply when updates were found.
    CheckThenSyncApply {
        /// Unique ID for this operation, used in diagnostics.
        operation_id: Uuid,
    },
    /// Request application shutdown.
    Shutdown,
}

impl AppCommand {
    /// A fresh `Check` command.
    pub fn check() -> Self {
        AppCommand::Check {
            operation_id: Uuid::new_v4(),
        }
    }

    /// A fresh `SyncApply` command.
    pub fn sync_apply() -> Self {
        AppCommand::SyncApply {
            operation_id: Uuid::new_v4(),
        }
    }

    /// A fresh `CheckThenSyncApply` command.
    pub fn check_then_sync_apply() -> Self {
        AppCommand::CheckThenSyncApply {
            operation_id: Uuid::new_v4(),
        }
    }
}
