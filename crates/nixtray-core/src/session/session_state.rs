use crate::logging::TIMESTAMP_FORMAT;

use std::fmt;

use chrono::{DateTime, Local};

/// Which operation the session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Ready to accept an operation.
    Idle,
    /// Producing and comparing a candidate lock file.
    Checking,
    /// Running the repository sync script.
    Syncing,
    /// Rebuilding and switching the host configuration.
    Applying,
}

impl SessionState {
    /// True while any operation is in flight.
    pub fn is_busy(self) -> bool {
        self != SessionState::Idle
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Checking => "checking",
            SessionState::Syncing => "syncing",
            SessionState::Applying => "applying",
        };
        f.write_str(name)
    }
}

/// Coarse classification of the latest status, used to pick an icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    /// Up to date or last operation succeeded.
    Ready,
    /// A check found newer inputs.
    UpdatesAvailable,
    /// An operation is running.
    Busy,
    /// The last operation failed.
    Failed,
}

/// Point-in-time view of the session, pushed to the status listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Current state.
    pub state: SessionState,
    /// Tone of the latest status.
    pub tone: StatusTone,
    /// Latest status text.
    pub status: String,
    /// Completion time of the last check, if any.
    pub last_check: Option<DateTime<Local>>,
}

impl SessionSnapshot {
    /// Last check time formatted for display.
    pub fn last_check_display(&self) -> Option<String> {
        self.last_check
            .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
    }

    /// One-line status, with the last check time when known.
    pub fn status_line(&self) -> String {
        match self.last_check_display() {
            Some(ts) => format!("Status: {} (last check {})", self.status, ts),
            None => format!("Status: {}", self.status),
        }
    }
}
