use crate::SessionSnapshot;

use std::path::Path;

/// Urgency of a desktop notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Progress chatter.
    Low,
    /// Regular results.
    Normal,
    /// Failures that need the operator's attention.
    Critical,
}

/// Shows desktop notifications. Fire-and-forget: implementations must
/// swallow their own failures.
pub trait Notifier: Send + Sync {
    /// Show `body` under `title`.
    fn notify(&self, title: &str, body: &str, severity: Severity);
}

/// Opens a file or folder with the desktop's default handler, best-effort.
pub trait PathOpener: Send + Sync {
    /// Open `path`.
    fn open_path(&self, path: &Path);
}

/// Receives every status change of an update session.
pub trait StatusListener: Send + Sync {
    /// Called after the session state or status text changed.
    fn status_changed(&self, snapshot: &SessionSnapshot);
}
