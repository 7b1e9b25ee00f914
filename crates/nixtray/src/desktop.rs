//! Desktop-side collaborators handed to the update session.

use crate::TrayCommand;

use std::{path::Path, sync::Mutex};

use nixtray_core::{Notifier, PathOpener, SessionSnapshot, Severity, StatusListener};
use notify_rust::{Notification, Urgency};
use tao::event_loop::EventLoopProxy;
use tracing::{debug, warn};

/// Desktop notifications through the freedesktop notification service.
pub struct DesktopNotifier;

impl DesktopNotifier {
    pub(crate) fn urgency(severity: Severity) -> Urgency {
        match severity {
            Severity::Low => Urgency::Low,
            Severity::Normal => Urgency::Normal,
            Severity::Critical => Urgency::Critical,
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str, severity: Severity) {
        let result = Notification::new()
            .summary(title)
            .body(body)
            .urgency(Self::urgency(severity))
            .show();

        if let Err(e) = result {
            warn!(error = ?e, body, "Failed to show notification");
        }
    }
}

/// Opens files and folders with the desktop's default handler.
pub struct DesktopOpener;

impl PathOpener for DesktopOpener {
    fn open_path(&self, path: &Path) {
        match open::that(path) {
            Ok(()) => debug!(path = ?path, "Opened path"),
            Err(e) => warn!(path = ?path, error = ?e, "Failed to open path"),
        }
    }
}

/// Forwards session snapshots to the tray on the main thread.
///
/// `TrayIcon` is `!Send`, so every tray mutation travels as a
/// [`TrayCommand`] through the event loop proxy.
pub struct TrayStatusForwarder {
    proxy: Mutex<EventLoopProxy<TrayCommand>>,
}

impl TrayStatusForwarder {
    /// Wrap the event loop proxy.
    pub fn new(proxy: EventLoopProxy<TrayCommand>) -> Self {
        Self {
            proxy: Mutex::new(proxy),
        }
    }
}

impl StatusListener for TrayStatusForwarder {
    fn status_changed(&self, snapshot: &SessionSnapshot) {
        let proxy = self.proxy.lock().unwrap_or_else(|e| e.into_inner());
        if proxy
            .send_event(TrayCommand::Refresh(snapshot.clone()))
            .is_err()
        {
            debug!("Event loop closed, dropping tray refresh");
        }
    }
}
