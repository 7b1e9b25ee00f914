use crate::{AppCommand, AppError, AppResult, MenuIds, TrayCommand};

use std::{panic::Location, path::PathBuf, sync::Arc, time::Duration};

use error_location::ErrorLocation;
use nixtray_core::{
    APP_NAME, ApplyOutcome, CheckOutcome, CheckThenApplyOutcome, Notifier, PathOpener, Severity,
    UpdateSession,
};
use tao::event_loop::EventLoopProxy;
use tokio::{
    signal::unix::{SignalKind, signal},
    sync::{mpsc, watch},
};
use tracing::{error, info, instrument, warn};
use tray_icon::menu::MenuEvent;
use uuid::Uuid;

/// Main application state.
///
/// Runs on the async runtime thread. Session operations block until their
/// external commands finish, so they run on the blocking pool; tray
/// updates reach the main thread through `tray_proxy` because `TrayIcon`
/// is `!Send` and must remain on the UI thread.
pub struct App {
    pub(crate) session: Arc<UpdateSession>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) opener: Arc<dyn PathOpener>,
    pub(crate) repo: PathBuf,
    pub(crate) tray_proxy: EventLoopProxy<TrayCommand>,
    pub(crate) command_tx: mpsc::Sender<AppCommand>,
    pub(crate) command_rx: mpsc::Receiver<AppCommand>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
    pub(crate) menu_ids: MenuIds,
}

impl App {
    /// Run the main application event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("nixtray starting");

        // MenuEvent::receiver() is a blocking crossbeam receiver, so a single
        // blocking task forwards events. It stops once tray_event_rx is dropped
        // and the next event fails to send.
        let (tray_event_tx, mut tray_event_rx) = mpsc::channel(32);
        let tray_handle = tokio::task::spawn_blocking(move || {
            let receiver = MenuEvent::receiver();
            while let Ok(event) = receiver.recv() {
                if tray_event_tx.blocking_send(event).is_err() {
                    break;
                }
            }
        });

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        loop {
            tokio::select! {
                Some(event) = tray_event_rx.recv() => {
                    if let Err(e) = self.handle_tray_event(event).await {
                        error!(error = ?e, "Failed to handle tray event");
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        AppCommand::Check { operation_id } => self.spawn_check(operation_id),
                        AppCommand::SyncApply { operation_id } => self.spawn_sync_apply(operation_id),
                        AppCommand::CheckThenSyncApply { operation_id } => {
                            self.spawn_check_then_sync_apply(operation_id);
                        }
                        AppCommand::Shutdown => {
                            info!("Shutdown requested");
                            self.shutdown("Quit requested").await;
                            break;
                        }
                    }
                }

                _ = sigterm.recv() => {
                    info!("SIGTERM received");
                    self.shutdown("SIGTERM received").await;
                    break;
                }

                _ = sigint.recv() => {
                    info!("SIGINT received");
                    self.shutdown("SIGINT received").await;
                    break;
                }

                else => {
                    info!("All channels closed, shutting down");
                    break;
                }
            }
        }

        drop(tray_event_rx);

        match tokio::time::timeout(Duration::from_secs(1), tray_handle).await {
            Ok(Ok(())) => info!("Tray event forwarder stopped cleanly"),
            Ok(Err(e)) => error!(error = ?e, "Tray event forwarder task panicked"),
            Err(_) => info!(
                "Tray event forwarder did not stop within timeout, \
                     will be cleaned up on exit"
            ),
        }

        info!("nixtray shut down successfully");

        Ok(())
    }

    /// Kill any running command group, stop the scheduler and close the tray.
    #[instrument(skip(self))]
    async fn shutdown(&self, reason: &'static str) {
        let session = Arc::clone(&self.session);
        if let Err(e) = tokio::task::spawn_blocking(move || session.shutdown(reason)).await {
            error!(error = ?e, "Session shutdown task panicked");
        }

        let _ = self.shutdown_tx.send(true);

        if self.tray_proxy.send_event(TrayCommand::Shutdown).is_err() {
            warn!("Event loop already closed");
        }
    }

    fn spawn_check(&self, operation_id: Uuid) {
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = settle_check(session.check()) {
                error!(%operation_id, error = %e, "Check failed");
            }
        });
    }

    fn spawn_sync_apply(&self, operation_id: Uuid) {
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = settle_sync_apply(session.sync_apply()) {
                error!(%operation_id, error = %e, "Sync + apply failed");
            }
        });
    }

    fn spawn_check_then_sync_apply(&self, operation_id: Uuid) {
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = settle_check_then_sync_apply(session.check_then_sync_apply()) {
                error!(%operation_id, error = %e, "Check then apply failed");
            }
        });
    }

    /// Handle tray menu events.
    #[instrument(skip(self))]
    async fn handle_tray_event(&mut self, event: MenuEvent) -> AppResult<()> {
        let event_id = &event.id;
        let ids = &self.menu_ids;

        let command = if *event_id == ids.check {
            AppCommand::check()
        } else if *event_id == ids.sync_apply {
            AppCommand::sync_apply()
        } else if *event_id == ids.check_then_sync_apply {
            AppCommand::check_then_sync_apply()
        } else if *event_id == ids.quit {
            info!("Quit requested from tray menu");
            AppCommand::Shutdown
        } else {
            if *event_id == ids.open_repo {
                self.open_in_background(self.repo.clone());
            } else if *event_id == ids.open_log {
                self.open_in_background(self.session.log().path().to_path_buf());
            } else if *event_id == ids.about {
                let notifier = Arc::clone(&self.notifier);
                let about = self.session.about_text();
                tokio::task::spawn_blocking(move || {
                    notifier.notify(APP_NAME, &about, Severity::Normal);
                });
            }
            return Ok(());
        };

        self.command_tx
            .send(command)
            .await
            .map_err(|e| AppError::ChannelSendFailed {
                message: format!("Failed to queue menu command: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    fn open_in_background(&self, path: PathBuf) {
        let opener = Arc::clone(&self.opener);
        tokio::task::spawn_blocking(move || opener.open_path(&path));
    }
}

/// Log a finished check and surface its failure as an `AppError`.
pub(crate) fn settle_check(outcome: CheckOutcome) -> AppResult<()> {
    match outcome {
        CheckOutcome::AlreadyRunning => info!("Check skipped, session busy"),
        CheckOutcome::NoUpdates => info!("Check finished, no updates"),
        CheckOutcome::UpdatesAvailable(changes) => {
            info!(changed = changes.len(), "Check finished, updates available");
        }
        CheckOutcome::Failed(e) => return Err(e.into()),
    }
    Ok(())
}

pub(crate) fn settle_sync_apply(outcome: ApplyOutcome) -> AppResult<()> {
    match outcome {
        ApplyOutcome::AlreadyRunning => info!("Sync + apply skipped, session busy"),
        ApplyOutcome::Applied => info!("Sync + apply finished"),
        ApplyOutcome::Failed(e) => return Err(e.into()),
    }
    Ok(())
}

/// A failed check and a failed apply both surface as `AppError::Core`; the
/// phase is recorded in the log line.
pub(crate) fn settle_check_then_sync_apply(outcome: CheckThenApplyOutcome) -> AppResult<()> {
    match outcome {
        CheckThenApplyOutcome::AlreadyRunning => {
            info!("Check then apply skipped, session busy");
        }
        CheckThenApplyOutcome::NoUpdates => {
            info!("Check then apply finished, nothing to apply");
        }
        CheckThenApplyOutcome::Applied(changes) => {
            info!(changed = changes.len(), "Check then apply finished");
        }
        CheckThenApplyOutcome::CheckFailed(e) => {
            warn!("Check then apply stopped in the check phase");
            return Err(e.into());
        }
        CheckThenApplyOutcome::ApplyFailed(e) => {
            warn!("Check then apply stopped in the apply phase");
            return Err(e.into());
        }
    }
    Ok(())
}
