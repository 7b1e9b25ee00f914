//! Single-flight state machine driving check, sync and apply.
//!
//! Operations block the calling thread until every external command they
//! run has finished. An RAII [`OperationGuard`] owns the non-idle state
//! for the duration of an operation, so a second caller (scheduled or
//! manual) is turned away without touching any state, and every exit
//! path returns the session to [`SessionState::Idle`].

use crate::{
    CoreError, CoreResult, LogSink,
    catalog::CommandCatalog,
    lockfile::{self, ChangeSet},
    process::{CommandRunner, CommandSpec},
    session::{
        ApplyOutcome, CandidateRetention, CheckOutcome, CheckThenApplyOutcome, Notifier,
        PathOpener, SessionSettings, SessionSnapshot, SessionState, Severity, StatusListener,
        StatusTone,
    },
};

use std::{
    fs,
    panic::Location,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, Local, Utc};
use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument, warn};

/// Title used for every notification.
pub const APP_NAME: &str = "NixOS Update Tray";

/// Side-effecting collaborators the session reports through.
#[derive(Clone)]
pub struct Collaborators {
    /// Desktop notifications.
    pub notifier: Arc<dyn Notifier>,
    /// Opens the log for the operator after failures.
    pub opener: Arc<dyn PathOpener>,
    /// Receives status snapshots (tray icon, tooltip, menu state).
    pub listener: Arc<dyn StatusListener>,
}

struct SessionInner {
    state: SessionState,
    tone: StatusTone,
    status: String,
    last_check: Option<DateTime<Local>>,
}

/// Coordinates the update pipeline for one flake repository and host.
pub struct UpdateSession {
    catalog: CommandCatalog,
    settings: SessionSettings,
    runner: Arc<dyn CommandRunner>,
    log: LogSink,
    collaborators: Collaborators,
    inner: Mutex<SessionInner>,
}

/// Holds the session out of `Idle` until dropped.
struct OperationGuard<'a> {
    session: &'a UpdateSession,
}

impl OperationGuard<'_> {
    fn advance(&self, state: SessionState) {
        self.session.lock_inner().state = state;
        debug!(%state, "Session state advanced");
        self.session.publish();
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.session.lock_inner().state = SessionState::Idle;
        self.session.publish();
    }
}

impl UpdateSession {
    /// Create an idle session.
    pub fn new(
        catalog: CommandCatalog,
        settings: SessionSettings,
        runner: Arc<dyn CommandRunner>,
        log: LogSink,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            catalog,
            settings,
            runner,
            log,
            collaborators,
            inner: Mutex::new(SessionInner {
                state: SessionState::Idle,
                tone: StatusTone::Ready,
                status: "Ready".to_string(),
                last_check: None,
            }),
        }
    }

    /// Current state, status and last check time.
    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock_inner();
        SessionSnapshot {
            state: inner.state,
            tone: inner.tone,
            status: inner.status.clone(),
            last_check: inner.last_check,
        }
    }

    /// Whether an operation is in flight.
    pub fn is_busy(&self) -> bool {
        self.lock_inner().state.is_busy()
    }

    /// Operator log shared with the supervisor.
    pub fn log(&self) -> &LogSink {
        &self.log
    }

    /// Look for flake input updates without touching the reference lock file.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn check(&self) -> CheckOutcome {
        let Some(_guard) = self.begin(SessionState::Checking) else {
            self.reject_busy();
            return CheckOutcome::AlreadyRunning;
        };

        match self.check_locked() {
            Ok(changes) if changes.is_empty() => CheckOutcome::NoUpdates,
            Ok(changes) => CheckOutcome::UpdatesAvailable(changes),
            Err(e) => CheckOutcome::Failed(e),
        }
    }

    /// Sync the repository, then rebuild and switch the host.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn sync_apply(&self) -> ApplyOutcome {
        let Some(guard) = self.begin(SessionState::Syncing) else {
            self.reject_busy();
            return ApplyOutcome::AlreadyRunning;
        };

        match self.sync_apply_locked(&guard) {
            Ok(()) => ApplyOutcome::Applied,
            Err(e) => ApplyOutcome::Failed(e),
        }
    }

    /// Check, and sync + apply only when updates were found.
    ///
    /// The single-flight guard is held across both phases.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn check_then_sync_apply(&self) -> CheckThenApplyOutcome {
        let Some(guard) = self.begin(SessionState::Checking) else {
            self.reject_busy();
            return CheckThenApplyOutcome::AlreadyRunning;
        };

        let changes = match self.check_locked() {
            Ok(changes) => changes,
            Err(e) => return CheckThenApplyOutcome::CheckFailed(e),
        };

        if changes.is_empty() {
            info!("No updates found, skipping sync + apply");
            self.notify("No updates, not applying.", Severity::Normal);
            return CheckThenApplyOutcome::NoUpdates;
        }

        guard.advance(SessionState::Syncing);
        match self.sync_apply_locked(&guard) {
            Ok(()) => CheckThenApplyOutcome::Applied(changes),
            Err(e) => CheckThenApplyOutcome::ApplyFailed(e),
        }
    }

    /// Kill any running command group. The state machine is not rolled back.
    #[instrument(skip(self))]
    pub fn shutdown(&self, reason: &str) {
        self.log.block("Signal", &[reason]);
        info!(reason, "Session shutting down");
        self.runner.kill_active();
    }

    /// Effective configuration, for an "About" notification.
    pub fn about_text(&self) -> String {
        format!(
            "{}\n\nRepo: {}\nHost: {}\nLog: {}\nCache: {}\nRetention: {}",
            APP_NAME,
            self.catalog.repo().display(),
            self.catalog.host(),
            self.log.path().display(),
            self.settings.cache_dir.display(),
            self.settings.retention,
        )
    }

    #[track_caller]
    fn check_locked(&self) -> CoreResult<ChangeSet> {
        self.set_status(StatusTone::Busy, "Checking updates...");
        self.notify("Checking for updates...", Severity::Low);

        let result = self.probe_updates();
        self.lock_inner().last_check = Some(Local::now());

        match result {
            Ok(changes) if changes.is_empty() => {
                info!("No updates available");
                self.set_status(StatusTone::Ready, "No updates available");
                self.notify("No updates available", Severity::Normal);
                Ok(changes)
            }
            Ok(changes) => {
                info!(changed = changes.len(), "Updates available");
                self.set_status(StatusTone::UpdatesAvailable, "Updates available");
                self.notify(
                    &changes.summary(self.settings.summary_limit),
                    Severity::Normal,
                );
                Ok(changes)
            }
            Err(e) => {
                let status = match &e {
                    CoreError::MissingFile { .. } => "Missing flake.lock",
                    CoreError::CommandTimeout { .. } => "Update check timed out",
                    CoreError::BugInvariantViolation { .. } => {
                        "Update check bug: lock file missing"
                    }
                    CoreError::ParseError { .. } => "Could not parse flake lock files",
                    _ => "Update check failed",
                };
                self.report_failure(status, &e);
                Err(e)
            }
        }
    }

    /// Produce a candidate lock file and diff it against the reference.
    #[track_caller]
    fn probe_updates(&self) -> CoreResult<ChangeSet> {
        let reference = self.catalog.reference_lock();
        if !reference.exists() {
            self.log
                .block("Error", &[format!("Missing {}", reference.display())]);
            return Err(CoreError::MissingFile {
                path: reference,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        fs::create_dir_all(&self.settings.cache_dir)?;

        let candidate = self.settings.candidate_path();
        if candidate.exists() {
            self.remove_candidate(&candidate, "Could not remove old lock file");
        }

        self.log.block(
            "Check Updates Paths",
            &[
                format!("flake_lock: {}", reference.display()),
                format!("new_lock: {}", candidate.display()),
                format!("retention: {}", self.settings.retention),
                format!("exists_before: {}", candidate.exists()),
            ],
        );

        let spec = self.catalog.lock_refresh(&candidate);
        if let Err(e) = self.run_step(&spec) {
            self.remove_candidate(&candidate, "Could not remove candidate lock file");
            return Err(e);
        }

        if !candidate.exists() {
            self.log.block(
                "BUG",
                &[
                    "nix flake lock returned 0 but lock file does not exist.".to_string(),
                    format!("expected: {}", candidate.display()),
                    format!("cwd: {}", self.catalog.repo().display()),
                    format!("TMPDIR: {}", std::env::var("TMPDIR").unwrap_or_default()),
                ],
            );
            error!(candidate = ?candidate, "Lock refresh succeeded without writing its output");
            return Err(CoreError::BugInvariantViolation {
                reason: format!(
                    "lock refresh exited 0 but {} does not exist",
                    candidate.display()
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.settings.retention == CandidateRetention::Archive {
            self.archive_candidate(&candidate);
        }

        let changes = match lockfile::diff(&reference, &candidate) {
            Ok((_, changes)) => changes,
            Err(e) => {
                self.log.block("Error", &[e.to_string()]);
                self.remove_candidate(&candidate, "Could not remove candidate lock file");
                return Err(e);
            }
        };

        let mut lines = vec![
            format!("old: {}", reference.display()),
            format!("new: {}", candidate.display()),
            format!("changed: {}", changes.len()),
        ];
        lines.extend(changes.lines());
        self.log.block("Comparison", &lines);

        if changes.is_empty() && self.settings.retention == CandidateRetention::Delete {
            self.remove_candidate(&candidate, "Could not remove candidate lock file");
        }

        Ok(changes)
    }

    #[track_caller]
    fn sync_apply_locked(&self, guard: &OperationGuard<'_>) -> CoreResult<()> {
        self.set_status(StatusTone::Busy, "Syncing + applying...");
        self.notify("Running Sync + Apply...", Severity::Low);

        let script = self.catalog.sync_script();
        if !script.exists() {
            self.log
                .block("Error", &[format!("Missing {}", script.display())]);
            let e = CoreError::MissingFile {
                path: script,
                location: ErrorLocation::from(Location::caller()),
            };
            self.report_failure("Missing scripts/git-sync.sh", &e);
            return Err(e);
        }

        if let Err(e) = self.run_step(&self.catalog.sync()) {
            self.report_failure("Git sync failed", &e);
            return Err(e);
        }

        guard.advance(SessionState::Applying);
        self.set_status(StatusTone::Busy, "Applying configuration...");

        if let Err(e) = self.run_step(&self.catalog.apply()) {
            self.report_failure("Apply failed", &e);
            return Err(e);
        }

        let mut message = "Sync + Apply: success";
        if let Some(keep) = self.settings.gc_keep_generations {
            if let Err(e) = self.run_step(&self.catalog.garbage_collect(keep)) {
                self.log.block(
                    "Warning",
                    &[format!("Garbage collection failed: {}", e)],
                );
                warn!(error = %e, "Garbage collection failed after apply");
                message = "Sync + Apply: success (garbage collection failed)";
            }
        }

        info!("Sync + Apply succeeded");
        self.set_status(StatusTone::Ready, message);
        self.notify(message, Severity::Normal);

        Ok(())
    }

    #[track_caller]
    fn run_step(&self, spec: &CommandSpec) -> CoreResult<()> {
        self.runner.run(spec).into_result(spec).map(|_| ())
    }

    fn begin(&self, state: SessionState) -> Option<OperationGuard<'_>> {
        {
            let mut inner = self.lock_inner();
            if inner.state.is_busy() {
                return None;
            }
            inner.state = state;
        }
        debug!(%state, "Session operation started");
        self.publish();
        Some(OperationGuard { session: self })
    }

    fn reject_busy(&self) {
        let state = self.lock_inner().state;
        info!(%state, "Operation rejected, session busy");
        self.notify("Already running, try again in a bit.", Severity::Normal);
    }

    fn report_failure(&self, status: &str, e: &CoreError) {
        error!(status, error = %e, "Session operation failed");
        self.log.block("Failure", &[status.to_string(), e.to_string()]);
        self.set_status(StatusTone::Failed, status);
        self.notify(&format!("{status}. Opening log."), Severity::Critical);
        self.collaborators.opener.open_path(self.log.path());
    }

    fn remove_candidate(&self, candidate: &Path, context: &str) {
        if let Err(e) = fs::remove_file(candidate) {
            if e.kind() != std::io::ErrorKind::NotFound {
                self.log.block(
                    "Warning",
                    &[
                        format!("{context}: {}", candidate.display()),
                        format!("{e:?}"),
                    ],
                );
            }
        }
    }

    fn archive_candidate(&self, candidate: &Path) {
        let archive = self.settings.archive_path(Utc::now().timestamp());
        match fs::copy(candidate, &archive) {
            Ok(_) => self
                .log
                .block("Debug", &[format!("Archived lock to {}", archive.display())]),
            Err(e) => self
                .log
                .block("Debug", &[format!("Failed to archive lock: {e:?}")]),
        }
    }

    fn set_status(&self, tone: StatusTone, status: &str) {
        {
            let mut inner = self.lock_inner();
            inner.tone = tone;
            inner.status = status.to_string();
        }
        self.publish();
    }

    fn notify(&self, body: &str, severity: Severity) {
        self.collaborators.notifier.notify(APP_NAME, body, severity);
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.collaborators.listener.status_changed(&snapshot);
    }

    fn lock_inner(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
