//! nixtray Core Library
//!
//! Detects and applies Nix flake input updates for one host configuration:
//! a process-group supervisor for the external nix tooling, a lock-file
//! differ that probes for updates without touching the committed
//! `flake.lock`, and a single-flight session state machine tying them
//! together.
//!
//! # Example
//!
//! ```no_run
//! use nixtray_core::{
//!     CheckOutcome, Collaborators, CommandCatalog, LogSink, ProcessSupervisor,
//!     SessionSettings, ToolPaths, UpdateSession,
//! };
//! # use nixtray_core::{Notifier, PathOpener, SessionSnapshot, Severity, StatusListener};
//! # use std::path::Path;
//! # struct Quiet;
//! # impl Notifier for Quiet { fn notify(&self, _: &str, _: &str, _: Severity) {} }
//! # impl PathOpener for Quiet { fn open_path(&self, _: &Path) {} }
//! # impl StatusListener for Quiet { fn status_changed(&self, _: &SessionSnapshot) {} }
//!
//! use std::sync::Arc;
//!
//! let log = LogSink::new("/tmp/nixtray.log");
//! let catalog = CommandCatalog::new("/etc/nixos", "myhost", ToolPaths::default(), None);
//! let quiet = Arc::new(Quiet);
//! let session = UpdateSession::new(
//!     catalog,
//!     SessionSettings::new("/tmp/nixtray-cache"),
//!     Arc::new(ProcessSupervisor::new(log.clone())),
//!     log,
//!     Collaborators {
//!         notifier: quiet.clone(),
//!         opener: quiet.clone(),
//!         listener: quiet,
//!     },
//! );
//!
//! if let CheckOutcome::UpdatesAvailable(changes) = session.check() {
//!     println!("{}", changes.summary(10));
//! }
//! ```

mod catalog;
mod error;
mod lockfile;
mod logging;
mod process;
mod session;

pub use {
    catalog::{CommandCatalog, CommandTemplate, Substitution, ToolPaths},
    error::{CoreError, Result as CoreResult},
    lockfile::{
        ChangeEntry, ChangeSet, LockDocument, LockNode, LockedAttrs, REV_DISPLAY_LEN, describe,
        diff, diff_documents,
    },
    logging::LogSink,
    process::{
        CommandResult, CommandRunner, CommandSpec, EXIT_LAUNCH_FAILURE, EXIT_TIMEOUT,
        ProcessSupervisor, TERMINATION_GRACE,
    },
    session::{
        APP_NAME, ApplyOutcome, CANDIDATE_FILE_NAME, CandidateRetention, CheckOutcome,
        CheckThenApplyOutcome, Collaborators, Notifier, PathOpener, SessionSettings,
        SessionSnapshot, SessionState, Severity, StatusListener, StatusTone, UpdateSession,
    },
};
