use std::path::PathBuf;

use error_location::ErrorLocation;
use thiserror::Error;

/// Update pipeline errors with source location tracking.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A file the pipeline depends on does not exist.
    #[error("Missing file: {path:?} {location}")]
    MissingFile {
        /// Path that was expected to exist.
        path: PathBuf,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// An external command exceeded its timeout and was killed.
    #[error("Command timed out after {timeout_secs}s: {command} {location}")]
    CommandTimeout {
        /// Shell-escaped command line.
        command: String,
        /// Timeout that elapsed, in seconds.
        timeout_secs: u64,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// An external command exited with a non-zero status.
    #[error("Command failed with exit code {exit_code}: {command} {location}")]
    CommandFailure {
        /// Shell-escaped command line.
        command: String,
        /// Exit code reported by the supervisor.
        exit_code: i32,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// An external command could not be started or communicated with.
    #[error("Command could not run: {command}: {reason} {location}")]
    LaunchException {
        /// Shell-escaped command line.
        command: String,
        /// Stringified launch failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A lock document is unreadable, not JSON, or has no node table.
    #[error("Could not parse lock file {path:?}: {reason} {location}")]
    ParseError {
        /// Path of the offending lock file.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// An external tool reported success but its promised artifact is absent.
    #[error("BUG: {reason} {location}")]
    BugInvariantViolation {
        /// Description of the broken promise.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Filesystem operation on a path the pipeline owns failed.
    #[error("IO error: {source} {location}")]
    Io {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl From<std::io::Error> for CoreError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        CoreError::Io {
            source,
            location: ErrorLocation::from(std::panic::Location::caller()),
        }
    }
}

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
