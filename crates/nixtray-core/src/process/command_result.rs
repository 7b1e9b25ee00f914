use crate::{CoreError, CoreResult, process::CommandSpec};

use std::panic::Location;

use error_location::ErrorLocation;

/// Exit code reported when a command exceeded its timeout.
pub const EXIT_TIMEOUT: i32 = 124;

/// Exit code reported when a command could not be launched or read.
pub const EXIT_LAUNCH_FAILURE: i32 = 999;

/// Outcome of one supervised run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit code; `-N` when the child died from signal `N`.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandResult {
    pub(crate) fn timed_out() -> Self {
        Self {
            exit_code: EXIT_TIMEOUT,
            stdout: String::new(),
            stderr: "timeout".to_string(),
        }
    }

    pub(crate) fn launch_failure(reason: String) -> Self {
        Self {
            exit_code: EXIT_LAUNCH_FAILURE,
            stdout: String::new(),
            stderr: reason,
        }
    }

    /// Whether the command exited with status 0.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Classify a non-zero exit into the error taxonomy.
    #[track_caller]
    pub fn into_result(self, spec: &CommandSpec) -> CoreResult<Self> {
        let location = ErrorLocation::from(Location::caller());
        match self.exit_code {
            0 => Ok(self),
            EXIT_TIMEOUT => Err(CoreError::CommandTimeout {
                command: spec.display(),
                timeout_secs: spec.timeout_value().map(|t| t.as_secs()).unwrap_or(0),
                location,
            }),
            EXIT_LAUNCH_FAILURE => Err(CoreError::LaunchException {
                command: spec.display(),
                reason: self.stderr,
                location,
            }),
            exit_code => Err(CoreError::CommandFailure {
                command: spec.display(),
                exit_code,
                location,
            }),
        }
    }
}
