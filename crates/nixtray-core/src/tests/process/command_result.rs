use crate::{CommandResult, CommandSpec, CoreError, EXIT_LAUNCH_FAILURE, EXIT_TIMEOUT};

use std::time::Duration;

fn result(exit_code: i32, stderr: &str) -> CommandResult {
    CommandResult {
        exit_code,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

/// WHAT: Reserved exit codes map to their dedicated error kinds
/// WHY: The session reports timeouts and launch failures differently
#[test]
fn given_reserved_exit_codes_when_classified_then_dedicated_errors() {
    // Given: A spec with a timeout
    let spec = CommandSpec::new(["nix", "flake", "lock"]).timeout(Duration::from_secs(600));

    // When: Classifying the reserved codes and an ordinary failure
    let timeout = result(EXIT_TIMEOUT, "timeout").into_result(&spec);
    let launch = result(EXIT_LAUNCH_FAILURE, "No such file").into_result(&spec);
    let failure = result(1, "error: flake not found").into_result(&spec);

    // Then: Each maps to its own variant
    assert!(matches!(
        timeout,
        Err(CoreError::CommandTimeout {
            timeout_secs: 600,
            ..
        })
    ));
    assert!(matches!(
        launch,
        Err(CoreError::LaunchException { ref reason, .. }) if reason == "No such file"
    ));
    assert!(matches!(
        failure,
        Err(CoreError::CommandFailure { exit_code: 1, .. })
    ));
}

/// WHAT: Exit code 0 passes the result through
/// WHY: Callers keep access to captured output on success
#[test]
fn given_zero_exit_when_classified_then_ok() {
    // Given: A successful result
    let spec = CommandSpec::new(["true"]);
    let ok = CommandResult {
        exit_code: 0,
        stdout: "done\n".to_string(),
        stderr: String::new(),
    };

    // When: Classifying it
    let classified = ok.clone().into_result(&spec);

    // Then: The same result comes back
    assert!(ok.is_success());
    assert!(matches!(classified, Ok(ref r) if *r == ok));
}
