use crate::{
    CommandRunner, CommandSpec, EXIT_LAUNCH_FAILURE, EXIT_TIMEOUT, LogSink, ProcessSupervisor,
};

use std::{
    fs,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use tempfile::TempDir;

fn supervisor(dir: &TempDir) -> ProcessSupervisor {
    ProcessSupervisor::new(LogSink::new(dir.path().join("supervisor.log")))
}

/// True once `pid` has exited (absent or a zombie awaiting its reaper).
fn process_gone(pid: i32) -> bool {
    match fs::read_to_string(format!("/proc/{pid}/stat")) {
        Err(_) => true,
        Ok(stat) => stat
            .rsplit_once(") ")
            .and_then(|(_, rest)| rest.chars().next())
            .is_some_and(|state| state == 'Z'),
    }
}

/// WHAT: Exit code and both output streams are captured
/// WHY: The log shows exactly what the external tool printed
#[test]
#[allow(clippy::unwrap_used)]
fn given_command_with_output_when_run_then_exit_code_and_output_captured() {
    // Given: A command printing to both streams and exiting 3
    let dir = TempDir::new().unwrap();
    let supervisor = supervisor(&dir);
    let spec = CommandSpec::new(["sh", "-c", "echo out; echo err >&2; exit 3"]);

    // When: Running it
    let result = supervisor.run(&spec);

    // Then: Everything is captured and no handle is left behind
    assert_eq!(result.exit_code, 3);
    assert_eq!(result.stdout, "out\n");
    assert_eq!(result.stderr, "err\n");
    assert_eq!(supervisor.active_pgid(), None);
}

/// WHAT: Working directory and environment overrides reach the child
/// WHY: nix commands rely on the repo cwd and an extended NIX_CONFIG
#[test]
#[allow(clippy::unwrap_used)]
fn given_cwd_and_env_when_run_then_child_sees_both() {
    // Given: A spec with a cwd and an env override
    let dir = TempDir::new().unwrap();
    let workdir = dir.path().join("work");
    fs::create_dir_all(&workdir).unwrap();
    let supervisor = supervisor(&dir);
    let spec = CommandSpec::new(["sh", "-c", "pwd; printf %s \"$NIXTRAY_TEST_VALUE\""])
        .current_dir(&workdir)
        .env("NIXTRAY_TEST_VALUE", "test-value");

    // When: Running it
    let result = supervisor.run(&spec);

    // Then: Output shows the cwd and the variable
    assert!(result.is_success());
    let mut lines = result.stdout.lines();
    assert!(lines.next().unwrap().ends_with("/work"));
    assert_eq!(lines.next().unwrap(), "test-value");
}

/// WHAT: A command outliving its timeout is killed along with its children
/// WHY: Hung nix evaluations must not leave orphaned process trees
#[test]
#[allow(clippy::unwrap_used)]
fn given_command_exceeding_timeout_when_run_then_124_and_group_killed() {
    // Given: A shell that backgrounds a long sleep and waits on it
    let dir = TempDir::new().unwrap();
    let supervisor = supervisor(&dir);
    let spec = CommandSpec::new(["sh", "-c", "sleep 30 & echo $! > bg.pid; wait"])
        .current_dir(dir.path())
        .timeout(Duration::from_millis(500));

    // When: Running it
    let started = Instant::now();
    let result = supervisor.run(&spec);

    // Then: Timeout result, bounded duration, handle cleared
    assert_eq!(result.exit_code, EXIT_TIMEOUT);
    assert_eq!(result.stdout, "");
    assert_eq!(result.stderr, "timeout");
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(supervisor.active_pgid(), None);

    // Then: The backgrounded grandchild is gone too
    let bg_pid: i32 = fs::read_to_string(dir.path().join("bg.pid"))
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    let deadline = Instant::now() + Duration::from_secs(3);
    while !process_gone(bg_pid) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(50));
    }
    assert!(process_gone(bg_pid));

    let log = fs::read_to_string(dir.path().join("supervisor.log")).unwrap();
    assert!(log.contains("=== Timeout ("));
    assert!(!log.contains("=== Result ("));
}

/// WHAT: The timeout still applies after the leader exits while a background child holds stdout
/// WHY: A refresh that leaves a helper running must not block the session past its timeout
#[test]
#[allow(clippy::unwrap_used)]
fn given_leader_exits_with_background_child_holding_output_when_run_then_124_within_timeout() {
    // Given: A shell that prints, backgrounds a long sleep and exits at once
    let dir = TempDir::new().unwrap();
    let supervisor = supervisor(&dir);
    let spec = CommandSpec::new(["sh", "-c", "sleep 5 & echo started"])
        .timeout(Duration::from_secs(1));

    // When: Running it
    let started = Instant::now();
    let result = supervisor.run(&spec);

    // Then: Timed out after about the timeout plus the grace period, not the sleep
    assert_eq!(result.exit_code, EXIT_TIMEOUT);
    assert_eq!(result.stderr, "timeout");
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(supervisor.active_pgid(), None);

    let log = fs::read_to_string(dir.path().join("supervisor.log")).unwrap();
    assert!(log.contains("=== Timeout ("));
    assert!(!log.contains("=== Result ("));
}

/// WHAT: A program that cannot be launched yields exit code 999
/// WHY: The supervisor never raises; callers always get a result
#[test]
#[allow(clippy::unwrap_used)]
fn given_missing_program_when_run_then_launch_failure_result() {
    // Given: A spec naming a binary that does not exist
    let dir = TempDir::new().unwrap();
    let supervisor = supervisor(&dir);
    let spec = CommandSpec::new(["/nonexistent/nixtray-binary", "--help"]);

    // When: Running it
    let result = supervisor.run(&spec);

    // Then: Launch failure with the error text as stderr
    assert_eq!(result.exit_code, EXIT_LAUNCH_FAILURE);
    assert_eq!(result.stdout, "");
    assert!(!result.stderr.is_empty());
    assert_eq!(supervisor.active_pgid(), None);

    let log = fs::read_to_string(dir.path().join("supervisor.log")).unwrap();
    assert!(log.contains("=== Exception ("));
}

/// WHAT: An empty argument vector is a launch failure, not a panic
/// WHY: Specs are data and could be built wrong
#[test]
#[allow(clippy::unwrap_used)]
fn given_empty_argv_when_run_then_launch_failure_result() {
    // Given: A spec without a program
    let dir = TempDir::new().unwrap();
    let supervisor = supervisor(&dir);
    let spec = CommandSpec::new(Vec::<String>::new());

    // When: Running it
    let result = supervisor.run(&spec);

    // Then: 999
    assert_eq!(result.exit_code, EXIT_LAUNCH_FAILURE);
}

/// WHAT: kill_active terminates the running command and clears the handle
/// WHY: Shutdown must not leave the rebuild running in the background
#[test]
#[allow(clippy::unwrap_used)]
fn given_running_command_when_kill_active_then_run_returns_and_handle_cleared() {
    // Given: A long sleep running on another thread
    let dir = TempDir::new().unwrap();
    let supervisor = Arc::new(supervisor(&dir));
    let runner = Arc::clone(&supervisor);
    let handle = thread::spawn(move || runner.run(&CommandSpec::new(["sleep", "30"])));

    let deadline = Instant::now() + Duration::from_secs(5);
    while supervisor.active_pgid().is_none() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert!(supervisor.active_pgid().is_some());

    // When: Killing the active group
    supervisor.kill_active();
    let result = handle.join().unwrap();

    // Then: The run ended by signal and nothing is active
    assert!(result.exit_code < 0);
    assert_eq!(supervisor.active_pgid(), None);

    let log = fs::read_to_string(dir.path().join("supervisor.log")).unwrap();
    assert!(log.contains("Killing active process group"));
}

/// WHAT: kill_active with nothing running is a no-op
/// WHY: The shutdown path calls it unconditionally
#[test]
#[allow(clippy::unwrap_used)]
fn given_idle_supervisor_when_kill_active_then_nothing_logged() {
    // Given: An idle supervisor
    let dir = TempDir::new().unwrap();
    let supervisor = supervisor(&dir);

    // When: Killing the active group
    supervisor.kill_active();

    // Then: No handle and no log file
    assert_eq!(supervisor.active_pgid(), None);
    assert!(!dir.path().join("supervisor.log").exists());
}

/// WHAT: Command and result blocks describe the run
/// WHY: The operator log is the only record of what was executed
#[test]
#[allow(clippy::unwrap_used)]
fn given_run_when_finished_then_command_and_result_blocks_logged() {
    // Given: A command with an argument needing quotes
    let dir = TempDir::new().unwrap();
    let supervisor = supervisor(&dir);
    let spec = CommandSpec::new(["sh", "-c", "echo hi   "])
        .current_dir(dir.path())
        .timeout(Duration::from_secs(30));

    // When: Running it
    supervisor.run(&spec);

    // Then: The log shows cwd, escaped command, timeout and output
    let log = fs::read_to_string(dir.path().join("supervisor.log")).unwrap();
    assert!(log.contains(&format!("cwd: {}", dir.path().display())));
    assert!(log.contains("cmd: sh -c 'echo hi   '"));
    assert!(log.contains("timeout: 30"));
    assert!(log.contains("exit_code: 0"));
    assert!(log.contains("stdout:\nhi\n"));
}
