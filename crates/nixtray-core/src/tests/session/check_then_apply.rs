use crate::{
    CandidateRetention, CheckThenApplyOutcome, CoreError, SessionState,
    tests::support::{LockRefreshScript, ScriptedRunner, TestRepo, lock_json},
};

use std::{sync::Arc, thread};

/// WHAT: Without updates nothing is synced or applied
/// WHY: Rebuilding an unchanged configuration wastes minutes of CPU
#[test]
fn given_no_updates_when_check_then_sync_apply_then_only_lock_refresh_runs() {
    // Given: An identical candidate
    let lock = lock_json(&[("nixpkgs", "aaaa")]);
    let repo = TestRepo::with_lock(&lock).with_sync_script();
    let runner = Arc::new(ScriptedRunner::new(LockRefreshScript::Write(lock)));
    let (session, recorder) = repo.session(runner.clone(), CandidateRetention::Keep);

    // When: Running the combined operation
    let outcome = session.check_then_sync_apply();

    // Then: Only the check ran
    assert!(matches!(outcome, CheckThenApplyOutcome::NoUpdates));
    assert_eq!(runner.kinds(), vec!["lock-refresh"]);
    assert!(
        recorder
            .bodies()
            .contains(&"No updates, not applying.".to_string())
    );
    assert_eq!(session.snapshot().state, SessionState::Idle);
}

/// WHAT: Found updates are synced and applied in one operation
/// WHY: Unattended runs should not need a second click
#[test]
#[allow(clippy::panic)]
fn given_updates_when_check_then_sync_apply_then_full_pipeline_runs() {
    // Given: A newer candidate
    let repo = TestRepo::with_lock(&lock_json(&[("nixpkgs", "aaaa")])).with_sync_script();
    let runner = Arc::new(ScriptedRunner::new(LockRefreshScript::Write(lock_json(&[
        ("nixpkgs", "bbbb"),
    ]))));
    let (session, _recorder) = repo.session(runner.clone(), CandidateRetention::Keep);

    // When: Running the combined operation
    let outcome = session.check_then_sync_apply();

    // Then: lock-refresh, sync, apply in order and the changes are returned
    let CheckThenApplyOutcome::Applied(changes) = outcome else {
        panic!("expected applied, got {outcome:?}");
    };
    assert_eq!(changes.len(), 1);
    assert_eq!(runner.kinds(), vec!["lock-refresh", "sync", "apply"]);
    assert_eq!(session.snapshot().status, "Sync + Apply: success");
}

/// WHAT: A failed check stops the operation before sync
/// WHY: Nothing is known about available updates after a failed check
#[test]
fn given_failing_check_when_check_then_sync_apply_then_nothing_applied() {
    // Given: A lock refresh exiting 1
    let repo = TestRepo::with_lock(&lock_json(&[("nixpkgs", "aaaa")])).with_sync_script();
    let runner = Arc::new(ScriptedRunner::new(LockRefreshScript::Exit(1)));
    let (session, _recorder) = repo.session(runner.clone(), CandidateRetention::Keep);

    // When: Running the combined operation
    let outcome = session.check_then_sync_apply();

    // Then: CheckFailed and only the refresh ran
    assert!(matches!(
        outcome,
        CheckThenApplyOutcome::CheckFailed(CoreError::CommandFailure { .. })
    ));
    assert_eq!(runner.kinds(), vec!["lock-refresh"]);
}

/// WHAT: An apply failure after a successful check is reported as such
/// WHY: The operator must know the updates exist but were not deployed
#[test]
fn given_updates_and_failing_apply_when_check_then_sync_apply_then_apply_failed() {
    // Given: A newer candidate and an apply exiting 1
    let repo = TestRepo::with_lock(&lock_json(&[("nixpkgs", "aaaa")])).with_sync_script();
    let runner = Arc::new(
        ScriptedRunner::new(LockRefreshScript::Write(lock_json(&[("nixpkgs", "bbbb")])))
            .apply_exit(1),
    );
    let (session, _recorder) = repo.session(runner, CandidateRetention::Keep);

    // When: Running the combined operation
    let outcome = session.check_then_sync_apply();

    // Then: ApplyFailed
    assert!(matches!(outcome, CheckThenApplyOutcome::ApplyFailed(_)));
    assert_eq!(session.snapshot().status, "Apply failed");
}

/// WHAT: The session stays busy between the check and the apply
/// WHY: A scheduled check must not slip in between the two phases
#[test]
fn given_updates_when_check_then_sync_apply_then_never_idle_between_phases() {
    // Given: A newer candidate
    let repo = TestRepo::with_lock(&lock_json(&[("nixpkgs", "aaaa")])).with_sync_script();
    let runner = Arc::new(ScriptedRunner::new(LockRefreshScript::Write(lock_json(&[
        ("nixpkgs", "bbbb"),
    ]))));
    let (session, recorder) = repo.session(runner, CandidateRetention::Keep);

    // When: Running the combined operation
    session.check_then_sync_apply();

    // Then: Checking, Syncing, Applying, then Idle exactly once at the end
    let mut states = Vec::new();
    for snapshot in recorder.snapshots() {
        if states.last() != Some(&snapshot.state) {
            states.push(snapshot.state);
        }
    }
    assert_eq!(
        states,
        vec![
            SessionState::Checking,
            SessionState::Syncing,
            SessionState::Applying,
            SessionState::Idle
        ]
    );
}

/// WHAT: A sync + apply request during the combined operation is rejected
/// WHY: Only one pipeline may touch the repository at a time
#[test]
#[allow(clippy::unwrap_used)]
fn given_running_pipeline_when_sync_apply_requested_then_already_running() {
    // Given: A combined operation blocked in its lock refresh
    let lock = lock_json(&[("nixpkgs", "aaaa")]);
    let repo = TestRepo::with_lock(&lock).with_sync_script();
    let (runner, started, release) =
        ScriptedRunner::new(LockRefreshScript::Write(lock)).gated();
    let runner = Arc::new(runner);
    let (session, _recorder) = repo.session(runner.clone(), CandidateRetention::Keep);

    thread::scope(|scope| {
        let first = scope.spawn(|| session.check_then_sync_apply());
        started.recv().unwrap();

        // When: Requesting sync + apply
        let second = session.sync_apply();

        // Then: Rejected, and the first run completes normally
        assert!(matches!(second, crate::ApplyOutcome::AlreadyRunning));
        release.send(()).unwrap();
        assert!(matches!(
            first.join().unwrap(),
            CheckThenApplyOutcome::NoUpdates
        ));
    });

    assert_eq!(runner.kinds(), vec!["lock-refresh"]);
}
