mod collaborators;
mod outcome;
mod session_state;
mod settings;
mod update_session;

pub use {
    collaborators::{Notifier, PathOpener, Severity, StatusListener},
    outcome::{ApplyOutcome, CheckOutcome, CheckThenApplyOutcome},
    session_state::{SessionSnapshot, SessionState, StatusTone},
    settings::{CANDIDATE_FILE_NAME, CandidateRetention, SessionSettings},
    update_session::{APP_NAME, Collaborators, UpdateSession},
};
