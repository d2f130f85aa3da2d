//! Lifecycle decision
//!
//! A pure mapping from (outcome, existing open record) to the action the
//! orchestrator executes. All tracker knowledge stays out of this function;
//! it only sees whether an open record exists.

use relay_common::TrackedRecord;

/// What a dispatch does to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Failure with no open record: create one with full failure context.
    CreateNew,
    /// Repeated failure: append a re-failure comment and force the record
    /// back to intake, preserving its history.
    ReopenAndComment,
    /// Pass with an open record: append success context and move the record
    /// to the terminal state.
    CloseAndComment,
    /// Pass with nothing open: stay silent.
    NoOp,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::CreateNew => write!(f, "create"),
            Action::ReopenAndComment => write!(f, "reopen"),
            Action::CloseAndComment => write!(f, "close"),
            Action::NoOp => write!(f, "no-op"),
        }
    }
}

/// Decide the lifecycle action for one backend.
pub fn decide(passed: bool, existing: Option<&TrackedRecord>) -> Action {
    match (passed, existing) {
        (false, None) => Action::CreateNew,
        (false, Some(_)) => Action::ReopenAndComment,
        (true, Some(_)) => Action::CloseAndComment,
        (true, None) => Action::NoOp,
    }
}
