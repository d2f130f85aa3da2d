//! Outcome events
//!
//! The explicit teardown payload handed to the orchestrator: everything the
//! relay needs to know about one completed test, with no reach into the test
//! framework's internals. Serializable so recorded runs can be replayed.

use serde::{Deserialize, Serialize};

use relay_common::{ExecutionOutcome, TestIdentity};

/// One completed test, delivered once at teardown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeEvent {
    /// Runner-assigned node id, e.g. `tests/e2e/test_login.py::test_login[chromium-1920x1080]`.
    pub test_id: String,

    /// Full display name including the parametrization suffix; artifact file
    /// names are derived from this.
    pub display_name: String,

    /// Documentation-embedded case id, e.g. `LG-T002`.
    pub case_id: String,

    /// Parametrization token naming the execution target, e.g.
    /// `chromium-1920x1080`.
    pub target: String,

    pub passed: bool,

    /// Rendered failure trace, absent for passing tests.
    pub failure_detail: Option<String>,

    /// Finished step trace from the recorder.
    #[serde(default)]
    pub steps: Vec<String>,
}

impl OutcomeEvent {
    /// Event for a test that passed, with its finished step trace.
    pub fn passed(
        test_id: impl Into<String>,
        display_name: impl Into<String>,
        case_id: impl Into<String>,
        target: impl Into<String>,
        steps: Vec<String>,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            display_name: display_name.into(),
            case_id: case_id.into(),
            target: target.into(),
            passed: true,
            failure_detail: None,
            steps,
        }
    }

    /// Event for a test that failed, with the rendered failure trace.
    pub fn failed(
        test_id: impl Into<String>,
        display_name: impl Into<String>,
        case_id: impl Into<String>,
        target: impl Into<String>,
        failure_detail: impl Into<String>,
        steps: Vec<String>,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            display_name: display_name.into(),
            case_id: case_id.into(),
            target: target.into(),
            passed: false,
            failure_detail: Some(failure_detail.into()),
            steps,
        }
    }

    /// Dedup identity for this event under the given environment.
    pub fn identity(&self, environment: &str) -> TestIdentity {
        TestIdentity::new(self.case_id.clone(), environment, self.target.clone())
    }

    pub fn outcome(&self) -> ExecutionOutcome {
        ExecutionOutcome {
            passed: self.passed,
            failure_detail: self.failure_detail.clone(),
            steps: self.steps.clone(),
        }
    }

    /// Display name with the trailing parametrization suffix stripped, for
    /// use in record titles.
    pub fn clean_name(&self) -> &str {
        let name = self.display_name.trim();
        if let Some(stripped) = name.strip_suffix(']') {
            if let Some(idx) = stripped.rfind('[') {
                return name[..idx].trim_end();
            }
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(display_name: &str) -> OutcomeEvent {
        OutcomeEvent {
            test_id: "tests/test_login.py::test_login".to_string(),
            display_name: display_name.to_string(),
            case_id: "LG-T002".to_string(),
            target: "chromium-1920x1080".to_string(),
            passed: false,
            failure_detail: Some("assert visible".to_string()),
            steps: vec![],
        }
    }

    #[test]
    fn test_clean_name_strips_parametrization() {
        assert_eq!(
            event("test_login[chromium-1920x1080]").clean_name(),
            "test_login"
        );
        assert_eq!(event("test_login").clean_name(), "test_login");
        assert_eq!(event("test_data[a][b]").clean_name(), "test_data[a]");
    }

    #[test]
    fn test_identity_uses_configured_environment() {
        let identity = event("test_login[chromium-1920x1080]").identity("qa");
        assert_eq!(identity.test_case_id, "LG-T002");
        assert_eq!(identity.environment, "qa");
        assert_eq!(identity.execution_target, "chromium-1920x1080");
    }

    #[test]
    fn test_event_round_trips_through_json() {
        let original = event("test_login[chromium-1920x1080]");
        let json = serde_json::to_string(&original).unwrap();
        let back: OutcomeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.display_name, original.display_name);
        assert_eq!(back.failure_detail, original.failure_detail);
    }
}
