//! Core types for DefectRelay

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Defect-tracking backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Kanban,
    Workflow,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Kanban => write!(f, "kanban"),
            Backend::Workflow => write!(f, "workflow"),
        }
    }
}

/// Composite dedup key for a test execution: one open record may exist per
/// identity per backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestIdentity {
    pub test_case_id: String,
    pub environment: String,
    pub execution_target: String,
}

impl TestIdentity {
    pub fn new(
        test_case_id: impl Into<String>,
        environment: impl Into<String>,
        execution_target: impl Into<String>,
    ) -> Self {
        Self {
            test_case_id: test_case_id.into(),
            environment: environment.into(),
            execution_target: execution_target.into(),
        }
    }

    /// Environment as it appears in record titles and search criteria.
    pub fn environment_token(&self) -> String {
        self.environment.to_uppercase()
    }

    /// Parenthesized case id, e.g. `(LG-T002)`.
    pub fn case_token(&self) -> String {
        format!("({})", self.test_case_id)
    }

    /// Bracketed execution target, e.g. `[chromium-1920x1080]`.
    pub fn target_token(&self) -> String {
        format!("[{}]", self.execution_target)
    }

    /// Stable textual encoding used as the leading part of record titles.
    pub fn title_fragment(&self) -> String {
        format!(
            "{} - {} {}",
            self.environment_token(),
            self.case_token(),
            self.target_token()
        )
    }
}

impl std::fmt::Display for TestIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title_fragment())
    }
}

/// Outcome of a single completed test, assembled at teardown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub passed: bool,
    /// Rendered failure trace, absent for passing tests.
    pub failure_detail: Option<String>,
    /// Ordered step descriptions recorded during the run.
    #[serde(default)]
    pub steps: Vec<String>,
}

impl ExecutionOutcome {
    pub fn passed(steps: Vec<String>) -> Self {
        Self {
            passed: true,
            failure_detail: None,
            steps,
        }
    }

    pub fn failed(failure_detail: impl Into<String>, steps: Vec<String>) -> Self {
        Self {
            passed: false,
            failure_detail: Some(failure_detail.into()),
            steps,
        }
    }
}

/// A backend's current knowledge of a defect record. Always fetched fresh at
/// dispatch time, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedRecord {
    /// Backend-assigned id (card id or issue key).
    pub external_id: String,
    /// Lane name or workflow status the record currently sits in.
    pub lane_or_status: String,
    pub backend: Backend,
}

impl TrackedRecord {
    pub fn new(
        external_id: impl Into<String>,
        lane_or_status: impl Into<String>,
        backend: Backend,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            lane_or_status: lane_or_status.into(),
            backend,
        }
    }
}

/// Evidence files resolved for one test by best-effort name matching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceSet {
    pub screenshot: Option<PathBuf>,
    pub video: Option<PathBuf>,
    pub trace: Option<PathBuf>,
}

impl EvidenceSet {
    /// Present evidence paths, screenshot first.
    pub fn paths(&self) -> Vec<&Path> {
        [&self.screenshot, &self.video, &self.trace]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.paths().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_fragment() {
        let identity = TestIdentity::new("LG-T002", "qa", "chromium-1920x1080");
        assert_eq!(
            identity.title_fragment(),
            "QA - (LG-T002) [chromium-1920x1080]"
        );
    }

    #[test]
    fn test_identity_tokens() {
        let identity = TestIdentity::new("HM-T001", "dev", "firefox-800x600");
        assert_eq!(identity.environment_token(), "DEV");
        assert_eq!(identity.case_token(), "(HM-T001)");
        assert_eq!(identity.target_token(), "[firefox-800x600]");
    }

    #[test]
    fn test_evidence_paths_order() {
        let set = EvidenceSet {
            screenshot: Some(PathBuf::from("a.png")),
            video: None,
            trace: Some(PathBuf::from("c.zip")),
        };
        let paths = set.paths();
        assert_eq!(paths, vec![Path::new("a.png"), Path::new("c.zip")]);
        assert!(!set.is_empty());
        assert!(EvidenceSet::default().is_empty());
    }
}
