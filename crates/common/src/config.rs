//! Relay configuration
//!
//! One explicit configuration object, constructed once at startup and passed
//! by reference into the orchestrator, adapters and resolver. Backends that
//! fail validation are disabled individually; the rest of the relay keeps
//! working.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::TrackerError;

/// Top-level relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Execution environment label (encoded into record titles)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// HTTP client settings shared by all backends
    #[serde(default)]
    pub http: HttpConfig,

    /// Evidence storage locations
    #[serde(default)]
    pub evidence: EvidenceConfig,

    /// Kanban (list-based board) backend
    #[serde(default)]
    pub kanban: KanbanConfig,

    /// Workflow (status-based issue tracker) backend
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

fn default_environment() -> String {
    "qa".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            http: HttpConfig::default(),
            evidence: EvidenceConfig::default(),
            kanban: KanbanConfig::default(),
            workflow: WorkflowConfig::default(),
        }
    }
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Where the UI-interaction layer writes evidence files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceConfig {
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,

    #[serde(default = "default_video_dir")]
    pub video_dir: PathBuf,

    #[serde(default = "default_trace_dir")]
    pub trace_dir: PathBuf,
}

fn default_screenshot_dir() -> PathBuf {
    PathBuf::from("reports/screenshots")
}

fn default_video_dir() -> PathBuf {
    PathBuf::from("reports/videos")
}

fn default_trace_dir() -> PathBuf {
    PathBuf::from("reports/traces")
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            screenshot_dir: default_screenshot_dir(),
            video_dir: default_video_dir(),
            trace_dir: default_trace_dir(),
        }
    }
}

/// Kanban backend configuration (Trello-compatible wire contract)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KanbanConfig {
    #[serde(default)]
    pub enabled: bool,

    /// API base URL, overridable for self-hosted deployments and tests
    #[serde(default = "default_kanban_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub api_token: String,

    /// Board lane ids keyed by lifecycle role
    #[serde(default)]
    pub lanes: KanbanLanes,
}

fn default_kanban_base_url() -> String {
    "https://api.trello.com/1".to_string()
}

impl Default for KanbanConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_kanban_base_url(),
            api_key: String::new(),
            api_token: String::new(),
            lanes: KanbanLanes::default(),
        }
    }
}

/// The four lane ids the lifecycle moves cards between
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KanbanLanes {
    /// Intake lane: new and reopened failures land here
    #[serde(default)]
    pub failed: String,

    #[serde(default)]
    pub qa: String,

    #[serde(default)]
    pub ongoing: String,

    /// Terminal lane: verified fixes are moved here
    #[serde(default)]
    pub done: String,
}

impl KanbanConfig {
    /// Check that every field an enabled backend needs is present.
    pub fn validate(&self) -> Result<(), TrackerError> {
        let mut missing = Vec::new();
        if self.api_key.is_empty() {
            missing.push("api_key");
        }
        if self.api_token.is_empty() {
            missing.push("api_token");
        }
        if self.lanes.failed.is_empty() {
            missing.push("lanes.failed");
        }
        if self.lanes.qa.is_empty() {
            missing.push("lanes.qa");
        }
        if self.lanes.ongoing.is_empty() {
            missing.push("lanes.ongoing");
        }
        if self.lanes.done.is_empty() {
            missing.push("lanes.done");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TrackerError::Configuration {
                backend: "kanban".to_string(),
                reason: format!("missing fields: {}", missing.join(", ")),
            })
        }
    }
}

/// Workflow backend configuration (Jira-compatible wire contract)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub base_url: String,

    /// API user, usually an e-mail address
    #[serde(default)]
    pub api_user: String,

    #[serde(default)]
    pub api_token: String,

    #[serde(default)]
    pub project_key: String,

    #[serde(default = "default_issue_type")]
    pub issue_type: String,

    /// Status newly created and reopened issues are moved to
    #[serde(default = "default_intake_status")]
    pub intake_status: String,

    /// Status verified fixes are moved to
    #[serde(default = "default_terminal_status")]
    pub terminal_status: String,

    /// Labels applied to every created issue
    #[serde(default)]
    pub labels: Vec<String>,

    /// Optional security level id applied at creation
    pub security_level_id: Option<String>,
}

fn default_issue_type() -> String {
    "Bug".to_string()
}

fn default_intake_status() -> String {
    "To Do".to_string()
}

fn default_terminal_status() -> String {
    "Done".to_string()
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: String::new(),
            api_user: String::new(),
            api_token: String::new(),
            project_key: String::new(),
            issue_type: default_issue_type(),
            intake_status: default_intake_status(),
            terminal_status: default_terminal_status(),
            labels: Vec::new(),
            security_level_id: None,
        }
    }
}

impl WorkflowConfig {
    /// Check that every field an enabled backend needs is present.
    pub fn validate(&self) -> Result<(), TrackerError> {
        let mut missing = Vec::new();
        if self.base_url.is_empty() {
            missing.push("base_url");
        }
        if self.api_user.is_empty() {
            missing.push("api_user");
        }
        if self.api_token.is_empty() {
            missing.push("api_token");
        }
        if self.project_key.is_empty() {
            missing.push("project_key");
        }
        if self.issue_type.is_empty() {
            missing.push("issue_type");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TrackerError::Configuration {
                backend: "workflow".to_string(),
                reason: format!("missing fields: {}", missing.join(", ")),
            })
        }
    }
}

impl RelayConfig {
    /// Load configuration from file
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_disable_backends() {
        let config = RelayConfig::default();
        assert_eq!(config.environment, "qa");
        assert!(!config.kanban.enabled);
        assert!(!config.workflow.enabled);
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn test_parse_full_document() {
        let doc = r#"
            environment = "staging"

            [evidence]
            screenshot_dir = "out/shots"
            video_dir = "out/videos"
            trace_dir = "out/traces"

            [kanban]
            enabled = true
            api_key = "k"
            api_token = "t"

            [kanban.lanes]
            failed = "l1"
            qa = "l2"
            ongoing = "l3"
            done = "l4"

            [workflow]
            enabled = true
            base_url = "https://example.atlassian.net"
            api_user = "bot@example.com"
            api_token = "secret"
            project_key = "AT"
            labels = ["automated"]
        "#;
        let config: RelayConfig = toml::from_str(doc).unwrap();
        assert_eq!(config.environment, "staging");
        assert_eq!(config.evidence.video_dir, PathBuf::from("out/videos"));
        assert!(config.kanban.validate().is_ok());
        assert!(config.workflow.validate().is_ok());
        assert_eq!(config.workflow.issue_type, "Bug");
        assert_eq!(config.workflow.intake_status, "To Do");
        assert_eq!(config.workflow.labels, vec!["automated".to_string()]);
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let config = KanbanConfig {
            enabled: true,
            api_key: "k".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("api_token"));
        assert!(msg.contains("lanes.done"));
        assert!(!msg.contains("api_key,"));
    }
}
