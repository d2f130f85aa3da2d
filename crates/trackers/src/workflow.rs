//! Workflow issue tracker client (Jira-compatible wire contract).
//!
//! Issues are scoped by project and issue type; the dedup search is a JQL
//! query over the summary field with the terminal status category excluded.
//! Rich-text payloads use the tracker's document format, rendered here as a
//! single plain-text paragraph.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use relay_common::{Backend, Result, TestIdentity, TrackedRecord, TrackerError, WorkflowConfig};

use crate::adapter::{
    comment_disposition, response_detail, search_disposition, CommentDisposition,
    SearchDisposition, TrackerAdapter,
};

/// Client for a workflow-status-based tracker.
#[derive(Debug)]
pub struct WorkflowClient {
    http: reqwest::Client,
    base_url: String,
    api_user: String,
    api_token: String,
    project_key: String,
    issue_type: String,
    intake_status: String,
    terminal_status: String,
    labels: Vec<String>,
    security_level_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<IssueSummary>,
}

#[derive(Debug, Deserialize)]
struct IssueSummary {
    key: String,
    fields: IssueFields,
}

#[derive(Debug, Deserialize)]
struct IssueFields {
    summary: String,
    status: IssueStatus,
}

#[derive(Debug, Deserialize)]
struct IssueStatus {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    id: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct TransitionsResponse {
    #[serde(default)]
    transitions: Vec<TransitionOption>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionOption {
    pub(crate) id: String,
    pub(crate) name: String,
}

impl WorkflowClient {
    /// Build a client from validated configuration.
    pub fn new(config: &WorkflowConfig, timeout: Duration) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        info!(
            "workflow client ready (project {}, issue type {})",
            config.project_key, config.issue_type
        );
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_user: config.api_user.clone(),
            api_token: config.api_token.clone(),
            project_key: config.project_key.clone(),
            issue_type: config.issue_type.clone(),
            intake_status: config.intake_status.clone(),
            terminal_status: config.terminal_status.clone(),
            labels: config.labels.clone(),
            security_level_id: config.security_level_id.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.api_user, Some(&self.api_token))
    }

    /// The dedup query: all three identity tokens as literal summary
    /// substrings, scoped to this project and issue type, terminal status
    /// category excluded.
    pub(crate) fn build_search_jql(&self, identity: &TestIdentity) -> String {
        format!(
            "project = {} AND summary ~ \"{}\" AND summary ~ \"{}\" AND summary ~ \"{}\" \
             AND issuetype = \"{}\" AND statusCategory != \"Done\"",
            self.project_key,
            identity.environment_token(),
            lucene_escape(&identity.case_token()),
            lucene_escape(&identity.target_token()),
            self.issue_type,
        )
    }

    /// Look up a transition id by name and submit it. `Ok(false)` when the
    /// target is not reachable from the issue's current status.
    async fn transition_by_name(&self, issue_key: &str, target: &str) -> Result<bool> {
        let url = format!(
            "{}/rest/api/3/issue/{}/transitions",
            self.base_url, issue_key
        );

        let response = self.request(reqwest::Method::GET, url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(TrackerError::Transition {
                record: issue_key.to_string(),
                target: target.to_string(),
                detail: response_detail(response).await,
            });
        }
        let available: TransitionsResponse = response.json().await?;

        let transition_id = match find_transition_id(&available.transitions, target) {
            Some(id) => id.to_string(),
            None => {
                let names: Vec<&str> = available
                    .transitions
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect();
                warn!(
                    "transition '{}' not available for issue {} (available: {})",
                    target,
                    issue_key,
                    names.join(", ")
                );
                return Ok(false);
            }
        };

        let response = self
            .request(reqwest::Method::POST, url)
            .json(&json!({ "transition": { "id": transition_id } }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TrackerError::Transition {
                record: issue_key.to_string(),
                target: target.to_string(),
                detail: response_detail(response).await,
            });
        }

        info!("issue {} transitioned to '{}'", issue_key, target);
        Ok(true)
    }
}

/// Escape query-language specials so identity tokens match literally instead
/// of being parsed as syntax. The doubled backslash survives the tracker's
/// own string unescaping before reaching the text index.
pub(crate) fn lucene_escape(token: &str) -> String {
    token
        .replace('(', "\\\\(")
        .replace(')', "\\\\)")
        .replace('[', "\\\\[")
        .replace(']', "\\\\]")
}

/// Single-paragraph plain-text document in the tracker's rich-text format.
pub(crate) fn adf_document(text: &str) -> serde_json::Value {
    json!({
        "type": "doc",
        "version": 1,
        "content": [
            {
                "type": "paragraph",
                "content": [
                    { "type": "text", "text": text }
                ]
            }
        ]
    })
}

/// Case-insensitive transition lookup by display name.
pub(crate) fn find_transition_id<'a>(
    transitions: &'a [TransitionOption],
    target: &str,
) -> Option<&'a str> {
    transitions
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(target))
        .map(|t| t.id.as_str())
}

#[async_trait]
impl TrackerAdapter for WorkflowClient {
    fn backend(&self) -> Backend {
        Backend::Workflow
    }

    fn intake_state(&self) -> &str {
        &self.intake_status
    }

    fn terminal_state(&self) -> &str {
        &self.terminal_status
    }

    async fn find_open_record(&self, identity: &TestIdentity) -> Result<Option<TrackedRecord>> {
        let jql = self.build_search_jql(identity);
        debug!("searching issues: {}", jql);

        let url = format!("{}/rest/api/3/search/jql", self.base_url);
        let response = self
            .request(reqwest::Method::GET, url)
            .query(&[
                ("jql", jql.as_str()),
                ("fields", "summary,status"),
                ("maxResults", "1"),
            ])
            .send()
            .await?;

        match search_disposition(response.status()) {
            SearchDisposition::Parse => {}
            SearchDisposition::QueryRejected => {
                return Err(TrackerError::Query {
                    backend: Backend::Workflow.to_string(),
                    detail: response_detail(response).await,
                });
            }
            SearchDisposition::Failed => {
                if let Err(err) = response.error_for_status_ref() {
                    return Err(err.into());
                }
            }
        }

        let data: SearchResponse = response.json().await?;
        match data.issues.into_iter().next() {
            Some(issue) => {
                info!(
                    "open issue found for {}: {} '{}' (status {})",
                    identity, issue.key, issue.fields.summary, issue.fields.status.name
                );
                Ok(Some(TrackedRecord::new(
                    issue.key,
                    issue.fields.status.name,
                    Backend::Workflow,
                )))
            }
            None => {
                debug!("no open issue for {}", identity);
                Ok(None)
            }
        }
    }

    async fn create_record(&self, title: &str, body: &str) -> Result<TrackedRecord> {
        let mut fields = json!({
            "project": { "key": self.project_key },
            "summary": title,
            "description": adf_document(body),
            "issuetype": { "name": self.issue_type },
        });
        if !self.labels.is_empty() {
            fields["labels"] = json!(self.labels);
        }
        if let Some(level) = &self.security_level_id {
            fields["security"] = json!({ "id": level });
        }

        let response = self
            .request(
                reqwest::Method::POST,
                format!("{}/rest/api/3/issue", self.base_url),
            )
            .json(&json!({ "fields": fields }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TrackerError::Creation(response_detail(response).await));
        }

        let issue: CreatedIssue = response.json().await?;
        info!(
            "issue created: {} (id {}, project {})",
            issue.key, issue.id, self.project_key
        );

        // Newly created issues start outside the board's intake column; move
        // them there so the failure is visible immediately. The issue exists
        // either way, so a failed move must not fail the creation.
        match self.transition_by_name(&issue.key, &self.intake_status).await {
            Ok(true) => {}
            Ok(false) => warn!(
                "issue {} could not be moved to intake status '{}'",
                issue.key, self.intake_status
            ),
            Err(err) => warn!("intake transition failed for issue {}: {}", issue.key, err),
        }

        Ok(TrackedRecord::new(
            issue.key,
            self.intake_status.clone(),
            Backend::Workflow,
        ))
    }

    async fn comment(&self, record: &TrackedRecord, text: &str) -> Result<()> {
        let url = format!(
            "{}/rest/api/3/issue/{}/comment",
            self.base_url, record.external_id
        );
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&json!({ "body": adf_document(text) }))
            .send()
            .await?;

        match comment_disposition(response.status()) {
            CommentDisposition::Ok => {
                info!("comment added to issue {}", record.external_id);
                Ok(())
            }
            CommentDisposition::MissingRemotely => {
                warn!(
                    "issue {} no longer exists, comment skipped",
                    record.external_id
                );
                Ok(())
            }
            CommentDisposition::Rejected => Err(TrackerError::Comment {
                record: record.external_id.clone(),
                detail: response_detail(response).await,
            }),
        }
    }

    async fn attach_file(&self, record: &TrackedRecord, path: &Path) -> Result<bool> {
        if !path.exists() {
            warn!("attachment missing locally, skipped: {}", path.display());
            return Ok(false);
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("evidence")
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.clone()));

        let response = self
            .request(
                reqwest::Method::POST,
                format!(
                    "{}/rest/api/3/issue/{}/attachments",
                    self.base_url, record.external_id
                ),
            )
            .header("X-Atlassian-Token", "no-check")
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TrackerError::Attach {
                record: record.external_id.clone(),
                detail: response_detail(response).await,
            });
        }

        info!("attached {} to issue {}", file_name, record.external_id);
        Ok(true)
    }

    async fn transition(&self, record: &TrackedRecord, target: &str) -> Result<bool> {
        self.transition_by_name(&record.external_id, target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WorkflowConfig {
        WorkflowConfig {
            enabled: true,
            base_url: "https://tracker.test/".to_string(),
            api_user: "bot@example.com".to_string(),
            api_token: "secret".to_string(),
            project_key: "AT".to_string(),
            ..Default::default()
        }
    }

    fn identity() -> TestIdentity {
        TestIdentity::new("LG-T002", "qa", "chromium-1920x1080")
    }

    #[test]
    fn test_lucene_escape() {
        assert_eq!(lucene_escape("(LG-T002)"), "\\\\(LG-T002\\\\)");
        assert_eq!(
            lucene_escape("[chromium-1920x1080]"),
            "\\\\[chromium-1920x1080\\\\]"
        );
        assert_eq!(lucene_escape("plain"), "plain");
    }

    #[test]
    fn test_build_search_jql() {
        let client = WorkflowClient::new(&config(), Duration::from_secs(5)).unwrap();
        let jql = client.build_search_jql(&identity());
        assert!(jql.starts_with("project = AT AND "));
        assert!(jql.contains("summary ~ \"QA\""));
        assert!(jql.contains("summary ~ \"\\\\(LG-T002\\\\)\""));
        assert!(jql.contains("summary ~ \"\\\\[chromium-1920x1080\\\\]\""));
        assert!(jql.contains("issuetype = \"Bug\""));
        assert!(jql.ends_with("statusCategory != \"Done\""));
    }

    #[test]
    fn test_jql_escapes_every_reserved_token_round_trip() {
        // Identity tokens always carry parens and brackets; after escaping,
        // none may remain bare, so the query engine sees them as literals
        // and a record titled with this identity is found again.
        let client = WorkflowClient::new(&config(), Duration::from_secs(5)).unwrap();
        let tricky = TestIdentity::new("AB-(1)[2]", "qa", "dev[ice]-(x)");
        let jql = client.build_search_jql(&tricky);

        for (bare, escaped) in [("(", "\\\\("), (")", "\\\\)"), ("[", "\\\\["), ("]", "\\\\]")] {
            let without_escapes = jql.replace(escaped, "");
            assert!(
                !without_escapes.contains(bare),
                "unescaped '{}' leaked into JQL: {}",
                bare,
                jql
            );
        }
    }

    #[test]
    fn test_adf_document_shape() {
        let doc = adf_document("hello");
        assert_eq!(doc["type"], "doc");
        assert_eq!(doc["version"], 1);
        assert_eq!(doc["content"][0]["type"], "paragraph");
        assert_eq!(doc["content"][0]["content"][0]["text"], "hello");
    }

    #[test]
    fn test_find_transition_id_is_case_insensitive() {
        let transitions = vec![
            TransitionOption {
                id: "11".to_string(),
                name: "To Do".to_string(),
            },
            TransitionOption {
                id: "31".to_string(),
                name: "Done".to_string(),
            },
        ];
        assert_eq!(find_transition_id(&transitions, "to do"), Some("11"));
        assert_eq!(find_transition_id(&transitions, "DONE"), Some("31"));
        assert_eq!(find_transition_id(&transitions, "Archived"), None);
    }

    #[test]
    fn test_new_rejects_incomplete_config() {
        let mut bad = config();
        bad.project_key.clear();
        let err = WorkflowClient::new(&bad, Duration::from_secs(5)).unwrap_err();
        assert_eq!(err.operation(), "configure");
    }
}
