//! Kanban board client (Trello-compatible wire contract).
//!
//! Cards live in four lanes: Failed (intake), QA, Ongoing and Done
//! (terminal). Authentication rides in the query string; the card title is
//! the search surface, so the find operation lists the three non-terminal
//! lanes and matches identity tokens against card names.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use relay_common::{Backend, KanbanConfig, Result, TestIdentity, TrackedRecord, TrackerError};

use crate::adapter::{
    comment_disposition, response_detail, search_disposition, CommentDisposition,
    SearchDisposition, TrackerAdapter,
};

pub const LANE_FAILED: &str = "Failed";
pub const LANE_QA: &str = "QA";
pub const LANE_ONGOING: &str = "Ongoing";
pub const LANE_DONE: &str = "Done";

/// Client for a Kanban-list-based tracker.
#[derive(Debug)]
pub struct KanbanClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_token: String,
    failed_lane: String,
    qa_lane: String,
    ongoing_lane: String,
    done_lane: String,
}

#[derive(Debug, Deserialize)]
struct CardSummary {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct CreatedCard {
    id: String,
    #[serde(rename = "idShort")]
    id_short: Option<i64>,
}

impl KanbanClient {
    /// Build a client from validated configuration.
    pub fn new(config: &KanbanConfig, timeout: Duration) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        info!(
            "kanban client ready (lanes failed/qa/ongoing/done configured)"
        );
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_token: config.api_token.clone(),
            failed_lane: config.lanes.failed.clone(),
            qa_lane: config.lanes.qa.clone(),
            ongoing_lane: config.lanes.ongoing.clone(),
            done_lane: config.lanes.done.clone(),
        })
    }

    fn auth(&self) -> [(&'static str, &str); 2] {
        [("key", &self.api_key), ("token", &self.api_token)]
    }

    /// Lanes the dedup search covers; the terminal lane is excluded so
    /// closed cards never suppress a new failure report.
    fn searchable_lanes(&self) -> [(&'static str, &str); 3] {
        [
            (LANE_FAILED, &self.failed_lane),
            (LANE_QA, &self.qa_lane),
            (LANE_ONGOING, &self.ongoing_lane),
        ]
    }

    fn lane_id(&self, lane_name: &str) -> Option<&str> {
        match lane_name.to_uppercase().as_str() {
            "FAILED" => Some(&self.failed_lane),
            "QA" => Some(&self.qa_lane),
            "ONGOING" => Some(&self.ongoing_lane),
            "DONE" => Some(&self.done_lane),
            _ => None,
        }
    }
}

/// A card matches when the environment, case id and target tokens all appear
/// literally in its name.
pub(crate) fn card_matches(card_name: &str, identity: &TestIdentity) -> bool {
    card_name.contains(&identity.environment_token())
        && card_name.contains(&identity.case_token())
        && card_name.contains(&identity.target_token())
}

#[async_trait]
impl TrackerAdapter for KanbanClient {
    fn backend(&self) -> Backend {
        Backend::Kanban
    }

    fn intake_state(&self) -> &str {
        LANE_FAILED
    }

    fn terminal_state(&self) -> &str {
        LANE_DONE
    }

    async fn find_open_record(&self, identity: &TestIdentity) -> Result<Option<TrackedRecord>> {
        for (lane_name, lane_id) in self.searchable_lanes() {
            debug!("searching lane {} for {}", lane_name, identity);

            let url = format!("{}/lists/{}/cards", self.base_url, lane_id);
            let response = self
                .http
                .get(&url)
                .query(&[("fields", "name")])
                .query(&self.auth())
                .send()
                .await?;

            match search_disposition(response.status()) {
                SearchDisposition::Parse => {}
                SearchDisposition::QueryRejected => {
                    return Err(TrackerError::Query {
                        backend: Backend::Kanban.to_string(),
                        detail: response_detail(response).await,
                    });
                }
                SearchDisposition::Failed => {
                    warn!(
                        "lane {} listing failed, skipping: {}",
                        lane_name,
                        response_detail(response).await
                    );
                    continue;
                }
            }

            let cards: Vec<CardSummary> = response.json().await?;
            if let Some(card) = cards.iter().find(|c| card_matches(&c.name, identity)) {
                info!(
                    "open card found in {} for {}: {}",
                    lane_name, identity, card.id
                );
                return Ok(Some(TrackedRecord::new(
                    card.id.clone(),
                    lane_name,
                    Backend::Kanban,
                )));
            }
        }

        debug!("no open card for {}", identity);
        Ok(None)
    }

    async fn create_record(&self, title: &str, body: &str) -> Result<TrackedRecord> {
        let response = self
            .http
            .post(format!("{}/cards", self.base_url))
            .query(&self.auth())
            .form(&[
                ("idList", self.failed_lane.as_str()),
                ("name", title),
                ("desc", body),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TrackerError::Creation(response_detail(response).await));
        }

        let card: CreatedCard = response.json().await?;
        info!(
            "card created in {} lane: {} (short id {:?})",
            LANE_FAILED, card.id, card.id_short
        );
        Ok(TrackedRecord::new(card.id, LANE_FAILED, Backend::Kanban))
    }

    async fn comment(&self, record: &TrackedRecord, text: &str) -> Result<()> {
        let url = format!(
            "{}/cards/{}/actions/comments",
            self.base_url, record.external_id
        );
        let response = self
            .http
            .post(&url)
            .query(&self.auth())
            .form(&[("text", text)])
            .send()
            .await?;

        match comment_disposition(response.status()) {
            CommentDisposition::Ok => {
                info!("comment added to card {}", record.external_id);
                Ok(())
            }
            CommentDisposition::MissingRemotely => {
                warn!(
                    "card {} no longer exists, comment skipped",
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
            .http
            .post(format!(
                "{}/cards/{}/attachments",
                self.base_url, record.external_id
            ))
            .query(&self.auth())
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TrackerError::Attach {
                record: record.external_id.clone(),
                detail: response_detail(response).await,
            });
        }

        info!("attached {} to card {}", file_name, record.external_id);
        Ok(true)
    }

    async fn transition(&self, record: &TrackedRecord, target: &str) -> Result<bool> {
        let lane_id = match self.lane_id(target) {
            Some(id) => id.to_string(),
            None => {
                warn!(
                    "unknown lane '{}' for card {}, move skipped",
                    target, record.external_id
                );
                return Ok(false);
            }
        };

        let response = self
            .http
            .put(format!("{}/cards/{}", self.base_url, record.external_id))
            .query(&self.auth())
            .form(&[("idList", lane_id.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TrackerError::Transition {
                record: record.external_id.clone(),
                target: target.to_string(),
                detail: response_detail(response).await,
            });
        }

        info!("card {} moved to {}", record.external_id, target);
        Ok(true)
    }
}
