//! Dispatch orchestration
//!
//! Runs once per completed test, after teardown has released the test's own
//! resources so artifacts are finalized on disk. Each enabled backend gets
//! the full resolve → decide → execute pass; backend failures are logged and
//! isolated here so a reporting problem can never change or mask the test's
//! own verdict.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use relay_common::{ArtifactLocator, Backend, Result, TestIdentity, TrackedRecord};
use relay_trackers::TrackerAdapter;

use crate::event::OutcomeEvent;
use crate::lifecycle::{decide, Action};
use crate::render;
use crate::resolver;

/// What one dispatch did on one backend.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub backend: Backend,
    /// Action taken; `None` when the backend was skipped on error.
    pub action: Option<Action>,
    /// External id of the record acted on, if any.
    pub record_id: Option<String>,
    /// Evidence files successfully attached.
    pub attachments: usize,
    /// The error that caused this backend's report to be skipped.
    pub error: Option<String>,
}

impl DispatchReport {
    fn skipped(backend: Backend, error: String) -> Self {
        Self {
            backend,
            action: None,
            record_id: None,
            attachments: 0,
            error: Some(error),
        }
    }
}

/// Wires resolver, lifecycle decision, adapters and the artifact locator
/// together for one test outcome at a time.
pub struct Orchestrator {
    environment: String,
    adapters: Vec<Arc<dyn TrackerAdapter>>,
    locator: ArtifactLocator,
}

impl Orchestrator {
    pub fn new(
        environment: impl Into<String>,
        adapters: Vec<Arc<dyn TrackerAdapter>>,
        locator: ArtifactLocator,
    ) -> Self {
        Self {
            environment: environment.into(),
            adapters,
            locator,
        }
    }

    /// Dispatch one completed test to every enabled backend.
    ///
    /// Never fails: per-backend errors are logged with full context and
    /// recorded in the returned reports.
    pub async fn dispatch(&self, event: &OutcomeEvent) -> Vec<DispatchReport> {
        let identity = event.identity(&self.environment);
        info!(
            "dispatching {} outcome for {}",
            if event.passed { "passing" } else { "failing" },
            identity
        );

        let mut reports = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            let backend = adapter.backend();
            match self.dispatch_backend(adapter.as_ref(), &identity, event).await {
                Ok(report) => reports.push(report),
                Err(err) => {
                    error!(
                        "{} report for {} skipped ({} failed): {}",
                        backend,
                        identity,
                        err.operation(),
                        err
                    );
                    reports.push(DispatchReport::skipped(backend, err.to_string()));
                }
            }
        }
        reports
    }

    async fn dispatch_backend(
        &self,
        adapter: &dyn TrackerAdapter,
        identity: &TestIdentity,
        event: &OutcomeEvent,
    ) -> Result<DispatchReport> {
        let existing = resolver::resolve(identity, adapter).await?;
        let action = decide(event.passed, existing.as_ref());
        debug!("{} action for {}: {}", adapter.backend(), identity, action);

        match (action, existing) {
            (Action::CreateNew, _) => self.create_new(adapter, identity, event).await,
            (Action::ReopenAndComment, Some(record)) => {
                self.reopen(adapter, identity, event, record).await
            }
            (Action::CloseAndComment, Some(record)) => {
                self.close(adapter, identity, event, record).await
            }
            _ => {
                debug!(
                    "nothing to report to {} for always-passing {}",
                    adapter.backend(),
                    identity
                );
                Ok(DispatchReport {
                    backend: adapter.backend(),
                    action: Some(Action::NoOp),
                    record_id: None,
                    attachments: 0,
                    error: None,
                })
            }
        }
    }

    async fn create_new(
        &self,
        adapter: &dyn TrackerAdapter,
        identity: &TestIdentity,
        event: &OutcomeEvent,
    ) -> Result<DispatchReport> {
        let title = render::failure_title(identity, event.clean_name());
        let body = render::failure_body(identity, event);

        let record = adapter.create_record(&title, &body).await?;
        let attachments = self
            .attach_evidence(adapter, &record, &event.display_name)
            .await;

        info!(
            "{} record {} created for {} with {} attachment(s)",
            adapter.backend(),
            record.external_id,
            identity,
            attachments
        );
        Ok(DispatchReport {
            backend: adapter.backend(),
            action: Some(Action::CreateNew),
            record_id: Some(record.external_id),
            attachments,
            error: None,
        })
    }

    async fn reopen(
        &self,
        adapter: &dyn TrackerAdapter,
        identity: &TestIdentity,
        event: &OutcomeEvent,
        record: TrackedRecord,
    ) -> Result<DispatchReport> {
        warn!(
            "re-failure of {} with open {} record {}",
            identity,
            adapter.backend(),
            record.external_id
        );

        adapter
            .comment(&record, &render::refail_comment(identity, event))
            .await?;

        // A human may have pulled the record downstream; force it back to
        // intake so the regression is triaged again.
        let intake = adapter.intake_state();
        if !record.lane_or_status.eq_ignore_ascii_case(intake) {
            if adapter.transition(&record, intake).await? {
                info!(
                    "{} record {} moved back to {}",
                    adapter.backend(),
                    record.external_id,
                    intake
                );
            } else {
                warn!(
                    "{} record {} could not be moved back to {}",
                    adapter.backend(),
                    record.external_id,
                    intake
                );
            }
        }

        let attachments = self
            .attach_evidence(adapter, &record, &event.display_name)
            .await;

        Ok(DispatchReport {
            backend: adapter.backend(),
            action: Some(Action::ReopenAndComment),
            record_id: Some(record.external_id),
            attachments,
            error: None,
        })
    }

    async fn close(
        &self,
        adapter: &dyn TrackerAdapter,
        identity: &TestIdentity,
        event: &OutcomeEvent,
        record: TrackedRecord,
    ) -> Result<DispatchReport> {
        let mut attachments = 0;
        let video = self.locator.locate_video(&event.display_name);
        if let Some(path) = &video {
            match adapter.attach_file(&record, path).await {
                Ok(true) => attachments += 1,
                Ok(false) => {}
                Err(err) => warn!(
                    "video attachment failed for {} record {}: {}",
                    adapter.backend(),
                    record.external_id,
                    err
                ),
            }
        }

        let video_name = video
            .as_deref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str());
        let comment = render::success_comment(identity, event, video_name, adapter.terminal_state());
        adapter.comment(&record, &comment).await?;

        let terminal = adapter.terminal_state();
        if adapter.transition(&record, terminal).await? {
            info!(
                "{} record {} closed as {} for {}",
                adapter.backend(),
                record.external_id,
                terminal,
                identity
            );
        } else {
            warn!(
                "{} record {} could not be moved to {}",
                adapter.backend(),
                record.external_id,
                terminal
            );
        }

        Ok(DispatchReport {
            backend: adapter.backend(),
            action: Some(Action::CloseAndComment),
            record_id: Some(record.external_id),
            attachments,
            error: None,
        })
    }

    /// Attach every located evidence file, each attempt independent of the
    /// others' outcomes.
    async fn attach_evidence(
        &self,
        adapter: &dyn TrackerAdapter,
        record: &TrackedRecord,
        display_name: &str,
    ) -> usize {
        let evidence = self.locator.locate(display_name);
        let mut attached = 0;
        for path in evidence.paths() {
            match adapter.attach_file(record, path).await {
                Ok(true) => attached += 1,
                Ok(false) => {}
                Err(err) => warn!(
                    "attachment {} failed for {} record {}: {}",
                    path.display(),
                    adapter.backend(),
                    record.external_id,
                    err
                ),
            }
        }
        attached
    }
}
