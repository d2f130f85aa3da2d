//! End-to-end dispatch scenarios against a recording mock backend.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use relay_common::evidence::sanitize_name;
use relay_common::{
    ArtifactLocator, Backend, EvidenceConfig, Result, TestIdentity, TrackedRecord, TrackerError,
};
use relay_dispatch::{Action, Orchestrator, OutcomeEvent};
use relay_trackers::TrackerAdapter;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Find,
    Create { title: String },
    Comment { record: String, text: String },
    Attach { record: String, file: String },
    Transition { record: String, target: String },
}

struct MockAdapter {
    backend: Backend,
    existing: Option<TrackedRecord>,
    reject_search: bool,
    calls: Mutex<Vec<Call>>,
}

impl MockAdapter {
    fn new(backend: Backend, existing: Option<TrackedRecord>) -> Self {
        Self {
            backend,
            existing,
            reject_search: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn rejecting_search(backend: Backend) -> Self {
        Self {
            reject_search: true,
            ..Self::new(backend, None)
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn record_call(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl TrackerAdapter for MockAdapter {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn intake_state(&self) -> &str {
        "Failed"
    }

    fn terminal_state(&self) -> &str {
        "Done"
    }

    async fn find_open_record(&self, _identity: &TestIdentity) -> Result<Option<TrackedRecord>> {
        self.record_call(Call::Find);
        if self.reject_search {
            return Err(TrackerError::Query {
                backend: self.backend.to_string(),
                detail: "malformed query".to_string(),
            });
        }
        Ok(self.existing.clone())
    }

    async fn create_record(&self, title: &str, _body: &str) -> Result<TrackedRecord> {
        self.record_call(Call::Create {
            title: title.to_string(),
        });
        Ok(TrackedRecord::new("card-1", "Failed", self.backend))
    }

    async fn comment(&self, record: &TrackedRecord, text: &str) -> Result<()> {
        self.record_call(Call::Comment {
            record: record.external_id.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn attach_file(&self, record: &TrackedRecord, path: &Path) -> Result<bool> {
        self.record_call(Call::Attach {
            record: record.external_id.clone(),
            file: path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string(),
        });
        Ok(path.exists())
    }

    async fn transition(&self, record: &TrackedRecord, target: &str) -> Result<bool> {
        self.record_call(Call::Transition {
            record: record.external_id.clone(),
            target: target.to_string(),
        });
        Ok(true)
    }
}

const DISPLAY_NAME: &str = "test_login[chromium-1920x1080]";

fn failing_event() -> OutcomeEvent {
    OutcomeEvent {
        test_id: "tests/e2e/test_login.py::test_login[chromium-1920x1080]".to_string(),
        display_name: DISPLAY_NAME.to_string(),
        case_id: "LG-T002".to_string(),
        target: "chromium-1920x1080".to_string(),
        passed: false,
        failure_detail: Some("AssertionError: dashboard never rendered".to_string()),
        steps: vec![
            "[1] [10:02:11] open login page".to_string(),
            "[2] [10:02:13] submit credentials".to_string(),
        ],
    }
}

fn passing_event() -> OutcomeEvent {
    OutcomeEvent {
        passed: true,
        failure_detail: None,
        ..failing_event()
    }
}

/// Evidence tree with the requested categories present for DISPLAY_NAME.
fn evidence(screenshot: bool, video: bool, trace: bool) -> (TempDir, ArtifactLocator) {
    let tmp = tempfile::tempdir().unwrap();
    let config = EvidenceConfig {
        screenshot_dir: tmp.path().join("screenshots"),
        video_dir: tmp.path().join("videos"),
        trace_dir: tmp.path().join("traces"),
    };
    for dir in [&config.screenshot_dir, &config.video_dir, &config.trace_dir] {
        std::fs::create_dir_all(dir).unwrap();
    }

    let token = sanitize_name(DISPLAY_NAME);
    if screenshot {
        std::fs::write(
            config
                .screenshot_dir
                .join(format!("TEARDOWN_FINAL_STATE_{}.png", token)),
            b"png",
        )
        .unwrap();
    }
    if video {
        std::fs::write(config.video_dir.join(format!("{}_run1.webm", token)), b"webm").unwrap();
    }
    if trace {
        std::fs::write(
            config.trace_dir.join(format!("traceview_{}.zip", token)),
            b"zip",
        )
        .unwrap();
    }

    let locator = ArtifactLocator::new(&config);
    (tmp, locator)
}

fn orchestrator(
    adapters: Vec<Arc<dyn TrackerAdapter>>,
    locator: ArtifactLocator,
) -> Orchestrator {
    Orchestrator::new("qa", adapters, locator)
}

#[tokio::test]
async fn first_failure_creates_record_with_evidence() {
    let (_tmp, locator) = evidence(true, true, true);
    let adapter = Arc::new(MockAdapter::new(Backend::Kanban, None));
    let adapters: Vec<Arc<dyn TrackerAdapter>> = vec![adapter.clone()];

    let reports = orchestrator(adapters, locator).dispatch(&failing_event()).await;

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.action, Some(Action::CreateNew));
    assert_eq!(report.record_id.as_deref(), Some("card-1"));
    assert_eq!(report.attachments, 3);
    assert!(report.error.is_none());

    let calls = adapter.calls();
    assert_eq!(calls[0], Call::Find);
    let title = match &calls[1] {
        Call::Create { title } => title,
        other => panic!("expected create after find, got {:?}", other),
    };
    assert!(title.starts_with("FAILED: QA"));
    assert!(title.contains("(LG-T002)"));
    assert!(title.contains("[chromium-1920x1080]"));
    assert!(title.contains("test_login"));

    let attach_count = calls
        .iter()
        .filter(|c| matches!(c, Call::Attach { record, .. } if record == "card-1"))
        .count();
    assert_eq!(attach_count, 3);
    assert!(!calls.iter().any(|c| matches!(c, Call::Comment { .. })));
    assert!(!calls.iter().any(|c| matches!(c, Call::Transition { .. })));
}

#[tokio::test]
async fn first_failure_attaches_only_what_exists() {
    let (_tmp, locator) = evidence(true, false, false);
    let adapter = Arc::new(MockAdapter::new(Backend::Kanban, None));
    let adapters: Vec<Arc<dyn TrackerAdapter>> = vec![adapter.clone()];

    let reports = orchestrator(adapters, locator).dispatch(&failing_event()).await;
    assert_eq!(reports[0].attachments, 1);
}

#[tokio::test]
async fn repeated_failure_reopens_instead_of_creating() {
    let (_tmp, locator) = evidence(false, false, false);
    let existing = TrackedRecord::new("card-7", "Ongoing", Backend::Kanban);
    let adapter = Arc::new(MockAdapter::new(Backend::Kanban, Some(existing)));
    let adapters: Vec<Arc<dyn TrackerAdapter>> = vec![adapter.clone()];

    let reports = orchestrator(adapters, locator).dispatch(&failing_event()).await;

    let report = &reports[0];
    assert_eq!(report.action, Some(Action::ReopenAndComment));
    assert_eq!(report.record_id.as_deref(), Some("card-7"));

    let calls = adapter.calls();
    assert!(!calls.iter().any(|c| matches!(c, Call::Create { .. })));

    let comment_text = calls
        .iter()
        .find_map(|c| match c {
            Call::Comment { record, text } if record == "card-7" => Some(text.clone()),
            _ => None,
        })
        .expect("re-failure comment");
    assert!(comment_text.contains("RE-FAILURE"));
    assert!(comment_text.contains("AssertionError"));

    assert!(calls.contains(&Call::Transition {
        record: "card-7".to_string(),
        target: "Failed".to_string(),
    }));
}

#[tokio::test]
async fn repeated_failure_at_intake_skips_the_move() {
    let (_tmp, locator) = evidence(false, false, false);
    let existing = TrackedRecord::new("card-7", "Failed", Backend::Kanban);
    let adapter = Arc::new(MockAdapter::new(Backend::Kanban, Some(existing)));
    let adapters: Vec<Arc<dyn TrackerAdapter>> = vec![adapter.clone()];

    orchestrator(adapters, locator).dispatch(&failing_event()).await;

    let calls = adapter.calls();
    assert!(calls.iter().any(|c| matches!(c, Call::Comment { .. })));
    assert!(!calls.iter().any(|c| matches!(c, Call::Transition { .. })));
}

#[tokio::test]
async fn pass_with_open_record_closes_it() {
    let (_tmp, locator) = evidence(false, true, false);
    let existing = TrackedRecord::new("card-9", "Ongoing", Backend::Kanban);
    let adapter = Arc::new(MockAdapter::new(Backend::Kanban, Some(existing)));
    let adapters: Vec<Arc<dyn TrackerAdapter>> = vec![adapter.clone()];

    let reports = orchestrator(adapters, locator).dispatch(&passing_event()).await;

    let report = &reports[0];
    assert_eq!(report.action, Some(Action::CloseAndComment));
    assert_eq!(report.attachments, 1);

    let calls = adapter.calls();
    let video_file = calls
        .iter()
        .find_map(|c| match c {
            Call::Attach { record, file } if record == "card-9" => Some(file.clone()),
            _ => None,
        })
        .expect("video attached");
    assert!(video_file.ends_with(".webm"));

    let comment_text = calls
        .iter()
        .find_map(|c| match c {
            Call::Comment { text, .. } => Some(text.clone()),
            _ => None,
        })
        .expect("success comment");
    assert!(comment_text.contains("passing again"));
    assert!(comment_text.contains(&video_file));
    assert!(comment_text.contains("Moved to Done."));

    assert!(calls.contains(&Call::Transition {
        record: "card-9".to_string(),
        target: "Done".to_string(),
    }));
}

#[tokio::test]
async fn pass_with_no_record_makes_no_tracker_calls() {
    let (_tmp, locator) = evidence(true, true, true);
    let adapter = Arc::new(MockAdapter::new(Backend::Kanban, None));
    let adapters: Vec<Arc<dyn TrackerAdapter>> = vec![adapter.clone()];

    let reports = orchestrator(adapters, locator).dispatch(&passing_event()).await;

    assert_eq!(reports[0].action, Some(Action::NoOp));
    assert_eq!(adapter.calls(), vec![Call::Find]);
}

#[tokio::test]
async fn backend_failure_is_isolated_from_other_backends() {
    let (_tmp, locator) = evidence(false, false, false);
    let broken = Arc::new(MockAdapter::rejecting_search(Backend::Kanban));
    let healthy = Arc::new(MockAdapter::new(Backend::Workflow, None));
    let adapters: Vec<Arc<dyn TrackerAdapter>> = vec![broken.clone(), healthy.clone()];

    let reports = orchestrator(adapters, locator).dispatch(&failing_event()).await;

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].backend, Backend::Kanban);
    assert!(reports[0].action.is_none());
    assert!(reports[0].error.as_deref().unwrap_or_default().contains("query"));

    assert_eq!(reports[1].backend, Backend::Workflow);
    assert_eq!(reports[1].action, Some(Action::CreateNew));
    assert!(healthy
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Create { .. })));
}
