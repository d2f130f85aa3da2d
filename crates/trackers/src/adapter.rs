//! Tracker adapter abstraction.
//!
//! Both backends expose the same five operations; everything downstream of
//! the adapter works in terms of `TrackedRecord` and lane/status names and
//! never branches on backend-specific payloads.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::path::Path;

use relay_common::{Backend, Result, TestIdentity, TrackedRecord};

/// Capability interface over a defect-tracking backend.
///
/// Side effects are non-transactional: a crash between `create_record` and
/// `attach_file` leaves a record with no evidence, which is accepted and not
/// auto-retried.
#[async_trait]
pub trait TrackerAdapter: Send + Sync {
    /// Which backend this adapter talks to.
    fn backend(&self) -> Backend;

    /// Lane/status new and reopened failures belong in.
    fn intake_state(&self) -> &str;

    /// Terminal lane/status verified fixes are moved to.
    fn terminal_state(&self) -> &str;

    /// Find the open (non-terminal) record for an identity, if any.
    ///
    /// A rejected search query is a `Query` error; finding nothing is the
    /// normal `Ok(None)` outcome.
    async fn find_open_record(&self, identity: &TestIdentity) -> Result<Option<TrackedRecord>>;

    /// Create a record at the intake lane/status.
    async fn create_record(&self, title: &str, body: &str) -> Result<TrackedRecord>;

    /// Append a comment. A record that no longer exists remotely is logged
    /// and ignored, since state may have changed out-of-band.
    async fn comment(&self, record: &TrackedRecord, text: &str) -> Result<()>;

    /// Attach a local file. Returns `Ok(false)` when the file is absent so
    /// the remaining artifacts can still be attempted.
    async fn attach_file(&self, record: &TrackedRecord, path: &Path) -> Result<bool>;

    /// Move the record to another lane/status. Returns `Ok(false)` when the
    /// target is not reachable from the record's current state.
    async fn transition(&self, record: &TrackedRecord, target: &str) -> Result<bool>;
}

/// How to proceed after a search request came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SearchDisposition {
    /// Parse the response body.
    Parse,
    /// The query itself was rejected, pointing at a resolver defect.
    QueryRejected,
    /// Transport-level failure; surface it.
    Failed,
}

pub(crate) fn search_disposition(status: StatusCode) -> SearchDisposition {
    if status.is_success() {
        SearchDisposition::Parse
    } else if status == StatusCode::BAD_REQUEST {
        SearchDisposition::QueryRejected
    } else {
        SearchDisposition::Failed
    }
}

/// How to proceed after a comment request came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommentDisposition {
    Ok,
    /// The record disappeared out-of-band; log and carry on.
    MissingRemotely,
    Rejected,
}

pub(crate) fn comment_disposition(status: StatusCode) -> CommentDisposition {
    if status.is_success() {
        CommentDisposition::Ok
    } else if status == StatusCode::NOT_FOUND {
        CommentDisposition::MissingRemotely
    } else {
        CommentDisposition::Rejected
    }
}

/// Status line plus response body, for error details.
pub(crate) async fn response_detail(response: reqwest::Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(body) if !body.is_empty() => format!("HTTP {}: {}", status, body),
        _ => format!("HTTP {}", status),
    }
}
