//! Record title, body and comment rendering.
//!
//! Markdown-ish plain text accepted by both backends; the Workflow adapter
//! wraps it into its rich-text document format on the wire.

use chrono::Local;

use relay_common::TestIdentity;

use crate::event::OutcomeEvent;

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Title for a newly created record. Carries every identity token so the
/// dedup search finds the record again.
pub(crate) fn failure_title(identity: &TestIdentity, clean_name: &str) -> String {
    format!(
        "FAILED: {} - {} - ({})",
        identity.title_fragment(),
        clean_name,
        timestamp()
    )
}

fn steps_section(steps: &[String], failed: bool) -> String {
    let mut section = String::from("## Executed steps\n\n");
    if steps.is_empty() {
        section.push_str("No steps were recorded.\n");
        return section;
    }
    let marker = if failed { "-" } else { "✓" };
    for step in steps {
        section.push_str(&format!("{} {}\n", marker, step));
    }
    if failed {
        section.push_str("\nAssertion failed at the last step; see the attached trace and evidence.\n");
    }
    section
}

fn failure_summary(failure_detail: Option<&str>) -> String {
    format!(
        "## Failure summary\n\n```\n{}\n```\n",
        failure_detail.unwrap_or("no failure detail captured")
    )
}

/// Full description for a newly created record.
pub(crate) fn failure_body(identity: &TestIdentity, event: &OutcomeEvent) -> String {
    let mut body = String::from("## Failure details\n\n");
    body.push_str(&format!("**Test case:** {}\n", identity.test_case_id));
    body.push_str(&format!("**Run id:** `{}`\n", event.test_id));
    body.push_str(&format!("**Environment:** {}\n", identity.environment_token()));
    body.push_str(&format!("**Target:** `{}`\n\n", identity.execution_target));
    body.push_str(&steps_section(&event.steps, true));
    body.push('\n');
    body.push_str(&failure_summary(event.failure_detail.as_deref()));
    body.push_str(&format!("\n---\nReport generated: {}\n", timestamp()));
    body
}

/// Comment appended when an already-tracked defect fails again.
pub(crate) fn refail_comment(identity: &TestIdentity, event: &OutcomeEvent) -> String {
    let mut comment = format!(
        "RE-FAILURE detected ({}) in environment {} / {}.\n\n",
        timestamp(),
        identity.environment_token(),
        identity.execution_target
    );
    comment.push_str(&steps_section(&event.steps, true));
    comment.push('\n');
    comment.push_str(&failure_summary(event.failure_detail.as_deref()));
    comment.push_str("\n--- See the original description for full test details ---\n");
    comment
}

/// Comment appended when a tracked defect passes again and is being closed.
pub(crate) fn success_comment(
    identity: &TestIdentity,
    event: &OutcomeEvent,
    video_file: Option<&str>,
    terminal_state: &str,
) -> String {
    let mut comment = format!(
        "Test passing again ({}).\n\n**Test case:** {}\n",
        timestamp(),
        identity.test_case_id
    );
    if let Some(name) = video_file {
        comment.push_str(&format!("**Video evidence attached:** `{}`\n", name));
    }
    comment.push('\n');
    comment.push_str(&steps_section(&event.steps, false));
    comment.push_str(&format!("\nMoved to {}.\n", terminal_state));
    comment
}
