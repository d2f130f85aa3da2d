//! Step trace recording
//!
//! Page objects and interaction helpers hold a `StepRecorder` clone and call
//! `record` as they act; teardown drains the finished list into the outcome
//! event. The recorder is handed to the UI-interaction layer directly,
//! never looked up by name.

use chrono::Local;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Ordered, timestamped trace of the actions one test performed.
///
/// Cloning is cheap and clones share the same underlying list.
#[derive(Debug, Clone, Default)]
pub struct StepRecorder {
    steps: Arc<Mutex<Vec<String>>>,
}

impl StepRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step description, stamped with its sequence number and the
    /// wall-clock time it was recorded.
    pub fn record(&self, description: impl AsRef<str>) {
        let description = description.as_ref();
        let mut steps = self.steps.lock();
        let entry = format!(
            "[{}] [{}] {}",
            steps.len() + 1,
            Local::now().format("%H:%M:%S"),
            description
        );
        debug!("step recorded: {}", entry);
        steps.push(entry);
    }

    /// Number of steps recorded so far.
    pub fn len(&self) -> usize {
        self.steps.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.lock().is_empty()
    }

    /// Snapshot of the trace so far, in recording order.
    pub fn snapshot(&self) -> Vec<String> {
        self.steps.lock().clone()
    }

    /// Drain the finished trace at teardown.
    pub fn finish(&self) -> Vec<String> {
        std::mem::take(&mut *self.steps.lock())
    }
}
