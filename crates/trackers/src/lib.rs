//! DefectRelay Tracker Adapters
//!
//! The `TrackerAdapter` capability trait and its two backend
//! implementations: a Kanban-list-based board and a workflow-status-based
//! issue tracker. Adapters translate backend payloads into the shared
//! `TrackedRecord` shape so the dispatch logic stays backend-agnostic.

pub mod adapter;
pub mod kanban;
pub mod workflow;

pub use adapter::TrackerAdapter;
pub use kanban::KanbanClient;
pub use workflow::WorkflowClient;
