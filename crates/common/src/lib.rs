//! DefectRelay Common Library
//!
//! Shared types, configuration and utilities for the DefectRelay crates.

pub mod config;
pub mod error;
pub mod evidence;
pub mod steps;
pub mod types;

// Re-export commonly used types
pub use config::{EvidenceConfig, KanbanConfig, RelayConfig, WorkflowConfig};
pub use error::{Result, TrackerError};
pub use evidence::ArtifactLocator;
pub use steps::StepRecorder;
pub use types::{Backend, EvidenceSet, ExecutionOutcome, TestIdentity, TrackedRecord};

/// DefectRelay version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
