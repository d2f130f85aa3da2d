//! Error types for DefectRelay

use thiserror::Error;

/// Result type alias using DefectRelay TrackerError
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors raised while talking to a defect-tracking backend.
///
/// `Query` marks a malformed or rejected search (a resolver defect) and is
/// distinct from a search that simply finds nothing (`Ok(None)`). A missing
/// local artifact file is likewise not an error: `attach` reports it as
/// `Ok(false)` so the remaining artifacts can still be attempted.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("invalid configuration for {backend} backend: {reason}")]
    Configuration { backend: String, reason: String },

    #[error("search query rejected by {backend} backend: {detail}")]
    Query { backend: String, detail: String },

    #[error("record creation rejected: {0}")]
    Creation(String),

    #[error("comment rejected for record {record}: {detail}")]
    Comment { record: String, detail: String },

    #[error("attachment rejected for record {record}: {detail}")]
    Attach { record: String, detail: String },

    #[error("transition to '{target}' rejected for record {record}: {detail}")]
    Transition {
        record: String,
        target: String,
        detail: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TrackerError {
    /// Short operation label for log context.
    pub fn operation(&self) -> &'static str {
        match self {
            TrackerError::Configuration { .. } => "configure",
            TrackerError::Query { .. } => "search",
            TrackerError::Creation(_) => "create",
            TrackerError::Comment { .. } => "comment",
            TrackerError::Attach { .. } => "attach",
            TrackerError::Transition { .. } => "transition",
            TrackerError::Http(_) => "http",
            TrackerError::Io(_) => "io",
            TrackerError::Serialization(_) => "serialize",
        }
    }

    /// True for the resolver-defect kind that must be logged at error
    /// severity even though the dispatch continues with other backends.
    pub fn is_query(&self) -> bool {
        matches!(self, TrackerError::Query { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_labels() {
        let err = TrackerError::Query {
            backend: "workflow".to_string(),
            detail: "bad JQL".to_string(),
        };
        assert_eq!(err.operation(), "search");
        assert!(err.is_query());

        let err = TrackerError::Creation("missing board".to_string());
        assert_eq!(err.operation(), "create");
        assert!(!err.is_query());
    }
}
