//! Error types for Gaze Insights

use thiserror::Error;

/// Errors that can occur while ingesting, persisting or exporting analytics
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Failed to parse event batch: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Unknown section: {0}")]
    UnknownSection(String),

    #[error("Snapshot store error: {0}")]
    Store(String),

    #[error("Aggregate state violates its invariants: {0}")]
    InconsistentState(String),
}
