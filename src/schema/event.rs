//! Inbound tracking event schema
//!
//! Events are JSON objects carrying a `type` discriminator and a kind-specific
//! payload. Field names follow what the checkout page emits (`dwellTime`,
//! `completionTime`, `conversationCompleted`); the spelled-out names
//! (`dwellMs`, `durationSeconds`, `completed`) are accepted as aliases.

use crate::types::SectionId;
use serde::{Deserialize, Serialize};

/// One inbound event from the gaze tracker or the checkout page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TrackingEvent {
    /// Raw gaze coordinate in canvas pixels
    GazePoint { x: f64, y: f64 },

    /// Time spent looking at a section
    #[serde(rename = "dwellTime", alias = "dwell")]
    Dwell {
        section: String,
        #[serde(rename = "dwellTime", alias = "dwellMs")]
        dwell_ms: f64,
    },

    /// Confusion detected while the user looked at a section
    #[serde(rename = "confusionEvent")]
    Confusion { section: String },

    /// A help prompt was shown for a section
    HelpTriggered {
        section: String,
        /// Dwell time before the prompt appeared; informational only
        #[serde(
            rename = "beforeDwellTime",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        before_dwell_ms: Option<f64>,
    },

    /// The checkout session finished, with or without a purchase
    SessionComplete {
        #[serde(
            rename = "completionTime",
            alias = "durationSeconds",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        duration_seconds: Option<f64>,
        #[serde(
            rename = "conversationCompleted",
            alias = "completed",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        completed: Option<bool>,
    },

    /// Any `type` this version does not understand
    #[serde(other)]
    Unknown,
}

impl TrackingEvent {
    /// Create a gaze point event
    pub fn gaze(x: f64, y: f64) -> Self {
        TrackingEvent::GazePoint { x, y }
    }

    /// Create a dwell event
    pub fn dwell(section: impl Into<String>, dwell_ms: f64) -> Self {
        TrackingEvent::Dwell {
            section: section.into(),
            dwell_ms,
        }
    }

    /// Create a confusion event
    pub fn confusion(section: impl Into<String>) -> Self {
        TrackingEvent::Confusion {
            section: section.into(),
        }
    }

    /// Create a help-triggered event
    pub fn help(section: impl Into<String>) -> Self {
        TrackingEvent::HelpTriggered {
            section: section.into(),
            before_dwell_ms: None,
        }
    }

    /// Create a session-complete event
    pub fn session_complete(duration_seconds: f64, completed: bool) -> Self {
        TrackingEvent::SessionComplete {
            duration_seconds: Some(duration_seconds),
            completed: Some(completed),
        }
    }

    /// Wire name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            TrackingEvent::GazePoint { .. } => "gazePoint",
            TrackingEvent::Dwell { .. } => "dwellTime",
            TrackingEvent::Confusion { .. } => "confusionEvent",
            TrackingEvent::HelpTriggered { .. } => "helpTriggered",
            TrackingEvent::SessionComplete { .. } => "sessionComplete",
            TrackingEvent::Unknown => "unknown",
        }
    }

    /// Whether applying this event changes the persisted aggregate
    pub fn is_mutating(&self) -> bool {
        !matches!(self, TrackingEvent::GazePoint { .. } | TrackingEvent::Unknown)
    }

    /// Validate the event payload
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            TrackingEvent::GazePoint { x, y } => {
                require_finite("x", *x)?;
                require_finite("y", *y)
            }
            TrackingEvent::Dwell { section, dwell_ms } => {
                parse_section(section)?;
                require_non_negative("dwellTime", *dwell_ms)
            }
            TrackingEvent::Confusion { section } | TrackingEvent::HelpTriggered { section, .. } => {
                parse_section(section).map(|_| ())
            }
            TrackingEvent::SessionComplete {
                duration_seconds, ..
            } => match duration_seconds {
                Some(seconds) => require_non_negative("completionTime", *seconds),
                None => Ok(()),
            },
            TrackingEvent::Unknown => Err(ValidationError::UnknownKind),
        }
    }
}

/// Resolve a wire section name against the tracked sections
pub fn parse_section(section: &str) -> Result<SectionId, ValidationError> {
    section
        .parse::<SectionId>()
        .map_err(|_| ValidationError::UnknownSection(section.to_string()))
}

fn require_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinite { field })
    }
}

fn require_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    require_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(())
}

/// Validation errors for tracking events
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Malformed event: {0}")]
    Malformed(String),

    #[error("Unknown event type")]
    UnknownKind,

    #[error("Unknown section: {0}")]
    UnknownSection(String),

    #[error("Field {field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("Field {field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
}
