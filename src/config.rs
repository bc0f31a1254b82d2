//! Runtime configuration
//!
//! Every field has a default, so a config file only needs the keys it changes.

use crate::activity::DEFAULT_LOG_CAPACITY;
use crate::error::AnalyticsError;
use crate::heatmap::HeatmapConfig;
use serde::{Deserialize, Serialize};

/// Store key holding the aggregate snapshot
pub const DEFAULT_STATE_KEY: &str = "eyeTrackingAnalytics";

/// Store key holding raw events buffered by the checkout page
pub const DEFAULT_EVENTS_KEY: &str = "eyeTrackingEvents";

/// Analytics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Key under which the aggregate snapshot is persisted
    pub state_key: String,
    /// Key under which a pending batch of raw events may be waiting
    pub events_key: String,
    /// Number of activity log entries kept for display
    pub log_capacity: usize,
    /// Heatmap canvas and splat radius
    pub heatmap: HeatmapConfig,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            state_key: DEFAULT_STATE_KEY.to_string(),
            events_key: DEFAULT_EVENTS_KEY.to_string(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            heatmap: HeatmapConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Load configuration from JSON; missing keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self, AnalyticsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, AnalyticsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
