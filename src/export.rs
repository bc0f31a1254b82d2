//! Analytics export document

use crate::error::AnalyticsError;
use crate::session::SessionRecord;
use crate::types::{AggregateState, SectionId, SectionMetric};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Portable report of everything the aggregator has collected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
    pub export_date: DateTime<Utc>,
    pub sessions: Vec<SessionRecord>,
    pub metrics: ExportMetrics,
}

/// Aggregate figures in the export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetrics {
    pub total_sessions: usize,
    pub total_confusion_events: u64,
    pub total_help_triggered: u64,
    /// Percentage with two decimals, e.g. `"66.67%"`
    pub conversion_rate: String,
    pub section_metrics: BTreeMap<SectionId, SectionMetric>,
}

impl ExportReport {
    pub fn from_state(state: &AggregateState, export_date: DateTime<Utc>) -> Self {
        Self {
            export_date,
            sessions: state.sessions.as_slice().to_vec(),
            metrics: ExportMetrics {
                total_sessions: state.sessions.len(),
                total_confusion_events: state.total_confusion_events,
                total_help_triggered: state.total_help_triggered,
                conversion_rate: format_conversion_rate(
                    state.conversion_count,
                    state.sessions.len(),
                ),
                section_metrics: state.sections.clone(),
            },
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, AnalyticsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Suggested download file name
    pub fn file_name(&self) -> String {
        format!(
            "eye-tracking-report-{}.json",
            self.export_date.timestamp_millis()
        )
    }
}

/// Conversion rate as a percentage string, `"0%"` with no sessions
pub fn format_conversion_rate(conversions: u64, sessions: usize) -> String {
    if sessions == 0 {
        return "0%".to_string();
    }
    format!("{:.2}%", conversions as f64 / sessions as f64 * 100.0)
}
