//! Core data types
//!
//! This module defines the tracked sections, per-section metrics, the aggregate
//! state that the aggregator owns, gaze points and activity log entries.

use crate::error::AnalyticsError;
use crate::session::SessionLog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Page sections whose attention is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionId {
    Items,
    Summary,
    PaymentMethods,
    CheckoutDetails,
}

impl SectionId {
    /// Every tracked section, in dashboard order
    pub const ALL: [SectionId; 4] = [
        SectionId::Items,
        SectionId::Summary,
        SectionId::PaymentMethods,
        SectionId::CheckoutDetails,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionId::Items => "items",
            SectionId::Summary => "summary",
            SectionId::PaymentMethods => "paymentMethods",
            SectionId::CheckoutDetails => "checkoutDetails",
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionId {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionId::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| AnalyticsError::UnknownSection(s.to_string()))
    }
}

/// Running counters for one section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionMetric {
    /// Number of dwell events recorded for the section
    pub visits: u64,
    /// Sum of dwell durations in milliseconds
    pub total_dwell_ms: u64,
    /// Confusion detections attributed to the section
    pub confusion_count: u64,
    /// Help prompts shown for the section
    pub help_triggered_count: u64,
}

/// Aggregate behavioral state persisted between runs.
///
/// Invariants (checked by [`AggregateState::check_invariants`]):
/// - every [`SectionId`] has a metric record
/// - `total_confusion_events` equals the sum of per-section confusion counts
/// - `total_help_triggered` equals the sum of per-section help counts
/// - `conversion_count <= sessions.len()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateState {
    pub sections: BTreeMap<SectionId, SectionMetric>,
    pub total_confusion_events: u64,
    pub total_help_triggered: u64,
    pub conversion_count: u64,
    pub sessions: SessionLog,
}

impl Default for AggregateState {
    fn default() -> Self {
        Self {
            sections: SectionId::ALL
                .into_iter()
                .map(|id| (id, SectionMetric::default()))
                .collect(),
            total_confusion_events: 0,
            total_help_triggered: 0,
            conversion_count: 0,
            sessions: SessionLog::default(),
        }
    }
}

impl AggregateState {
    /// Metrics for a section (all zero if the record is somehow absent)
    pub fn section(&self, id: SectionId) -> SectionMetric {
        self.sections.get(&id).copied().unwrap_or_default()
    }

    pub(crate) fn section_mut(&mut self, id: SectionId) -> &mut SectionMetric {
        self.sections.entry(id).or_default()
    }

    /// Insert zeroed records for any section missing from the map
    pub fn fill_missing_sections(&mut self) {
        for id in SectionId::ALL {
            self.sections.entry(id).or_default();
        }
    }

    /// Sum of confusion counts across all sections, saturating at `u64::MAX`
    pub fn section_confusion_total(&self) -> u64 {
        self.checked_section_sum(|m| m.confusion_count)
            .unwrap_or(u64::MAX)
    }

    /// Sum of help counts across all sections, saturating at `u64::MAX`
    pub fn section_help_total(&self) -> u64 {
        self.checked_section_sum(|m| m.help_triggered_count)
            .unwrap_or(u64::MAX)
    }

    fn checked_section_sum(&self, count: impl Fn(&SectionMetric) -> u64) -> Option<u64> {
        self.sections
            .values()
            .try_fold(0u64, |acc, metric| acc.checked_add(count(metric)))
    }

    /// Verify the aggregate invariants
    pub fn check_invariants(&self) -> Result<(), AnalyticsError> {
        if let Some(missing) = SectionId::ALL
            .into_iter()
            .find(|id| !self.sections.contains_key(id))
        {
            return Err(AnalyticsError::InconsistentState(format!(
                "missing section record: {missing}"
            )));
        }

        let confusion = self
            .checked_section_sum(|m| m.confusion_count)
            .ok_or_else(|| {
                AnalyticsError::InconsistentState("section confusion counts overflow".to_string())
            })?;
        if confusion != self.total_confusion_events {
            return Err(AnalyticsError::InconsistentState(format!(
                "total confusion {} != section sum {}",
                self.total_confusion_events, confusion
            )));
        }

        let help = self
            .checked_section_sum(|m| m.help_triggered_count)
            .ok_or_else(|| {
                AnalyticsError::InconsistentState("section help counts overflow".to_string())
            })?;
        if help != self.total_help_triggered {
            return Err(AnalyticsError::InconsistentState(format!(
                "total help {} != section sum {}",
                self.total_help_triggered, help
            )));
        }

        if self.conversion_count > self.sessions.len() as u64 {
            return Err(AnalyticsError::InconsistentState(format!(
                "{} conversions for {} sessions",
                self.conversion_count,
                self.sessions.len()
            )));
        }

        Ok(())
    }

    pub fn is_consistent(&self) -> bool {
        self.check_invariants().is_ok()
    }
}

/// A single observed gaze coordinate in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GazePoint {
    pub x: f64,
    pub y: f64,
    pub captured_at: DateTime<Utc>,
}

impl GazePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            captured_at: Utc::now(),
        }
    }
}

/// Severity of an activity log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Human-visible activity log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub action: String,
    pub section: String,
    pub severity: Severity,
    pub at: DateTime<Utc>,
}
