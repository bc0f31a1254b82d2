//! Read-only dashboard views
//!
//! Everything here is derived from an [`AggregateState`] on demand and never
//! mutates it. Degenerate inputs (no sessions, no visits, no confusion) map to
//! explicit sentinels instead of dividing by zero.

use crate::types::{AggregateState, SectionId, SectionMetric};
use serde::Serialize;

/// Share of confusion assumed to disappear once help prompts are shown.
///
/// This is a fixed presentation heuristic with no measured derivation. It is
/// used only for the projected "after help" confusion figure and must not be
/// read as an observed effect.
pub const ASSUMED_CONFUSION_REDUCTION: f64 = 0.3;

/// Everything the summary dashboard displays
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub session_count: usize,
    /// Mean session duration in seconds; `None` when there are no sessions
    pub average_session_seconds: Option<f64>,
    pub total_confusion_events: u64,
    pub total_help_triggered: u64,
    /// Conversions per session in `[0, 1]`; 0 when there are no sessions
    pub conversion_rate: f64,
    /// `conversion_rate` as a rounded whole percentage
    pub conversion_percent: u32,
    pub sections: Vec<SectionRow>,
    pub help_impact: HelpImpact,
}

/// One row of the per-section table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionRow {
    pub section: SectionId,
    pub visits: u64,
    pub total_dwell_ms: u64,
    /// `None` when the section was never visited
    pub average_dwell_ms: Option<f64>,
    pub confusion_count: u64,
    pub help_triggered_count: u64,
    pub help_shown: bool,
    /// Dwell relative to the most-viewed section, in `[0, 1]`
    pub dwell_share: f64,
}

/// Help-prompt impact panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HelpImpact {
    pub help_triggered: u64,
    pub confusion_total: u64,
    /// Sections that saw at least one confusion event
    pub sections_with_confusion: usize,
    /// Help prompts per confusion event, capped at 1.0
    pub improvement_ratio: f64,
    /// Projected confusion if [`ASSUMED_CONFUSION_REDUCTION`] held
    pub projected_confusion_after_help: u64,
    pub verdict: HelpVerdict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HelpVerdict {
    /// More than half of confusion events were answered with help
    Significant,
    /// Some help was shown
    Assisted,
    NoHelpYet,
}

impl HelpVerdict {
    pub fn message(&self) -> &'static str {
        match self {
            HelpVerdict::Significant => "Help feature significantly improved user experience",
            HelpVerdict::Assisted => "Help feature has provided assistance to users",
            HelpVerdict::NoHelpYet => "No help events recorded yet",
        }
    }
}

impl DashboardView {
    pub fn from_state(state: &AggregateState) -> Self {
        let conversion_rate = conversion_rate(state);
        let max_dwell = state
            .sections
            .values()
            .map(|m| m.total_dwell_ms)
            .max()
            .unwrap_or(0)
            .max(1);

        let sections = SectionId::ALL
            .into_iter()
            .map(|id| {
                let metric = state.section(id);
                SectionRow {
                    section: id,
                    visits: metric.visits,
                    total_dwell_ms: metric.total_dwell_ms,
                    average_dwell_ms: average_dwell_ms(&metric),
                    confusion_count: metric.confusion_count,
                    help_triggered_count: metric.help_triggered_count,
                    help_shown: metric.help_triggered_count > 0,
                    dwell_share: metric.total_dwell_ms as f64 / max_dwell as f64,
                }
            })
            .collect();

        Self {
            session_count: state.sessions.len(),
            average_session_seconds: average_session_seconds(state),
            total_confusion_events: state.total_confusion_events,
            total_help_triggered: state.total_help_triggered,
            conversion_rate,
            conversion_percent: (conversion_rate * 100.0).round() as u32,
            sections,
            help_impact: HelpImpact::from_state(state),
        }
    }
}

impl HelpImpact {
    pub fn from_state(state: &AggregateState) -> Self {
        let confusion_total = state.section_confusion_total();
        let help_triggered = state.total_help_triggered;
        let raw = help_triggered as f64 / confusion_total.max(1) as f64;
        let percent = (raw * 100.0).round();

        let verdict = if percent > 50.0 {
            HelpVerdict::Significant
        } else if percent > 0.0 {
            HelpVerdict::Assisted
        } else {
            HelpVerdict::NoHelpYet
        };

        let reduced = (confusion_total as f64 * ASSUMED_CONFUSION_REDUCTION).round() as u64;

        Self {
            help_triggered,
            confusion_total,
            sections_with_confusion: state
                .sections
                .values()
                .filter(|m| m.confusion_count > 0)
                .count(),
            improvement_ratio: raw.min(1.0),
            projected_confusion_after_help: confusion_total.saturating_sub(reduced),
            verdict,
        }
    }
}

/// Mean session duration in seconds, `None` with no sessions
pub fn average_session_seconds(state: &AggregateState) -> Option<f64> {
    state.sessions.mean_duration_seconds()
}

/// Conversions per recorded session, 0 with no sessions
pub fn conversion_rate(state: &AggregateState) -> f64 {
    match state.sessions.len() {
        0 => 0.0,
        n => state.conversion_count as f64 / n as f64,
    }
}

/// Mean dwell per visit in milliseconds, `None` for an unvisited section
pub fn average_dwell_ms(metric: &SectionMetric) -> Option<f64> {
    if metric.visits == 0 {
        return None;
    }
    Some(metric.total_dwell_ms as f64 / metric.visits as f64)
}
