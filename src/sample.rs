//! Demonstration dataset
//!
//! Installs a small, plausible set of checkout metrics so dashboards and
//! exports can be shown without a live tracker.

use crate::aggregator::MetricsAggregator;
use crate::error::AnalyticsError;
use crate::session::SessionRecord;
use crate::store::SnapshotStore;
use crate::types::{AggregateState, SectionId, SectionMetric, Severity};
use chrono::{Duration, Utc};
use rand::Rng;

/// Number of random gaze points seeded for the heatmap
pub const SAMPLE_GAZE_POINTS: usize = 200;

/// (duration seconds, confusion events, help prompts, minutes ago)
///
/// Counts are per session. Records store the running totals at completion
/// (2/5/6 confusion events, 1/3/4 help prompts), like live sessions do.
const SAMPLE_SESSIONS: [(f64, u64, u64, i64); 3] = [(45.0, 2, 1, 60), (52.0, 3, 2, 30), (38.0, 1, 1, 15)];

/// (section, visits, total dwell ms, confusion, help)
const SAMPLE_SECTIONS: [(SectionId, u64, u64, u64, u64); 4] = [
    (SectionId::Items, 3, 12_000, 0, 0),
    (SectionId::Summary, 3, 8_000, 1, 1),
    (SectionId::PaymentMethods, 3, 15_000, 2, 1),
    (SectionId::CheckoutDetails, 3, 25_000, 3, 2),
];

/// Build the demonstration aggregate
pub fn sample_state() -> AggregateState {
    let mut state = AggregateState::default();

    for (id, visits, total_dwell_ms, confusion_count, help_triggered_count) in SAMPLE_SECTIONS {
        *state.section_mut(id) = SectionMetric {
            visits,
            total_dwell_ms,
            confusion_count,
            help_triggered_count,
        };
    }

    let now = Utc::now();
    for (duration, confusion, help, minutes_ago) in SAMPLE_SESSIONS {
        state.total_confusion_events += confusion;
        state.total_help_triggered += help;

        let mut record = SessionRecord::new(
            duration,
            state.total_confusion_events,
            state.total_help_triggered,
            true,
        );
        record.completed_at = now - Duration::minutes(minutes_ago);
        state.sessions.append(record);
        state.conversion_count += 1;
    }

    state
}

/// Replace the aggregator's data with the demonstration dataset
///
/// Gaze points are drawn uniformly over the configured heatmap canvas.
pub fn seed<S, R>(aggregator: &mut MetricsAggregator<S>, rng: &mut R) -> Result<(), AnalyticsError>
where
    S: SnapshotStore,
    R: Rng + ?Sized,
{
    aggregator.load_state(sample_state())?;

    let canvas = aggregator.config().heatmap;
    let width = canvas.width.max(1) as f64;
    let height = canvas.height.max(1) as f64;

    aggregator.clear_gaze_points();
    for _ in 0..SAMPLE_GAZE_POINTS {
        let x = rng.gen_range(0.0..width);
        let y = rng.gen_range(0.0..height);
        aggregator.record_gaze(x, y);
    }

    aggregator
        .log_mut()
        .push("Sample Data Loaded", "System", Severity::Info);
    log::info!("seeded sample dataset");
    Ok(())
}
