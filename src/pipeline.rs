//! Pipeline orchestration
//!
//! One-shot entry points that take a raw event batch, replay it into a fresh
//! in-memory aggregator and hand back a finished artifact. Use
//! [`MetricsAggregator`] directly when state has to survive between calls.

use crate::aggregator::{MetricsAggregator, ReplaySummary};
use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::heatmap::RgbaBuffer;
use crate::schema::{DecodedRecord, EventBatchAdapter};
use crate::store::MemoryStore;

/// Convert a JSON array of tracking events into a pretty JSON export report.
///
/// # Example
/// ```
/// let report = gaze_insights::events_to_report(
///     r#"[{"type": "sessionComplete", "completionTime": 30, "conversationCompleted": true}]"#,
/// )?;
/// assert!(report.contains("\"totalSessions\": 1"));
/// # Ok::<(), gaze_insights::AnalyticsError>(())
/// ```
pub fn events_to_report(raw_json: &str) -> Result<String, AnalyticsError> {
    let records = EventBatchAdapter::decode_array(raw_json)?;
    let (mut aggregator, _) = replay_fresh(records, AnalyticsConfig::default());
    aggregator.export().to_json_pretty()
}

/// Same as [`events_to_report`] for NDJSON input (one event per line)
pub fn ndjson_to_report(ndjson: &str) -> Result<String, AnalyticsError> {
    let records = EventBatchAdapter::decode_ndjson(ndjson);
    let (mut aggregator, _) = replay_fresh(records, AnalyticsConfig::default());
    aggregator.export().to_json_pretty()
}

/// Render the gaze points found in a JSON array batch
pub fn events_to_heatmap(
    raw_json: &str,
    config: &AnalyticsConfig,
) -> Result<RgbaBuffer, AnalyticsError> {
    let records = EventBatchAdapter::decode_array(raw_json)?;
    let (aggregator, _) = replay_fresh(records, config.clone());
    Ok(aggregator.render_heatmap())
}

fn replay_fresh(
    records: Vec<DecodedRecord>,
    config: AnalyticsConfig,
) -> (MetricsAggregator<MemoryStore>, ReplaySummary) {
    let mut aggregator = MetricsAggregator::with_config(MemoryStore::new(), config);
    let summary = aggregator.replay(records);
    (aggregator, summary)
}
