//! Metrics aggregator
//!
//! Single owner of the persisted [`AggregateState`]. Every mutating operation
//! persists a fresh snapshot through the injected [`SnapshotStore`]; store
//! failures are logged and never surface to the caller.

use crate::activity::ActivityLog;
use crate::config::AnalyticsConfig;
use crate::dashboard::DashboardView;
use crate::error::AnalyticsError;
use crate::export::ExportReport;
use crate::heatmap::{HeatmapEngine, RgbaBuffer};
use crate::schema::{parse_section, DecodedRecord, EventBatchAdapter, TrackingEvent, ValidationError};
use crate::session::SessionRecord;
use crate::snapshot::SnapshotCodec;
use crate::store::SnapshotStore;
use crate::types::{AggregateState, GazePoint, SectionId, Severity};
use chrono::Utc;
use serde::Serialize;

/// Outcome of applying one tracking event
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// The aggregate changed and was persisted
    Recorded,
    /// A gaze point was buffered for the heatmap
    Buffered,
    /// The event was rejected and nothing changed
    Skipped(ValidationError),
}

impl Applied {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Applied::Skipped(_))
    }
}

/// Counts from a bulk replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub applied: usize,
    pub skipped: usize,
}

impl ReplaySummary {
    pub fn total(&self) -> usize {
        self.applied + self.skipped
    }
}

/// Stateful aggregator for checkout tracking events
pub struct MetricsAggregator<S: SnapshotStore> {
    config: AnalyticsConfig,
    state: AggregateState,
    gaze_points: Vec<GazePoint>,
    log: ActivityLog,
    store: S,
}

impl<S: SnapshotStore> MetricsAggregator<S> {
    /// Open an aggregator with default configuration
    pub fn open(store: S) -> Self {
        Self::with_config(store, AnalyticsConfig::default())
    }

    /// Open an aggregator, restoring any snapshot found in the store
    pub fn with_config(store: S, config: AnalyticsConfig) -> Self {
        let bytes = match store.get(&config.state_key) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("could not read snapshot '{}': {e}", config.state_key);
                None
            }
        };
        let state = SnapshotCodec::decode(bytes.as_deref());
        log::debug!(
            "opened aggregator with {} sessions on record",
            state.sessions.len()
        );

        Self {
            log: ActivityLog::new(config.log_capacity),
            config,
            state,
            gaze_points: Vec::new(),
            store,
        }
    }

    pub fn state(&self) -> &AggregateState {
        &self.state
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.log
    }

    pub fn gaze_points(&self) -> &[GazePoint] {
        &self.gaze_points
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Buffer a gaze sample; non-finite coordinates are rejected
    pub fn record_gaze(&mut self, x: f64, y: f64) -> bool {
        self.record_gaze_point(GazePoint::new(x, y))
    }

    pub fn record_gaze_point(&mut self, point: GazePoint) -> bool {
        if !(point.x.is_finite() && point.y.is_finite()) {
            log::debug!("dropping non-finite gaze point ({}, {})", point.x, point.y);
            return false;
        }
        self.gaze_points.push(point);
        true
    }

    pub fn clear_gaze_points(&mut self) {
        self.gaze_points.clear();
    }

    /// Count one visit to `section` lasting `dwell_ms`
    pub fn record_dwell(&mut self, section: SectionId, dwell_ms: u64) {
        let metric = self.state.section_mut(section);
        metric.visits = metric.visits.saturating_add(1);
        metric.total_dwell_ms = metric.total_dwell_ms.saturating_add(dwell_ms);
        self.persist();
    }

    /// Count a confusion event; saturated counters are left unchanged
    pub fn record_confusion(&mut self, section: SectionId) {
        let Some((count, total)) = increment_pair(
            self.state.section(section).confusion_count,
            self.state.total_confusion_events,
        ) else {
            log::warn!("confusion counters for {section} are saturated");
            return;
        };
        self.state.section_mut(section).confusion_count = count;
        self.state.total_confusion_events = total;
        self.log
            .push("Confusion Detected", section.as_str(), Severity::Warning);
        self.persist();
    }

    /// Count a help prompt; saturated counters are left unchanged
    pub fn record_help_triggered(&mut self, section: SectionId) {
        let Some((count, total)) = increment_pair(
            self.state.section(section).help_triggered_count,
            self.state.total_help_triggered,
        ) else {
            log::warn!("help counters for {section} are saturated");
            return;
        };
        self.state.section_mut(section).help_triggered_count = count;
        self.state.total_help_triggered = total;
        self.log.push("Help Shown", section.as_str(), Severity::Success);
        self.persist();
    }

    /// Close a session, capturing the current global confusion and help totals
    ///
    /// Negative or non-finite durations are recorded as 0.
    pub fn record_session_complete(&mut self, duration_seconds: f64, completed: bool) -> SessionRecord {
        let duration_seconds = if duration_seconds.is_finite() && duration_seconds >= 0.0 {
            duration_seconds
        } else {
            0.0
        };

        let record = SessionRecord::new(
            duration_seconds,
            self.state.total_confusion_events,
            self.state.total_help_triggered,
            completed,
        );
        self.state.sessions.append(record.clone());
        if completed {
            self.state.conversion_count = self.state.conversion_count.saturating_add(1);
        }

        self.log.push(
            "Session Complete",
            format!("{duration_seconds}s"),
            Severity::Success,
        );
        self.persist();
        record
    }

    /// Discard everything collected so far
    pub fn reset(&mut self) {
        self.state = AggregateState::default();
        self.gaze_points.clear();
        self.log.clear();
        self.log.push("Data Reset", "System", Severity::Warning);
        self.persist();
        log::info!("analytics data reset");
    }

    /// Replace the aggregate with a prepared state
    ///
    /// The state must satisfy its invariants; gaze points and the activity log
    /// are left untouched.
    pub fn load_state(&mut self, mut state: AggregateState) -> Result<(), AnalyticsError> {
        state.fill_missing_sections();
        state.check_invariants()?;
        self.state = state;
        self.persist();
        Ok(())
    }

    /// Validate and dispatch one tracking event
    pub fn apply(&mut self, event: TrackingEvent) -> Applied {
        if let Err(e) = event.validate() {
            log::debug!("skipping {} event: {e}", event.kind());
            return Applied::Skipped(e);
        }

        match self.dispatch(event) {
            Ok(applied) => applied,
            Err(e) => {
                log::debug!("skipping event: {e}");
                Applied::Skipped(e)
            }
        }
    }

    fn dispatch(&mut self, event: TrackingEvent) -> Result<Applied, ValidationError> {
        match event {
            TrackingEvent::GazePoint { x, y } => {
                self.record_gaze(x, y);
                return Ok(Applied::Buffered);
            }
            TrackingEvent::Dwell { section, dwell_ms } => {
                self.record_dwell(parse_section(&section)?, dwell_ms.round() as u64);
            }
            TrackingEvent::Confusion { section } => {
                self.record_confusion(parse_section(&section)?);
            }
            TrackingEvent::HelpTriggered { section, .. } => {
                self.record_help_triggered(parse_section(&section)?);
            }
            TrackingEvent::SessionComplete {
                duration_seconds,
                completed,
            } => {
                self.record_session_complete(
                    duration_seconds.unwrap_or(0.0),
                    completed.unwrap_or(false),
                );
            }
            TrackingEvent::Unknown => return Err(ValidationError::UnknownKind),
        }
        Ok(Applied::Recorded)
    }

    /// Apply a batch of decoded records in order, skipping bad ones
    pub fn replay<I>(&mut self, records: I) -> ReplaySummary
    where
        I: IntoIterator<Item = DecodedRecord>,
    {
        let mut summary = ReplaySummary::default();
        for (index, record) in records.into_iter().enumerate() {
            let applied = match record {
                Ok(event) => self.apply(event),
                Err(e) => {
                    log::debug!("skipping record {index}: {e}");
                    Applied::Skipped(e)
                }
            };

            if applied.is_skipped() {
                summary.skipped += 1;
            } else {
                summary.applied += 1;
            }
        }

        log::info!(
            "replayed {} events ({} skipped)",
            summary.applied,
            summary.skipped
        );
        summary
    }

    /// Replay the event batch waiting under the events key, then remove it
    ///
    /// Returns `None` when there is no usable batch. A failed removal is logged
    /// and the replay is kept.
    pub fn replay_stored_events(&mut self) -> Option<ReplaySummary> {
        let key = self.config.events_key.clone();
        let bytes = match self.store.get(&key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("could not read stored events '{key}': {e}");
                return None;
            }
        };

        let records = match EventBatchAdapter::decode_array(&String::from_utf8_lossy(&bytes)) {
            Ok(records) => records,
            Err(e) => {
                log::warn!("ignoring unreadable stored events '{key}': {e}");
                return None;
            }
        };
        if records.is_empty() {
            return None;
        }

        let summary = self.replay(records);
        self.log
            .push("Stored Events Loaded", "System", Severity::Info);

        if let Err(e) = self.store.remove(&key) {
            log::warn!("could not clear stored events '{key}': {e}");
        }
        Some(summary)
    }

    /// Build the export document and note it in the activity log
    pub fn export(&mut self) -> ExportReport {
        let report = ExportReport::from_state(&self.state, Utc::now());
        self.log
            .push("Report Exported", "JSON File", Severity::Success);
        report
    }

    pub fn dashboard(&self) -> DashboardView {
        DashboardView::from_state(&self.state)
    }

    /// Render the buffered gaze points with the configured canvas
    pub fn render_heatmap(&self) -> RgbaBuffer {
        HeatmapEngine::new(self.config.heatmap).render(&self.gaze_points)
    }

    pub(crate) fn log_mut(&mut self) -> &mut ActivityLog {
        &mut self.log
    }

    fn persist(&mut self) {
        let bytes = match SnapshotCodec::encode(&self.state) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("could not encode snapshot: {e}");
                return;
            }
        };
        if let Err(e) = self.store.set(&self.config.state_key, &bytes) {
            log::warn!("could not persist snapshot '{}': {e}", self.config.state_key);
        }
    }
}

/// Bump a section counter and its global total together, or neither
fn increment_pair(section: u64, total: u64) -> Option<(u64, u64)> {
    Some((section.checked_add(1)?, total.checked_add(1)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::SectionMetric;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Store whose writes and removals can be made to fail
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_get: bool,
        fail_set: bool,
        fail_remove: bool,
    }

    impl SnapshotStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AnalyticsError> {
            if self.fail_get {
                return Err(AnalyticsError::Store("read refused".to_string()));
            }
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, bytes: &[u8]) -> Result<(), AnalyticsError> {
            if self.fail_set {
                return Err(AnalyticsError::Store("quota exceeded".to_string()));
            }
            self.inner.set(key, bytes)
        }

        fn remove(&mut self, key: &str) -> Result<(), AnalyticsError> {
            if self.fail_remove {
                return Err(AnalyticsError::Store("remove refused".to_string()));
            }
            self.inner.remove(key)
        }
    }

    fn aggregator() -> MetricsAggregator<MemoryStore> {
        MetricsAggregator::open(MemoryStore::new())
    }

    fn stored_state(store: &MemoryStore) -> AggregateState {
        let bytes = store.get("eyeTrackingAnalytics").unwrap().unwrap();
        SnapshotCodec::try_decode(&bytes).unwrap()
    }

    #[test]
    fn test_dwell_accumulates_per_section() {
        let mut agg = aggregator();
        agg.record_dwell(SectionId::Items, 4000);
        agg.record_dwell(SectionId::Items, 8000);

        assert_eq!(
            agg.state().section(SectionId::Items),
            SectionMetric {
                visits: 2,
                total_dwell_ms: 12_000,
                confusion_count: 0,
                help_triggered_count: 0,
            }
        );
        assert_eq!(agg.state().section(SectionId::Summary), SectionMetric::default());
    }

    #[test]
    fn test_conversion_over_three_sessions() {
        let mut agg = aggregator();
        agg.record_session_complete(40.0, true);
        agg.record_session_complete(50.0, true);
        agg.record_session_complete(60.0, false);

        assert_eq!(agg.state().sessions.len(), 3);
        assert_eq!(agg.state().conversion_count, 2);
        let view = agg.dashboard();
        assert!((view.conversion_rate - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(view.conversion_percent, 67);
        assert_eq!(view.average_session_seconds, Some(50.0));
    }

    #[test]
    fn test_unknown_section_is_ignored() {
        let mut agg = aggregator();
        let before = agg.state().clone();

        let applied = agg.apply(TrackingEvent::dwell("shippingAddress", 500.0));
        assert_eq!(
            applied,
            Applied::Skipped(ValidationError::UnknownSection("shippingAddress".to_string()))
        );
        assert!(agg.apply(TrackingEvent::confusion("shippingAddress")).is_skipped());
        assert!(agg.apply(TrackingEvent::help("shippingAddress")).is_skipped());

        assert_eq!(agg.state(), &before);
        assert!(agg.activity().is_empty());
        assert!(!agg.store().contains("eyeTrackingAnalytics"));
    }

    #[test]
    fn test_session_snapshots_global_totals() {
        let mut agg = aggregator();
        agg.record_confusion(SectionId::PaymentMethods);
        agg.record_confusion(SectionId::Summary);
        agg.record_help_triggered(SectionId::PaymentMethods);

        let record = agg.record_session_complete(45.0, true);
        assert_eq!(record.confusion_events_at_completion, 2);
        assert_eq!(record.help_triggered_at_completion, 1);
        assert!(record.completed);
        assert_eq!(agg.state().sessions.last(), Some(&record));

        let latest = agg.activity().latest().unwrap();
        assert_eq!(latest.action, "Session Complete");
        assert_eq!(latest.section, "45s");
        assert_eq!(latest.severity, Severity::Success);
    }

    #[test]
    fn test_invalid_duration_is_zero() {
        let mut agg = aggregator();
        assert_eq!(agg.record_session_complete(f64::NAN, false).duration_seconds, 0.0);
        assert_eq!(agg.record_session_complete(-3.0, false).duration_seconds, 0.0);
        assert_eq!(agg.state().conversion_count, 0);
    }

    #[test]
    fn test_random_sequences_keep_invariants() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut agg = aggregator();

        for _ in 0..500 {
            let section = SectionId::ALL[rng.gen_range(0..SectionId::ALL.len())];
            match rng.gen_range(0..4) {
                0 => agg.record_dwell(section, rng.gen_range(0..10_000)),
                1 => agg.record_confusion(section),
                2 => agg.record_help_triggered(section),
                _ => {
                    agg.record_session_complete(rng.gen_range(0.0..120.0), rng.gen_bool(0.5));
                }
            }
            assert!(agg.state().is_consistent());
        }
        assert!(agg.state().conversion_count <= agg.state().sessions.len() as u64);
    }

    #[test]
    fn test_saturated_counters_do_not_fault() {
        let mut state = AggregateState::default();
        state.section_mut(SectionId::Items).confusion_count = u64::MAX;
        state.total_confusion_events = u64::MAX;
        state.section_mut(SectionId::Summary).help_triggered_count = u64::MAX - 1;
        state.section_mut(SectionId::Items).help_triggered_count = 1;
        state.total_help_triggered = u64::MAX;

        let mut store = MemoryStore::new();
        store
            .set("eyeTrackingAnalytics", &SnapshotCodec::encode(&state).unwrap())
            .unwrap();
        let mut agg = MetricsAggregator::open(store);
        assert_eq!(agg.state(), &state);

        agg.record_confusion(SectionId::Items);
        agg.record_confusion(SectionId::Summary);
        agg.record_help_triggered(SectionId::Summary);
        agg.record_session_complete(10.0, true);

        assert_eq!(agg.state().total_confusion_events, u64::MAX);
        assert_eq!(agg.state().section(SectionId::Summary).confusion_count, 0);
        assert_eq!(agg.state().total_help_triggered, u64::MAX);
        assert!(agg.state().is_consistent());
        assert_eq!(agg.state().conversion_count, 1);
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let mut agg = aggregator();
        agg.record_dwell(SectionId::CheckoutDetails, 2500);
        assert_eq!(&stored_state(agg.store()), agg.state());

        agg.record_confusion(SectionId::CheckoutDetails);
        agg.record_help_triggered(SectionId::CheckoutDetails);
        agg.record_session_complete(12.5, true);
        assert_eq!(&stored_state(agg.store()), agg.state());
    }

    #[test]
    fn test_reopen_restores_state_but_not_gaze() {
        let mut agg = aggregator();
        agg.record_dwell(SectionId::Summary, 3000);
        agg.record_confusion(SectionId::Summary);
        agg.record_gaze(10.0, 20.0);
        let state = agg.state().clone();

        let reopened = MetricsAggregator::open(agg.into_store());
        assert_eq!(reopened.state(), &state);
        assert!(reopened.gaze_points().is_empty());
        assert!(reopened.activity().is_empty());
    }

    #[test]
    fn test_store_failures_are_not_fatal() {
        let store = FlakyStore {
            fail_get: true,
            fail_set: true,
            ..FlakyStore::default()
        };
        let mut agg = MetricsAggregator::open(store);
        assert_eq!(agg.state(), &AggregateState::default());

        agg.record_dwell(SectionId::Items, 100);
        agg.record_confusion(SectionId::Items);
        agg.reset();
        agg.record_help_triggered(SectionId::Summary);

        assert_eq!(agg.state().total_help_triggered, 1);
        assert!(agg.store().inner.is_empty());
    }

    #[test]
    fn test_reset_matches_empty_views() {
        let mut agg = aggregator();
        agg.record_dwell(SectionId::Items, 4000);
        agg.record_confusion(SectionId::Items);
        agg.record_help_triggered(SectionId::Items);
        agg.record_session_complete(30.0, true);
        agg.record_gaze(5.0, 5.0);

        agg.reset();

        assert_eq!(agg.state(), &AggregateState::default());
        assert_eq!(agg.dashboard(), DashboardView::from_state(&AggregateState::default()));
        assert!(agg.gaze_points().is_empty());
        assert_eq!(agg.activity().len(), 1);
        assert_eq!(agg.activity().latest().unwrap().action, "Data Reset");
        assert_eq!(stored_state(agg.store()), AggregateState::default());
    }

    #[test]
    fn test_apply_dispatches_every_kind() {
        let mut agg = aggregator();
        assert_eq!(agg.apply(TrackingEvent::gaze(1.0, 2.0)), Applied::Buffered);
        assert_eq!(agg.apply(TrackingEvent::dwell("items", 1499.6)), Applied::Recorded);
        assert_eq!(agg.apply(TrackingEvent::confusion("summary")), Applied::Recorded);
        assert_eq!(agg.apply(TrackingEvent::help("summary")), Applied::Recorded);
        assert_eq!(
            agg.apply(TrackingEvent::SessionComplete {
                duration_seconds: None,
                completed: None,
            }),
            Applied::Recorded
        );
        assert_eq!(
            agg.apply(TrackingEvent::Unknown),
            Applied::Skipped(ValidationError::UnknownKind)
        );

        let state = agg.state();
        assert_eq!(agg.gaze_points().len(), 1);
        assert_eq!(state.section(SectionId::Items).total_dwell_ms, 1500);
        assert_eq!(state.total_confusion_events, 1);
        assert_eq!(state.total_help_triggered, 1);
        assert_eq!(state.sessions.last().unwrap().duration_seconds, 0.0);
        assert_eq!(state.conversion_count, 0);
    }

    #[test]
    fn test_non_finite_gaze_is_rejected() {
        let mut agg = aggregator();
        assert!(!agg.record_gaze(f64::NAN, 1.0));
        assert!(!agg.record_gaze(1.0, f64::INFINITY));
        assert!(agg.record_gaze(-5.0, 1000.0));
        assert_eq!(agg.gaze_points().len(), 1);
    }

    #[test]
    fn test_replay_skips_bad_records() {
        let json = r#"[
            {"type": "dwellTime", "section": "items", "dwellTime": 4000},
            {"type": "mouseMove", "x": 1},
            {"type": "confusionEvent"},
            {"type": "confusionEvent", "section": "paymentMethods"},
            {"type": "dwellTime", "section": "items", "dwellTime": -5},
            {"type": "helpTriggered", "section": "paymentMethods", "beforeDwellTime": 2100},
            {"type": "gazePoint", "x": 400, "y": 250, "timestamp": 1700000000000},
            {"type": "sessionComplete", "completionTime": 45, "conversationCompleted": true}
        ]"#;

        let mut agg = aggregator();
        let summary = agg.replay(EventBatchAdapter::decode_array(json).unwrap());

        assert_eq!(summary, ReplaySummary { applied: 5, skipped: 3 });
        assert_eq!(summary.total(), 8);
        let state = agg.state();
        assert_eq!(state.section(SectionId::Items).visits, 1);
        assert_eq!(state.section(SectionId::PaymentMethods).confusion_count, 1);
        assert_eq!(state.total_help_triggered, 1);
        assert_eq!(state.conversion_count, 1);
        assert_eq!(agg.gaze_points().len(), 1);
    }

    #[test]
    fn test_replay_twice_double_counts() {
        let records = || {
            vec![
                Ok(TrackingEvent::confusion("items")),
                Ok(TrackingEvent::dwell("items", 100.0)),
            ]
        };
        let mut agg = aggregator();
        agg.replay(records());
        agg.replay(records());

        assert_eq!(agg.state().total_confusion_events, 2);
        assert_eq!(agg.state().section(SectionId::Items).visits, 2);
    }

    #[test]
    fn test_replay_stored_events_consumes_batch() {
        let mut store = MemoryStore::new();
        store
            .set(
                "eyeTrackingEvents",
                br#"[{"type": "confusionEvent", "section": "summary"}, {"type": "bogus"}]"#,
            )
            .unwrap();

        let mut agg = MetricsAggregator::open(store);
        let summary = agg.replay_stored_events().unwrap();

        assert_eq!(summary, ReplaySummary { applied: 1, skipped: 1 });
        assert!(!agg.store().contains("eyeTrackingEvents"));
        assert_eq!(agg.activity().latest().unwrap().action, "Stored Events Loaded");
        assert_eq!(agg.replay_stored_events(), None);
    }

    #[test]
    fn test_replay_stored_events_survives_failed_remove() {
        let mut store = FlakyStore {
            fail_remove: true,
            ..FlakyStore::default()
        };
        store
            .set("eyeTrackingEvents", br#"[{"type": "helpTriggered", "section": "items"}]"#)
            .unwrap();

        let mut agg = MetricsAggregator::open(store);
        let summary = agg.replay_stored_events().unwrap();

        assert_eq!(summary.applied, 1);
        assert_eq!(agg.state().total_help_triggered, 1);
        assert!(agg.store().inner.contains("eyeTrackingEvents"));
    }

    #[test]
    fn test_replay_stored_events_ignores_garbage() {
        let mut store = MemoryStore::new();
        store.set("eyeTrackingEvents", b"not json").unwrap();

        let mut agg = MetricsAggregator::open(store);
        assert_eq!(agg.replay_stored_events(), None);
        assert!(agg.store().contains("eyeTrackingEvents"));
        assert_eq!(agg.state(), &AggregateState::default());
    }

    #[test]
    fn test_load_state_rejects_inconsistent() {
        let mut agg = aggregator();
        let mut state = AggregateState::default();
        state.total_confusion_events = 3;

        assert!(matches!(
            agg.load_state(state),
            Err(AnalyticsError::InconsistentState(_))
        ));
        assert_eq!(agg.state(), &AggregateState::default());
    }

    #[test]
    fn test_export_logs_activity() {
        let mut agg = aggregator();
        agg.record_session_complete(20.0, true);
        let report = agg.export();

        assert_eq!(report.metrics.total_sessions, 1);
        assert_eq!(report.metrics.conversion_rate, "100.00%");
        let latest = agg.activity().latest().unwrap();
        assert_eq!(latest.action, "Report Exported");
        assert_eq!(latest.section, "JSON File");
    }

    #[test]
    fn test_render_heatmap_uses_config() {
        let mut config = AnalyticsConfig::default();
        config.heatmap.width = 64;
        config.heatmap.height = 32;
        let mut agg = MetricsAggregator::with_config(MemoryStore::new(), config);
        agg.record_gaze(10.0, 10.0);

        let buffer = agg.render_heatmap();
        assert_eq!((buffer.width(), buffer.height()), (64, 32));
        assert_eq!(buffer.pixel(10, 10), Some([255, 0, 0, 224]));
    }

    #[test]
    fn test_custom_keys_and_log_capacity() {
        let config = AnalyticsConfig {
            state_key: "kiosk-state".to_string(),
            log_capacity: 2,
            ..AnalyticsConfig::default()
        };
        let mut agg = MetricsAggregator::with_config(MemoryStore::new(), config);
        for _ in 0..5 {
            agg.record_confusion(SectionId::Items);
        }

        assert_eq!(agg.activity().len(), 2);
        assert!(agg.store().contains("kiosk-state"));
        assert!(!agg.store().contains("eyeTrackingAnalytics"));
    }
}
