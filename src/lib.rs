//! Gaze Insights - Checkout analytics from gaze-tracking events
//!
//! Gaze Insights turns a stream of gaze-tracker and checkout-page events into
//! durable aggregate metrics and attention heatmaps: event ingestion →
//! per-section aggregation → snapshot persistence → dashboard views, export
//! and heatmap rendering.
//!
//! ## Modules
//!
//! - **Aggregation**: [`MetricsAggregator`] owns the aggregate and persists it
//!   through a [`SnapshotStore`] after every change
//! - **Heatmap**: [`HeatmapEngine`] renders gaze points into an RGBA buffer
//! - **Schema**: [`TrackingEvent`] and [`EventBatchAdapter`] classify raw
//!   JSON records, skipping the ones that cannot be used

pub mod activity;
pub mod aggregator;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod heatmap;
pub mod pipeline;
pub mod sample;
pub mod schema;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod types;

pub use aggregator::{Applied, MetricsAggregator, ReplaySummary};
pub use config::AnalyticsConfig;
pub use dashboard::{DashboardView, HelpImpact, HelpVerdict, ASSUMED_CONFUSION_REDUCTION};
pub use error::AnalyticsError;
pub use export::ExportReport;
pub use heatmap::{HeatmapConfig, HeatmapEngine, RgbaBuffer};
pub use pipeline::{events_to_heatmap, events_to_report, ndjson_to_report};
pub use snapshot::{SnapshotCodec, SNAPSHOT_VERSION};
pub use store::{FileStore, MemoryStore, SnapshotStore};
pub use types::{AggregateState, GazePoint, SectionId, SectionMetric};

// Schema exports
pub use schema::{EventBatchAdapter, TrackingEvent, ValidationError};

/// Library version reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name stamped on CLI output
pub const PRODUCER_NAME: &str = "gaze-insights";
