//! Completed-session log
//!
//! Sessions are appended once, when a session-complete event arrives, and are
//! never edited afterwards. The log is part of the persisted aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Record of one finished checkout session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: Uuid,
    pub duration_seconds: f64,
    /// Global confusion total at the moment the session completed
    pub confusion_events_at_completion: u64,
    /// Global help total at the moment the session completed
    pub help_triggered_at_completion: u64,
    /// Whether the session ended in a conversion
    pub completed: bool,
    pub completed_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(
        duration_seconds: f64,
        confusion_events_at_completion: u64,
        help_triggered_at_completion: u64,
        completed: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            duration_seconds,
            confusion_events_at_completion,
            help_triggered_at_completion,
            completed,
            completed_at: Utc::now(),
        }
    }
}

/// Append-only, ordered sequence of session records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionLog {
    records: Vec<SessionRecord>,
}

impl SessionLog {
    pub(crate) fn append(&mut self, record: SessionRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SessionRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&SessionRecord> {
        self.records.last()
    }

    /// Number of sessions that ended in a conversion
    pub fn completed_count(&self) -> usize {
        self.records.iter().filter(|r| r.completed).count()
    }

    /// Mean session duration in seconds, `None` when the log is empty
    pub fn mean_duration_seconds(&self) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        let total: f64 = self.records.iter().map(|r| r.duration_seconds).sum();
        Some(total / self.records.len() as f64)
    }
}

impl<'a> IntoIterator for &'a SessionLog {
    type Item = &'a SessionRecord;
    type IntoIter = std::slice::Iter<'a, SessionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
