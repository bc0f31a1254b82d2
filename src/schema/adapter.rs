//! Batch adapter for stored or piped event records
//!
//! Batches are classified record by record: one malformed record never makes
//! the rest of the batch unreadable. Only an outer document that is not a JSON
//! array at all is reported as an error.

use crate::error::AnalyticsError;
use crate::schema::event::{TrackingEvent, ValidationError};
use serde_json::Value;

/// Outcome of decoding one record
pub type DecodedRecord = Result<TrackingEvent, ValidationError>;

/// Adapter for turning stored batches into typed events
pub struct EventBatchAdapter;

impl EventBatchAdapter {
    /// Decode a JSON array of event records
    pub fn decode_array(json: &str) -> Result<Vec<DecodedRecord>, AnalyticsError> {
        let values: Vec<Value> = serde_json::from_str(json)
            .map_err(|e| AnalyticsError::ParseError(format!("expected a JSON array: {e}")))?;
        Ok(Self::decode_values(&values))
    }

    /// Decode NDJSON (one event record per line); blank lines are ignored
    pub fn decode_ndjson(ndjson: &str) -> Vec<DecodedRecord> {
        ndjson
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(line_num, line)| Self::decode_line(line_num + 1, line.trim()))
            .collect()
    }

    /// Decode a single NDJSON line
    pub fn decode_line(line_num: usize, line: &str) -> DecodedRecord {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => Self::decode_record(&value),
            Err(e) => Err(ValidationError::Malformed(format!(
                "line {line_num}: {e}"
            ))),
        }
    }

    /// Decode already-parsed JSON values
    pub fn decode_values(values: &[Value]) -> Vec<DecodedRecord> {
        values.iter().map(Self::decode_record).collect()
    }

    /// Classify and validate one record
    pub fn decode_record(value: &Value) -> DecodedRecord {
        let event: TrackingEvent = serde_json::from_value(value.clone())
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        event.validate()?;
        Ok(event)
    }

    /// Collect the records that failed to decode
    pub fn validate_records(records: &[DecodedRecord]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                record.as_ref().err().map(|error| ValidationResult {
                    index,
                    error: error.clone(),
                })
            })
            .collect()
    }
}

/// A record that failed validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub index: usize,
    pub error: ValidationError,
}
