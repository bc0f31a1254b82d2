//! Aggregate snapshot codec
//!
//! Snapshots are a versioned JSON envelope around [`AggregateState`]. Gaze
//! points and the activity log are session-local and never part of a snapshot.
//!
//! Decoding is total: anything that is not a well-formed, current-version,
//! internally consistent snapshot decodes to the empty state.

use crate::error::AnalyticsError;
use crate::types::AggregateState;
use serde::{Deserialize, Serialize};

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    state: &'a AggregateState,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    state: AggregateState,
}

/// Serializer for persisted aggregate state
pub struct SnapshotCodec;

impl SnapshotCodec {
    /// Encode state as snapshot bytes
    pub fn encode(state: &AggregateState) -> Result<Vec<u8>, AnalyticsError> {
        let envelope = EnvelopeRef {
            version: SNAPSHOT_VERSION,
            state,
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    /// Strictly decode snapshot bytes, reporting why a snapshot is unusable
    pub fn try_decode(bytes: &[u8]) -> Result<AggregateState, AnalyticsError> {
        let envelope: Envelope = serde_json::from_slice(bytes)?;
        if envelope.version != SNAPSHOT_VERSION {
            return Err(AnalyticsError::ParseError(format!(
                "unsupported snapshot version {} (expected {})",
                envelope.version, SNAPSHOT_VERSION
            )));
        }

        let mut state = envelope.state;
        state.fill_missing_sections();
        state.check_invariants()?;
        Ok(state)
    }

    /// Decode snapshot bytes, falling back to the empty state
    pub fn decode(bytes: Option<&[u8]>) -> AggregateState {
        let Some(bytes) = bytes else {
            log::debug!("no snapshot stored, starting from empty state");
            return AggregateState::default();
        };

        match Self::try_decode(bytes) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("discarding unusable snapshot: {e}");
                AggregateState::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionRecord;
    use crate::types::SectionId;
    use pretty_assertions::assert_eq;

    fn populated_state() -> AggregateState {
        let mut state = AggregateState::default();
        let items = state.section_mut(SectionId::Items);
        items.visits = 3;
        items.total_dwell_ms = 12_345;

        let payment = state.section_mut(SectionId::PaymentMethods);
        payment.confusion_count = 2;
        payment.help_triggered_count = 1;

        state.total_confusion_events = 2;
        state.total_help_triggered = 1;
        state.sessions.append(SessionRecord::new(41.37, 2, 1, true));
        state.sessions.append(SessionRecord::new(0.1 + 0.2, 2, 1, false));
        state.conversion_count = 1;
        state
    }

    #[test]
    fn test_roundtrip_is_identity() {
        let state = populated_state();
        let bytes = SnapshotCodec::encode(&state).unwrap();
        let decoded = SnapshotCodec::try_decode(&bytes).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_envelope_shape() {
        let bytes = SnapshotCodec::encode(&populated_state()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["version"], SNAPSHOT_VERSION);
        assert_eq!(value["state"]["totalConfusionEvents"], 2);
        assert_eq!(value["state"]["sections"]["paymentMethods"]["confusionCount"], 2);
        assert_eq!(value["state"]["sessions"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_input_is_empty_state() {
        assert_eq!(SnapshotCodec::decode(None), AggregateState::default());
    }

    #[test]
    fn test_malformed_input_is_empty_state() {
        assert_eq!(
            SnapshotCodec::decode(Some(&b"{not json"[..])),
            AggregateState::default()
        );
        assert_eq!(SnapshotCodec::decode(Some(b"".as_slice())), AggregateState::default());
        assert_eq!(
            SnapshotCodec::decode(Some(&br#"{"version": 1}"#[..])),
            AggregateState::default()
        );
    }

    #[test]
    fn test_version_mismatch_is_empty_state() {
        let bytes = SnapshotCodec::encode(&populated_state()).unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["version"] = serde_json::json!(99);
        let bytes = serde_json::to_vec(&value).unwrap();

        assert!(SnapshotCodec::try_decode(&bytes).is_err());
        assert_eq!(SnapshotCodec::decode(Some(bytes.as_slice())), AggregateState::default());
    }

    #[test]
    fn test_inconsistent_totals_are_rejected() {
        let mut state = populated_state();
        state.total_confusion_events = 7;
        let bytes = SnapshotCodec::encode(&state).unwrap();

        assert!(matches!(
            SnapshotCodec::try_decode(&bytes),
            Err(AnalyticsError::InconsistentState(_))
        ));
        assert_eq!(SnapshotCodec::decode(Some(bytes.as_slice())), AggregateState::default());
    }

    #[test]
    fn test_overflowing_section_counts_are_rejected() {
        let json = format!(
            r#"{{
                "version": 1,
                "state": {{
                    "sections": {{
                        "items": {{"visits": 0, "totalDwellMs": 0, "confusionCount": {max}, "helpTriggeredCount": 0}},
                        "summary": {{"visits": 0, "totalDwellMs": 0, "confusionCount": 1, "helpTriggeredCount": 0}}
                    }},
                    "totalConfusionEvents": 0,
                    "totalHelpTriggered": 0,
                    "conversionCount": 0,
                    "sessions": []
                }}
            }}"#,
            max = u64::MAX
        );

        assert!(matches!(
            SnapshotCodec::try_decode(json.as_bytes()),
            Err(AnalyticsError::InconsistentState(_))
        ));
        assert_eq!(
            SnapshotCodec::decode(Some(json.as_bytes())),
            AggregateState::default()
        );
    }

    #[test]
    fn test_missing_sections_are_filled() {
        let json = br#"{
            "version": 1,
            "state": {
                "sections": {
                    "items": {"visits": 1, "totalDwellMs": 900, "confusionCount": 0, "helpTriggeredCount": 0}
                },
                "totalConfusionEvents": 0,
                "totalHelpTriggered": 0,
                "conversionCount": 0,
                "sessions": []
            }
        }"#;

        let state = SnapshotCodec::try_decode(json).unwrap();
        assert_eq!(state.sections.len(), SectionId::ALL.len());
        assert_eq!(state.section(SectionId::Items).total_dwell_ms, 900);
        assert_eq!(state.section(SectionId::Summary).visits, 0);
    }
}
