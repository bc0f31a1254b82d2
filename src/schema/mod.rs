//! Tracking event schema module
//!
//! Defines the inbound event records emitted by the checkout page and the
//! adapter that decodes stored or piped batches of them.

pub mod adapter;
pub mod event;

pub use adapter::{DecodedRecord, EventBatchAdapter, ValidationResult};
pub use event::{parse_section, TrackingEvent, ValidationError};
