//! Shared value types for the EAS Station core audio subsystem.
//!
//! This crate has no I/O and no threads: it holds the data model (§3 of the
//! design spec), the FCC precedence/severity/urgency mapping, the
//! [`PlayoutQueue`], and the sanitisation helpers used when building the
//! status snapshot surface. Every other `station-*` crate depends on this
//! one; it depends on nothing beyond `thiserror` and `serde`.

mod alert;
mod chunk;
mod metrics;
pub mod precedence;
mod playout_item;
mod playout_queue;
mod sanitize;
mod source_config;

pub use alert::AlertEvent;
pub use chunk::AudioChunk;
pub use metrics::{AudioMetrics, METRICS_RATE_LIMIT_MS};
pub use playout_item::{PlayoutEvent, PlayoutItem, PlayoutStatus};
pub use playout_queue::{PlayoutQueue, QueueError, QueueStatus};
pub use sanitize::sanitize_db;
pub use source_config::{SourceConfig, SourceKind, SourceState, SourceStatus};
