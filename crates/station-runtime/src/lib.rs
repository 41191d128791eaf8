//! `CoreRuntime` composition root (§9 design note: "replace cross-component
//! 'current instance' globals with explicit composition roots").
//!
//! Wires the persisted [`station_config::StationConfig`] to a running
//! [`station_sources::IngestController`], a [`station_decoder::ContinuousDecoderTask`],
//! and a [`station_playout::PlayoutWorker`] sharing one
//! [`station_core::PlayoutQueue`], and exposes the single immutable status
//! snapshot described in §6.3.

mod alert_bridge;
mod error;
mod runtime;
mod status;

pub use alert_bridge::AlertAudioLibrary;
pub use error::RuntimeError;
pub use runtime::CoreRuntime;
pub use status::{BusSnapshot, MetricsSnapshot, PlayoutItemSummary, PlayoutQueueSnapshot, PlayoutWorkerSnapshot, SourceSnapshot, StationStatus};
