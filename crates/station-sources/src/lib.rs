//! Audio source capture for the EAS Station audio core (§4.1, §4.4, §4.8).
//!
//! Each configured [`station_core::SourceConfig`] becomes one [`AdapterHandle`]
//! owning a single capture thread that normalises its input to interleaved
//! float32 PCM, publishes it to a [`station_bus::BroadcastBus`], and keeps a
//! rolling [`metering::MeteringAndHealth`] snapshot. The [`IngestController`]
//! owns the registry of adapters and the shared bus.

pub mod backend;
pub mod cpal_backend;
mod adapter;
mod error;
mod ingest;
pub mod metering;
mod stream;
mod wav;

pub use adapter::AdapterHandle;
pub use error::Error;
pub use ingest::IngestController;
pub use metering::{ClippingEvent, HealthScore, LevelTrend, MeteringAndHealth, SilenceEvent};
pub use stream::{AudioDevice, default_device, list_devices};
pub use wav::{StereoSamples, WavFormat, WavInfo, WavSpec, read_wav, read_wav_info, read_wav_stereo, write_wav, write_wav_stereo};

/// Convenience result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
