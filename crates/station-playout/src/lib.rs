//! Deterministic, preemptible playout for the EAS Station audio core (§4.7
//! `PlayoutWorker`).
//!
//! The queue itself ([`station_core::PlayoutQueue`]) lives in
//! `station-core`; this crate owns the worker thread that drains it, the
//! player subprocess supervision, and the transmitter-relay contract.

mod error;
mod gpio;
mod player;
mod worker;

pub use error::PlaybackError;
pub use gpio::{GpioController, NoopGpioController};
pub use worker::{EventListener, PlayoutWorker, WorkerStatus};
