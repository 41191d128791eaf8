//! Fan-out distribution of captured audio to independent subscribers (§4.3).
//!
//! One [`BroadcastBus`] per running source. The capture thread publishes
//! once; each subscriber (the decoder, the playout monitor, any future
//! rebroadcast consumer) gets its own bounded, drop-oldest queue so a slow
//! or stalled consumer cannot starve the others.

mod bus;
mod error;
mod subscriber;

pub use bus::{BroadcastBus, BusStats};
pub use error::SubscribeError;
pub use subscriber::{SubscriberAdapter, SubscriberHealth, SubscriberStats};
