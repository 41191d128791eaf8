//! Errors raised by the composition root itself (§7: controller-level
//! errors surface via status snapshots, not as process exits).

use thiserror::Error;

/// Errors raised while assembling or driving a [`crate::CoreRuntime`].
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A source in the persisted registry failed `SourceConfig::validate`.
    #[error("invalid source '{name}': {reason}")]
    InvalidSource {
        /// Offending source name.
        name: String,
        /// Validation failure message.
        reason: String,
    },
    /// `station-config` rejected the persisted document.
    #[error("configuration error: {0}")]
    Config(#[from] station_config::ConfigError),
    /// No enabled source was registered; the runtime has nothing to ingest.
    #[error("no enabled audio source configured")]
    NoSourceConfigured,
    /// The decoder's subscriber id collided with an existing bus subscriber.
    #[error("decoder subscription failed: {0}")]
    Subscribe(#[from] station_bus::SubscribeError),
}
