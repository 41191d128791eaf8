//! Aggregate validation across a whole persisted configuration document.

use crate::{ConfigError, PlayerConfig, ReceiverConfig, SourceRegistry};

/// Validate a full configuration document: every source, the player
/// command, and the receiver tuning parameters (when present).
pub fn validate_all(
    sources: &SourceRegistry,
    player: &PlayerConfig,
    receiver: Option<&ReceiverConfig>,
) -> Result<(), ConfigError> {
    sources.validate().map_err(ConfigError::Invalid)?;
    player.validate().map_err(ConfigError::Invalid)?;
    if let Some(receiver) = receiver {
        receiver.validate().map_err(ConfigError::Invalid)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_valid() {
        let sources = SourceRegistry::default();
        let player = PlayerConfig::default();
        assert!(validate_all(&sources, &player, None).is_ok());
    }

    #[test]
    fn invalid_receiver_fails_the_whole_document() {
        let sources = SourceRegistry::default();
        let player = PlayerConfig::default();
        let mut receiver = ReceiverConfig::default();
        receiver.squelch_db = 5.0;
        assert!(validate_all(&sources, &player, Some(&receiver)).is_err());
    }
}
