//! Persisted configuration for the EAS Station audio core (§6.6).
//!
//! `StationConfig` is the one document read at boot and written by an
//! external UI: an ordered [`SourceRegistry`], the [`PlayerConfig`] argv, an
//! optional [`ReceiverConfig`] for SDR tuning, and operator overrides for
//! national/state event-code classification ([`PrecedenceConfig`]). It is
//! never mutated in place — `station-runtime` loads one immutable snapshot
//! at startup and a reconfiguration replaces the whole document.

mod error;
mod paths;
mod player;
mod precedence;
mod receiver;
mod registry;
mod validation;

pub use error::ConfigError;
pub use paths::{default_config_path, ensure_user_config_dir, user_config_dir};
pub use player::PlayerConfig;
pub use precedence::PrecedenceConfig;
pub use receiver::ReceiverConfig;
pub use registry::SourceRegistry;
pub use validation::validate_all;

/// The full persisted configuration document (§6.6).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct StationConfig {
    /// Configured audio sources.
    #[serde(default)]
    pub sources: SourceRegistry,
    /// The audio player argv.
    #[serde(default)]
    pub player: PlayerConfig,
    /// SDR tuning parameters, if this station has an SDR source.
    #[serde(default)]
    pub receiver: Option<ReceiverConfig>,
    /// National/state event-code overrides.
    #[serde(default)]
    pub precedence: PrecedenceConfig,
}

impl StationConfig {
    /// Parse a document from its TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML text.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load from `path`.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Load from [`default_config_path`].
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&default_config_path())
    }

    /// Persist to `path`, creating parent directories as needed.
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        let text = self.to_toml_string()?;
        std::fs::write(path, text).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Validate every part of the document.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_all(&self.sources, &self.player, self.receiver.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use station_core::{SourceConfig, SourceKind};
    use std::collections::HashMap;

    fn sample_source() -> SourceConfig {
        SourceConfig {
            name: "wx1".into(),
            kind: SourceKind::File,
            enabled: true,
            priority: 1,
            sample_rate_hz: 48_000,
            channels: 1,
            buffer_frames: 1024,
            silence_threshold_db: -60.0,
            silence_duration_s: 5.0,
            kind_specific: HashMap::new(),
        }
    }

    #[test]
    fn round_trips_through_toml() {
        let config = StationConfig {
            sources: SourceRegistry::new(vec![sample_source()]),
            player: PlayerConfig::new(vec!["aplay".into(), "-q".into()]),
            receiver: Some(ReceiverConfig::default()),
            precedence: PrecedenceConfig::default(),
        };

        let text = config.to_toml_string().unwrap();
        let parsed = StationConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.sources.sources.len(), 1);
        assert_eq!(parsed.player.argv, vec!["aplay".to_string(), "-q".to_string()]);
        assert!(parsed.receiver.is_some());
    }

    #[test]
    fn load_and_save_round_trip_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("station.toml");

        let config = StationConfig {
            sources: SourceRegistry::new(vec![sample_source()]),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = StationConfig::load(&path).unwrap();
        assert_eq!(loaded.sources.sources[0].name, "wx1");
    }

    #[test]
    fn invalid_document_is_rejected_on_load() {
        let mut dup = sample_source();
        dup.name = "wx1".into();
        let config = StationConfig {
            sources: SourceRegistry::new(vec![sample_source(), dup]),
            ..Default::default()
        };
        let text = config.to_toml_string().unwrap();
        assert!(StationConfig::from_toml_str(&text).is_err());
    }

    #[test]
    fn empty_document_parses_to_defaults() {
        let config = StationConfig::from_toml_str("").unwrap();
        assert!(config.sources.sources.is_empty());
        assert!(config.receiver.is_none());
    }
}
