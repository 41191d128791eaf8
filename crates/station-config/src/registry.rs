//! Persisted source registry (§6.6 `SourceRegistry`).

use station_core::SourceConfig;

/// An ordered list of [`SourceConfig`]s, persisted and replaced atomically
/// (§3: `SourceConfig` "replaced atomically on reconfiguration").
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SourceRegistry {
    /// Configured sources, in priority-independent insertion order (the
    /// selection order is derived from `priority`, not list position).
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl SourceRegistry {
    /// Build a registry from an explicit source list.
    pub fn new(sources: Vec<SourceConfig>) -> Self {
        Self { sources }
    }

    /// Find a source by name.
    pub fn get(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Validate every entry and reject duplicate names.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !seen.insert(source.name.as_str()) {
                return Err(format!("duplicate source name: '{}'", source.name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use station_core::SourceKind;
    use std::collections::HashMap;

    fn source(name: &str, priority: u32) -> SourceConfig {
        SourceConfig {
            name: name.into(),
            kind: SourceKind::File,
            enabled: true,
            priority,
            sample_rate_hz: 48_000,
            channels: 1,
            buffer_frames: 1024,
            silence_threshold_db: -60.0,
            silence_duration_s: 5.0,
            kind_specific: HashMap::new(),
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let registry = SourceRegistry::new(vec![source("wx1", 1), source("wx1", 2)]);
        assert!(registry.validate().is_err());
    }

    #[test]
    fn get_finds_by_name() {
        let registry = SourceRegistry::new(vec![source("wx1", 1), source("wx2", 2)]);
        assert_eq!(registry.get("wx2").unwrap().priority, 2);
        assert!(registry.get("missing").is_none());
    }
}
