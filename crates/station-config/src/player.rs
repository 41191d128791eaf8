//! Persisted player configuration (§6.6 `PlayerConfig`).

/// The operator-supplied audio player argv (§6.2), e.g. `["aplay", "-q"]`.
/// The playout worker appends the segment path as the final argument.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PlayerConfig {
    /// Program and fixed arguments; must be non-empty to play anything.
    #[serde(default)]
    pub argv: Vec<String>,
}

impl PlayerConfig {
    /// Build from an explicit argv.
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    /// `true` iff this configuration can actually spawn a player.
    pub fn is_configured(&self) -> bool {
        !self.argv.is_empty()
    }

    /// Validate that a configured player has at least a program name.
    pub fn validate(&self) -> Result<(), String> {
        if self.argv.iter().any(|arg| arg.trim().is_empty()) {
            return Err("player argv must not contain empty arguments".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_argv_is_not_configured() {
        assert!(!PlayerConfig::default().is_configured());
    }

    #[test]
    fn blank_argument_is_rejected() {
        let cfg = PlayerConfig::new(vec!["aplay".into(), "".into()]);
        assert!(cfg.validate().is_err());
    }
}
