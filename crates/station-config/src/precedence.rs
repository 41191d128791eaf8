//! Operator-overridable national/state event-code sets (§4.6, §9 Open
//! Question 3, resolved in `SPEC_FULL.md`).

use station_core::precedence::{DEFAULT_NATIONAL_CODES, DEFAULT_STATE_CODES};

/// Overrides for the default national/state event-code classification used
/// by [`station_core::precedence`]. Empty lists fall back to the built-in
/// defaults rather than classifying nothing as national/state.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PrecedenceConfig {
    /// Event codes classified as national scope, beyond `EAN`/`NPT` (which
    /// always have their own dedicated precedence classes regardless of
    /// this list).
    #[serde(default)]
    pub national_codes: Vec<String>,
    /// Event codes classified as state scope.
    #[serde(default)]
    pub state_codes: Vec<String>,
}

impl PrecedenceConfig {
    /// The effective national-code set: the operator override if non-empty,
    /// otherwise [`DEFAULT_NATIONAL_CODES`].
    pub fn national_codes(&self) -> Vec<String> {
        if self.national_codes.is_empty() {
            DEFAULT_NATIONAL_CODES.iter().map(|s| s.to_string()).collect()
        } else {
            self.national_codes.clone()
        }
    }

    /// The effective state-code set: the operator override if non-empty,
    /// otherwise [`DEFAULT_STATE_CODES`].
    pub fn state_codes(&self) -> Vec<String> {
        if self.state_codes.is_empty() {
            DEFAULT_STATE_CODES.iter().map(|s| s.to_string()).collect()
        } else {
            self.state_codes.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_strings(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_override_falls_back_to_defaults() {
        let cfg = PrecedenceConfig::default();
        assert_eq!(cfg.national_codes(), as_strings(DEFAULT_NATIONAL_CODES));
        assert_eq!(cfg.state_codes(), as_strings(DEFAULT_STATE_CODES));
    }

    #[test]
    fn non_empty_override_replaces_defaults() {
        let cfg = PrecedenceConfig {
            national_codes: vec!["XYZ".into()],
            state_codes: vec![],
        };
        assert_eq!(cfg.national_codes(), vec!["XYZ".to_string()]);
        assert_eq!(cfg.state_codes(), as_strings(DEFAULT_STATE_CODES));
    }
}
