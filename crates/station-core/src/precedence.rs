//! FCC-style precedence, severity, and urgency mapping (§4.6).
//!
//! Grounded on `app_core/audio/playout_queue.py`'s `PrecedenceLevel`,
//! `SeverityLevel`, `UrgencyLevel`, and `PlayoutItem._determine_precedence`.

/// Default national-scope event codes (beyond `EAN`/`NPT`, which have their
/// own dedicated precedence classes). Operator-overridable via
/// `station-config`'s `PrecedenceConfig` (Open Question in §9, resolved in
/// `SPEC_FULL.md`).
pub const DEFAULT_NATIONAL_CODES: &[&str] = &["EAN", "NPT", "NIC", "ADR", "AVW", "AVA"];

/// Default state-scope event codes.
pub const DEFAULT_STATE_CODES: &[&str] = &["SPW", "EVI", "CEM", "DMO"];

/// FCC precedence class, lower value = higher priority (§4.6 table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Precedence(pub u32);

impl Precedence {
    /// Presidential-equivalent (`EAN`).
    pub const PRESIDENTIAL: Precedence = Precedence(1);
    /// Nationwide test (`NPT`).
    pub const NATIONWIDE_TEST: Precedence = Precedence(2);
    /// Local, public-scope, non-national/state event code.
    pub const LOCAL: Precedence = Precedence(3);
    /// State-scope public alert.
    pub const STATE: Precedence = Precedence(4);
    /// National-scope public alert (excluding EAN/NPT).
    pub const NATIONAL: Precedence = Precedence(5);
    /// Required monthly/weekly test.
    pub const REQUIRED_TEST: Precedence = Precedence(6);
    /// Anything that doesn't classify.
    pub const UNKNOWN: Precedence = Precedence(99);
}

/// Message scope as carried on the originating alert (CAP-ish, but the core
/// only cares about the `Public` value per §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Publicly broadcastable alert.
    Public,
    /// Any other scope (restricted, private, unspecified).
    Other,
}

/// Configurable sets used to resolve `Precedence::STATE` / `Precedence::NATIONAL`.
#[derive(Debug, Clone)]
pub struct PrecedenceConfig {
    /// Event codes that map to `Precedence::NATIONAL`.
    pub national_codes: Vec<String>,
    /// Event codes that map to `Precedence::STATE`.
    pub state_codes: Vec<String>,
}

impl Default for PrecedenceConfig {
    fn default() -> Self {
        Self {
            national_codes: DEFAULT_NATIONAL_CODES.iter().map(|s| s.to_string()).collect(),
            state_codes: DEFAULT_STATE_CODES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PrecedenceConfig {
    /// Determine the precedence class for an event, following §4.6's table.
    pub fn determine(&self, event_code: &str, scope: Scope, message_type: Option<&str>) -> Precedence {
        let event_upper = event_code.to_uppercase();

        if event_upper == "EAN" {
            return Precedence::PRESIDENTIAL;
        }
        if event_upper == "NPT" {
            return Precedence::NATIONWIDE_TEST;
        }
        if event_upper == "RMT" || event_upper == "RWT" {
            return Precedence::REQUIRED_TEST;
        }
        if message_type.map(|m| m.eq_ignore_ascii_case("test")).unwrap_or(false) {
            return Precedence::REQUIRED_TEST;
        }

        if scope == Scope::Public {
            if self.national_codes.iter().any(|c| c.eq_ignore_ascii_case(&event_upper)) {
                return Precedence::NATIONAL;
            }
            if self.state_codes.iter().any(|c| c.eq_ignore_ascii_case(&event_upper)) {
                return Precedence::STATE;
            }
            return Precedence::LOCAL;
        }

        Precedence::UNKNOWN
    }
}

/// CAP severity, lower = more severe (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Severity(pub u32);

impl Severity {
    /// Extreme.
    pub const EXTREME: Severity = Severity(1);
    /// Severe.
    pub const SEVERE: Severity = Severity(2);
    /// Moderate.
    pub const MODERATE: Severity = Severity(3);
    /// Minor.
    pub const MINOR: Severity = Severity(4);
    /// Unknown/unspecified.
    pub const UNKNOWN: Severity = Severity(5);

    /// Parse a CAP severity token, case-insensitively; unknown tokens map to
    /// [`Severity::UNKNOWN`].
    pub fn parse(token: Option<&str>) -> Severity {
        match token.map(str::to_uppercase).as_deref() {
            Some("EXTREME") => Severity::EXTREME,
            Some("SEVERE") => Severity::SEVERE,
            Some("MODERATE") => Severity::MODERATE,
            Some("MINOR") => Severity::MINOR,
            _ => Severity::UNKNOWN,
        }
    }
}

/// CAP urgency, lower = more urgent (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Urgency(pub u32);

impl Urgency {
    /// Immediate.
    pub const IMMEDIATE: Urgency = Urgency(1);
    /// Expected.
    pub const EXPECTED: Urgency = Urgency(2);
    /// Future.
    pub const FUTURE: Urgency = Urgency(3);
    /// Past.
    pub const PAST: Urgency = Urgency(4);
    /// Unknown/unspecified.
    pub const UNKNOWN: Urgency = Urgency(5);

    /// Parse a CAP urgency token, case-insensitively; unknown tokens map to
    /// [`Urgency::UNKNOWN`].
    pub fn parse(token: Option<&str>) -> Urgency {
        match token.map(str::to_uppercase).as_deref() {
            Some("IMMEDIATE") => Urgency::IMMEDIATE,
            Some("EXPECTED") => Urgency::EXPECTED,
            Some("FUTURE") => Urgency::FUTURE,
            Some("PAST") => Urgency::PAST,
            _ => Urgency::UNKNOWN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ean_is_presidential_regardless_of_scope() {
        let cfg = PrecedenceConfig::default();
        assert_eq!(cfg.determine("EAN", Scope::Other, None), Precedence::PRESIDENTIAL);
        assert_eq!(cfg.determine("ean", Scope::Public, None), Precedence::PRESIDENTIAL);
    }

    #[test]
    fn npt_is_nationwide_test() {
        let cfg = PrecedenceConfig::default();
        assert_eq!(cfg.determine("NPT", Scope::Public, None), Precedence::NATIONWIDE_TEST);
    }

    #[test]
    fn rmt_rwt_are_required_test() {
        let cfg = PrecedenceConfig::default();
        assert_eq!(cfg.determine("RMT", Scope::Public, None), Precedence::REQUIRED_TEST);
        assert_eq!(cfg.determine("RWT", Scope::Public, None), Precedence::REQUIRED_TEST);
    }

    #[test]
    fn message_type_test_overrides_to_required_test() {
        let cfg = PrecedenceConfig::default();
        assert_eq!(
            cfg.determine("TOR", Scope::Public, Some("Test")),
            Precedence::REQUIRED_TEST
        );
    }

    #[test]
    fn public_national_code_maps_to_national() {
        let cfg = PrecedenceConfig::default();
        assert_eq!(cfg.determine("ADR", Scope::Public, None), Precedence::NATIONAL);
    }

    #[test]
    fn public_state_code_maps_to_state() {
        let cfg = PrecedenceConfig::default();
        assert_eq!(cfg.determine("SPW", Scope::Public, None), Precedence::STATE);
    }

    #[test]
    fn public_other_code_defaults_to_local() {
        let cfg = PrecedenceConfig::default();
        assert_eq!(cfg.determine("TOR", Scope::Public, None), Precedence::LOCAL);
    }

    #[test]
    fn non_public_unclassified_is_unknown() {
        let cfg = PrecedenceConfig::default();
        assert_eq!(cfg.determine("TOR", Scope::Other, None), Precedence::UNKNOWN);
    }

    #[test]
    fn severity_parses_case_insensitively_and_defaults_unknown() {
        assert_eq!(Severity::parse(Some("extreme")), Severity::EXTREME);
        assert_eq!(Severity::parse(Some("bogus")), Severity::UNKNOWN);
        assert_eq!(Severity::parse(None), Severity::UNKNOWN);
    }

    #[test]
    fn urgency_parses_case_insensitively_and_defaults_unknown() {
        assert_eq!(Urgency::parse(Some("Immediate")), Urgency::IMMEDIATE);
        assert_eq!(Urgency::parse(Some("bogus")), Urgency::UNKNOWN);
    }
}
