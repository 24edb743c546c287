//! Semantic version handling for regulation versions.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref SEMVER_PATTERN: Regex = Regex::new(r"^(\d+)\.(\d+)\.(\d+)$").unwrap();
}

/// Errors from parsing a regulation version.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    #[error("'{0}' is not a MAJOR.MINOR.PATCH version")]
    InvalidFormat(String),

    #[error("version component out of range in '{0}'")]
    ComponentOverflow(String),
}

/// A MAJOR.MINOR.PATCH regulation version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegulationVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

/// How far a client's version lags the authoritative one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionDrift {
    Current,
    Major,
    Minor,
    Patch,
    /// The client claims a version newer than the authority knows
    ClientAhead,
}

impl VersionDrift {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
            Self::ClientAhead => "client_ahead",
        }
    }
}

impl RegulationVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Classify the drift from `client` to `self` (the authority).
    pub fn drift_from(&self, client: &RegulationVersion) -> VersionDrift {
        if client > self {
            VersionDrift::ClientAhead
        } else if client.major != self.major {
            VersionDrift::Major
        } else if client.minor != self.minor {
            VersionDrift::Minor
        } else if client.patch != self.patch {
            VersionDrift::Patch
        } else {
            VersionDrift::Current
        }
    }
}

impl FromStr for RegulationVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = SEMVER_PATTERN
            .captures(s)
            .ok_or_else(|| VersionParseError::InvalidFormat(s.to_string()))?;

        let component = |i: usize| -> Result<u64, VersionParseError> {
            caps[i]
                .parse()
                .map_err(|_| VersionParseError::ComponentOverflow(s.to_string()))
        };

        Ok(Self::new(component(1)?, component(2)?, component(3)?))
    }
}

impl fmt::Display for RegulationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_version() {
        let v: RegulationVersion = "1.2.3".parse().unwrap();
        assert_eq!(v, RegulationVersion::new(1, 2, 3));
        assert_eq!(v.to_string(), "1.2.3");
    }

    #[test]
    fn test_parse_rejects_partial_and_prerelease() {
        for bad in ["1.2", "v1.2.3", "1.2.3-beta", "", "1..3", " 1.2.3"] {
            assert!(
                matches!(
                    bad.parse::<RegulationVersion>(),
                    Err(VersionParseError::InvalidFormat(_))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        let result = "99999999999999999999.0.0".parse::<RegulationVersion>();
        assert!(matches!(result, Err(VersionParseError::ComponentOverflow(_))));
    }

    #[test]
    fn test_drift_classification() {
        let authority = RegulationVersion::new(2, 3, 4);
        assert_eq!(authority.drift_from(&RegulationVersion::new(2, 3, 4)), VersionDrift::Current);
        assert_eq!(authority.drift_from(&RegulationVersion::new(2, 3, 1)), VersionDrift::Patch);
        assert_eq!(authority.drift_from(&RegulationVersion::new(2, 0, 9)), VersionDrift::Minor);
        assert_eq!(authority.drift_from(&RegulationVersion::new(1, 9, 9)), VersionDrift::Major);
        assert_eq!(
            authority.drift_from(&RegulationVersion::new(3, 0, 0)),
            VersionDrift::ClientAhead
        );
    }
}
