//! Runtime configuration.
//!
//! Loaded from YAML; every section has defaults so an empty document is a
//! valid configuration.
//!
//! ```yaml
//! validator_timeout: 10s
//! cross_validate: false
//! circuit_breaker:
//!   failure_threshold: 3
//!   recovery_timeout: 30s
//!   success_threshold: 2
//! audit:
//!   mode: buffered
//!   buffer_capacity: 256
//!   write_timeout: 2s
//! attestation:
//!   issuer: regattest
//!   validity_days: 90
//! validators:
//!   - level: 3
//!     endpoint: https://validators.internal/context
//!     api_key_env: CONTEXT_VALIDATOR_KEY
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use regattest_core::{ValidationLevel, CERTIFICATE_VALIDITY_DAYS};

use crate::resilience::CircuitBreakerConfig;

/// Errors from loading or checking configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Human-readable durations ("10s", "2m 30s") for serde.
pub(crate) mod duration_human {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(D::Error::custom)
    }
}

/// How audit events reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditMode {
    /// Write through the store on the request path, bounded by `write_timeout`
    #[default]
    Direct,
    /// Enqueue onto a bounded channel drained by a background task
    Buffered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub mode: AuditMode,

    /// Queue size for buffered mode
    pub buffer_capacity: usize,

    #[serde(with = "duration_human")]
    pub write_timeout: Duration,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            mode: AuditMode::Direct,
            buffer_capacity: 256,
            write_timeout: Duration::from_secs(2),
        }
    }
}

/// Longest certificate lifetime accepted from configuration (100 years).
pub const MAX_VALIDITY_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestationConfig {
    /// Name stamped on issued certificates
    pub issuer: String,

    pub validity_days: i64,
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            issuer: "regattest".to_string(),
            validity_days: CERTIFICATE_VALIDITY_DAYS,
        }
    }
}

/// A remote validator endpoint for one level.
#[derive(Clone, Serialize, Deserialize)]
pub struct ValidatorEndpointConfig {
    pub level: u8,

    pub endpoint: String,

    /// Inline API key. Prefer `api_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl fmt::Debug for ValidatorEndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorEndpointConfig")
            .field("level", &self.level)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_key_env", &self.api_key_env)
            .finish()
    }
}

/// Configuration for the orchestrator and its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Upper bound on a single remote validator call
    #[serde(with = "duration_human")]
    pub validator_timeout: Duration,

    /// Also run every registered validator below the resolved level and merge
    pub cross_validate: bool,

    pub circuit_breaker: CircuitBreakerConfig,

    pub audit: AuditConfig,

    pub attestation: AttestationConfig,

    pub validators: Vec<ValidatorEndpointConfig>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            validator_timeout: Duration::from_secs(10),
            cross_validate: false,
            circuit_breaker: CircuitBreakerConfig::default(),
            audit: AuditConfig::default(),
            attestation: AttestationConfig::default(),
            validators: Vec::new(),
        }
    }
}

impl RuntimeConfig {
    /// Parse and check a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and check a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Reject values the runtime cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.validator_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "validator_timeout must be greater than zero".to_string(),
            ));
        }

        let cb = &self.circuit_breaker;
        if cb.failure_threshold == 0 || cb.success_threshold == 0 {
            return Err(ConfigError::Invalid(
                "circuit_breaker thresholds must be at least 1".to_string(),
            ));
        }

        if self.audit.mode == AuditMode::Buffered && self.audit.buffer_capacity == 0 {
            return Err(ConfigError::Invalid(
                "audit.buffer_capacity must be at least 1 in buffered mode".to_string(),
            ));
        }

        if !(1..=MAX_VALIDITY_DAYS).contains(&self.attestation.validity_days) {
            return Err(ConfigError::Invalid(format!(
                "attestation.validity_days must be within 1..={}, got {}",
                MAX_VALIDITY_DAYS, self.attestation.validity_days
            )));
        }

        let mut seen = BTreeSet::new();
        for validator in &self.validators {
            let level = ValidationLevel::try_from(validator.level)
                .map_err(|e| ConfigError::Invalid(format!("validators: {}", e)))?;

            if !seen.insert(level) {
                return Err(ConfigError::Invalid(format!(
                    "validators: level {} configured more than once",
                    validator.level
                )));
            }

            if !validator.endpoint.starts_with("http://")
                && !validator.endpoint.starts_with("https://")
            {
                return Err(ConfigError::Invalid(format!(
                    "validators: endpoint for level {} must start with http:// or https://",
                    validator.level
                )));
            }
        }

        Ok(())
    }
}
