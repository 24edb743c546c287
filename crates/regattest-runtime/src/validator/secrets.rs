//! Secure credential handling for remote validators.
//!
//! Using [`ApiCredential`] ensures:
//!
//! - **No accidental logging**: Credentials cannot appear in Debug/Display output
//! - **Zeroed on drop**: Values are held in a `secrecy::SecretString`
//! - **Explicit exposure**: Callers must call `.expose()` at the point of use
//!
//! ## Usage
//!
//! ```ignore
//! let cred = ApiCredential::from_config_or_env(
//!     endpoint.api_key.as_deref(),
//!     endpoint.api_key_env.as_deref(),
//!     "Context validator API key",
//! )?;
//!
//! request.header("x-api-key", cred.expose());
//! ```

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use super::ValidatorError;

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from the configuration file
    Config,
    /// Loaded from an environment variable
    Environment,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A securely-stored API credential.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    /// Wrap a value. It cannot be accidentally logged after this point.
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Load credential from an environment variable.
    pub fn from_env(env_var: &str, name: &'static str) -> Result<Self, ValidatorError> {
        std::env::var(env_var)
            .map(|v| Self::new(v, CredentialSource::Environment, name))
            .map_err(|_| {
                ValidatorError::NotConfigured(format!(
                    "{} not set: configure '{}' environment variable",
                    name, env_var
                ))
            })
    }

    /// Prefer an inline config value, then the named environment variable.
    ///
    /// Returns `Ok(None)` when neither is configured; a named but unset
    /// environment variable is an error.
    pub fn from_config_or_env(
        config_value: Option<&str>,
        env_var: Option<&str>,
        name: &'static str,
    ) -> Result<Option<Self>, ValidatorError> {
        if let Some(value) = config_value {
            return Ok(Some(Self::new(value, CredentialSource::Config, name)));
        }

        match env_var {
            Some(var) => Self::from_env(var, name).map(Some),
            None => Ok(None),
        }
    }

    /// Expose the credential value. Call only where it is sent.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_redacted_in_debug() {
        let secret = "sk-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Programmatic, "Test API key");

        let debug = format!("{:?}", cred);
        assert!(!debug.contains(secret), "Secret exposed in Debug!");
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_credential_redacted_in_display() {
        let secret = "sk-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Config, "Test API key");

        let display = format!("{}", cred);
        assert!(!display.contains(secret), "Secret exposed in Display!");
        assert!(display.contains("Test API key"));
        assert!(display.contains("config"));
    }

    #[test]
    fn test_credential_expose() {
        let cred = ApiCredential::new("key-1", CredentialSource::Programmatic, "Test");
        assert_eq!(cred.expose(), "key-1");
        assert!(!cred.is_empty());
    }

    #[test]
    fn test_prefers_config_value() {
        std::env::set_var("REGATTEST_TEST_KEY_PRIORITY", "env-key");
        let cred = ApiCredential::from_config_or_env(
            Some("config-key"),
            Some("REGATTEST_TEST_KEY_PRIORITY"),
            "Test key",
        )
        .unwrap()
        .unwrap();

        assert_eq!(cred.expose(), "config-key");
        assert_eq!(cred.source(), CredentialSource::Config);
        std::env::remove_var("REGATTEST_TEST_KEY_PRIORITY");
    }

    #[test]
    fn test_falls_back_to_env() {
        std::env::set_var("REGATTEST_TEST_KEY_FALLBACK", "env-key");
        let cred =
            ApiCredential::from_config_or_env(None, Some("REGATTEST_TEST_KEY_FALLBACK"), "Test key")
                .unwrap()
                .unwrap();

        assert_eq!(cred.expose(), "env-key");
        assert_eq!(cred.source(), CredentialSource::Environment);
        std::env::remove_var("REGATTEST_TEST_KEY_FALLBACK");
    }

    #[test]
    fn test_unset_env_var_is_error() {
        let err =
            ApiCredential::from_config_or_env(None, Some("REGATTEST_NONEXISTENT_12345"), "Test key")
                .unwrap_err();
        assert!(err.to_string().contains("REGATTEST_NONEXISTENT_12345"));
    }

    #[test]
    fn test_nothing_configured_is_none() {
        assert!(ApiCredential::from_config_or_env(None, None, "Test key")
            .unwrap()
            .is_none());
    }
}
