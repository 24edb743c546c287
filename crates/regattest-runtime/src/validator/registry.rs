//! Registry of validators keyed by level.
//!
//! Resolution is a static lookup along the fallback chain (3 -> 2 -> 1).

use std::collections::BTreeMap;
use std::sync::Arc;

use regattest_core::ValidationLevel;

use super::{Validator, ValidatorError};
use crate::config::ValidatorEndpointConfig;

/// Validators by level. At most one per level.
#[derive(Default, Clone)]
pub struct ValidatorRegistry {
    validators: BTreeMap<ValidationLevel, Arc<dyn Validator>>,
}

impl ValidatorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator under its level.
    ///
    /// If a validator for the same level already exists, it will be replaced.
    pub fn register(&mut self, validator: Arc<dyn Validator>) {
        self.validators.insert(validator.level(), validator);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, validator: Arc<dyn Validator>) -> Self {
        self.register(validator);
        self
    }

    /// Validator registered exactly at `level`.
    pub fn get(&self, level: ValidationLevel) -> Option<&Arc<dyn Validator>> {
        self.validators.get(&level)
    }

    /// First validator found walking down from `level`.
    pub fn resolve(&self, level: ValidationLevel) -> Option<(ValidationLevel, Arc<dyn Validator>)> {
        level
            .fallback_chain()
            .find_map(|l| self.get(l).map(|v| (l, Arc::clone(v))))
    }

    /// Validators registered strictly below `level`, highest first.
    pub fn below(&self, level: ValidationLevel) -> Vec<Arc<dyn Validator>> {
        self.validators
            .range(..level)
            .rev()
            .map(|(_, v)| Arc::clone(v))
            .collect()
    }

    /// Registered levels, lowest first.
    pub fn levels(&self) -> Vec<ValidationLevel> {
        self.validators.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Build remote validators from configuration.
    #[cfg(feature = "http")]
    pub fn from_config(
        endpoints: &[ValidatorEndpointConfig],
        timeout: std::time::Duration,
    ) -> Result<Self, ValidatorError> {
        let mut registry = Self::new();
        for endpoint in endpoints {
            let validator = super::HttpValidator::from_config(endpoint, timeout)?;
            registry.register(Arc::new(validator));
        }
        Ok(registry)
    }

    /// Build remote validators from configuration.
    ///
    /// Remote endpoints need the `http` feature; without it they are skipped
    /// and every request uses the local fallback.
    #[cfg(not(feature = "http"))]
    pub fn from_config(
        endpoints: &[ValidatorEndpointConfig],
        _timeout: std::time::Duration,
    ) -> Result<Self, ValidatorError> {
        if !endpoints.is_empty() {
            tracing::warn!(
                count = endpoints.len(),
                "Remote validators configured but the 'http' feature is disabled; using local fallback"
            );
        }
        Ok(Self::new())
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field(
                "validators",
                &self
                    .validators
                    .iter()
                    .map(|(level, v)| (level.to_string(), v.name().to_string()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::ValidatorPayload;
    use async_trait::async_trait;
    use regattest_core::ValidationResult;

    struct MockValidator {
        level: ValidationLevel,
        name: String,
    }

    impl MockValidator {
        fn at(level: ValidationLevel) -> Arc<dyn Validator> {
            Arc::new(Self {
                level,
                name: format!("mock-{}", level),
            })
        }
    }

    #[async_trait]
    impl Validator for MockValidator {
        fn level(&self) -> ValidationLevel {
            self.level
        }

        fn name(&self) -> &str {
            &self.name
        }

        async fn validate(
            &self,
            _payload: &ValidatorPayload,
        ) -> Result<ValidationResult, ValidatorError> {
            Ok(ValidationResult::new(true, 4, self.level))
        }
    }

    #[test]
    fn test_resolve_exact_level() {
        let registry = ValidatorRegistry::new()
            .with(MockValidator::at(ValidationLevel::Context))
            .with(MockValidator::at(ValidationLevel::Text));

        let (level, validator) = registry.resolve(ValidationLevel::Context).unwrap();
        assert_eq!(level, ValidationLevel::Context);
        assert_eq!(validator.name(), "mock-L3");
    }

    #[test]
    fn test_resolve_walks_down_chain() {
        let registry = ValidatorRegistry::new().with(MockValidator::at(ValidationLevel::Text));

        let (level, _) = registry.resolve(ValidationLevel::Context).unwrap();
        assert_eq!(level, ValidationLevel::Text);
    }

    #[test]
    fn test_resolve_never_walks_up() {
        let registry = ValidatorRegistry::new().with(MockValidator::at(ValidationLevel::Context));
        assert!(registry.resolve(ValidationLevel::Pattern).is_none());
    }

    #[test]
    fn test_below_is_highest_first() {
        let registry = ValidatorRegistry::new()
            .with(MockValidator::at(ValidationLevel::Text))
            .with(MockValidator::at(ValidationLevel::Pattern))
            .with(MockValidator::at(ValidationLevel::Context));

        let names: Vec<_> = registry
            .below(ValidationLevel::Context)
            .iter()
            .map(|v| v.name().to_string())
            .collect();
        assert_eq!(names, vec!["mock-L2", "mock-L1"]);
        assert!(registry.below(ValidationLevel::Text).is_empty());
    }

    #[test]
    fn test_register_replaces_same_level() {
        let mut registry = ValidatorRegistry::new();
        registry.register(MockValidator::at(ValidationLevel::Pattern));
        registry.register(MockValidator::at(ValidationLevel::Pattern));

        assert_eq!(registry.levels(), vec![ValidationLevel::Pattern]);
        assert!(registry.get(ValidationLevel::Pattern).is_some());
    }

    #[cfg(not(feature = "http"))]
    #[test]
    fn test_from_config_without_http_is_empty() {
        let endpoints = vec![ValidatorEndpointConfig {
            level: 3,
            endpoint: "https://validators.example/context".to_string(),
            api_key: None,
            api_key_env: None,
        }];

        let registry =
            ValidatorRegistry::from_config(&endpoints, std::time::Duration::from_secs(1)).unwrap();
        assert!(registry.is_empty());
    }
}
