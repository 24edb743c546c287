//! Router: picks a validator for a level and falls back when it cannot answer.
//!
//! Resolution walks the fallback chain (3 -> 2 -> 1) to the first registered
//! validator. If none is registered, or the chosen one errors, times out or
//! has an open circuit, the local basic validator answers instead. Remote
//! failures never reach the caller; they only lower certainty.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use regattest_core::{
    Classification, FallbackReason, LocalBasicValidator, RegulationContent, RegulationSnapshot,
    ValidationLevel, ValidationOptions, ValidationResult,
};

use crate::config::RuntimeConfig;
use crate::resilience::{CallOutcome, CircuitBreaker};
use crate::validator::{
    check_remote_result, Validator, ValidatorError, ValidatorPayload, ValidatorRegistry,
};

/// What the router produced for one request.
#[derive(Debug, Clone)]
pub struct RouteOutcome {
    /// Primary result first, then any cross-validation results
    pub results: Vec<ValidationResult>,

    /// Level of the remote validator that answered, if any
    pub resolved_level: Option<ValidationLevel>,

    /// Set when the local validator answered
    pub fallback: Option<FallbackReason>,
}

impl RouteOutcome {
    fn local(result: ValidationResult, reason: FallbackReason) -> Self {
        Self {
            results: vec![result],
            resolved_level: None,
            fallback: Some(reason),
        }
    }
}

/// Why a remote call produced no result.
#[derive(Debug)]
enum CallError {
    /// The level's circuit refused the call
    Rejected(FallbackReason),
    Failed(ValidatorError),
}

impl CallError {
    fn reason(&self) -> FallbackReason {
        match self {
            Self::Rejected(reason) => *reason,
            Self::Failed(ValidatorError::Timeout(_)) => FallbackReason::Timeout,
            Self::Failed(_) => FallbackReason::ValidatorError,
        }
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(reason) => write!(f, "call rejected: {}", reason.as_str()),
            Self::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// Level-based validator router.
pub struct Router {
    registry: ValidatorRegistry,
    circuits: CircuitBreaker,
    local: LocalBasicValidator,
    timeout: Duration,
    cross_validate: bool,
}

impl Router {
    pub fn new(registry: ValidatorRegistry, config: &RuntimeConfig) -> Self {
        tracing::info!(
            levels = ?registry.levels(),
            cross_validate = config.cross_validate,
            "Remote validators registered"
        );
        Self {
            registry,
            circuits: CircuitBreaker::new(config.circuit_breaker.clone()),
            local: LocalBasicValidator::new(),
            timeout: config.validator_timeout,
            cross_validate: config.cross_validate,
        }
    }

    /// Route a request at the classification's level.
    pub async fn route(
        &self,
        classification: &Classification,
        snapshot: &RegulationSnapshot,
        content: &RegulationContent,
        options: &ValidationOptions,
    ) -> RouteOutcome {
        let level = classification.validation_level;

        let Some((resolved, validator)) = self.registry.resolve(level) else {
            tracing::debug!(
                regulation_id = %snapshot.id,
                level = %level,
                "No validator registered, using local validator"
            );
            return RouteOutcome::local(
                self.local
                    .validate_as_fallback(content, FallbackReason::NoValidatorRegistered, level),
                FallbackReason::NoValidatorRegistered,
            );
        };

        let payload = ValidatorPayload::new(snapshot, content, options);

        let primary = match self.call(resolved, &validator, &payload).await {
            Ok(result) => result,
            Err(e) => {
                let reason = e.reason();
                tracing::warn!(
                    regulation_id = %snapshot.id,
                    level = %resolved,
                    validator = validator.name(),
                    reason = reason.as_str(),
                    error = %e,
                    "Validator failed, falling back to local validator"
                );
                return RouteOutcome::local(
                    self.local.validate_as_fallback(content, reason, level),
                    reason,
                );
            }
        };

        let mut results = vec![primary];

        if self.cross_validate {
            results.extend(self.cross_validate_below(resolved, &payload).await);
        }

        RouteOutcome {
            results,
            resolved_level: Some(resolved),
            fallback: None,
        }
    }

    /// Run every validator below `level` concurrently. Failed ones are
    /// left out rather than replaced by the local validator.
    async fn cross_validate_below(
        &self,
        level: ValidationLevel,
        payload: &ValidatorPayload,
    ) -> Vec<ValidationResult> {
        let lower = self.registry.below(level);
        let outcomes = join_all(lower.iter().map(|v| self.call(v.level(), v, payload))).await;

        lower
            .iter()
            .zip(outcomes)
            .filter_map(|(validator, outcome)| match outcome {
                Ok(result) => Some(result),
                Err(e) => {
                    tracing::warn!(
                        level = %validator.level(),
                        validator = validator.name(),
                        error = %e,
                        "Cross-validator failed, omitting its result"
                    );
                    None
                }
            })
            .collect()
    }

    /// One remote call behind the level's circuit and the timeout. Never retried.
    async fn call(
        &self,
        level: ValidationLevel,
        validator: &Arc<dyn Validator>,
        payload: &ValidatorPayload,
    ) -> Result<ValidationResult, CallError> {
        self.circuits.admit(level).map_err(CallError::Rejected)?;

        let result = match tokio::time::timeout(self.timeout, validator.validate(payload)).await {
            Ok(answer) => answer.and_then(check_remote_result),
            Err(_) => Err(ValidatorError::Timeout(self.timeout)),
        };

        let outcome = if result.is_ok() {
            CallOutcome::Success
        } else {
            CallOutcome::Failure
        };
        self.circuits.record(level, outcome);

        result.map_err(CallError::Failed)
    }
}
