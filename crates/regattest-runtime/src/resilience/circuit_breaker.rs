//! Per-level circuits in front of the remote validators.
//!
//! There is one circuit per [`ValidationLevel`], held in a fixed array. A
//! circuit opens after `failure_threshold` consecutive failures and then
//! rejects calls with [`FallbackReason::CircuitOpen`], so the router answers
//! locally. Once `recovery_timeout` has passed, exactly one trial call is
//! admitted at a time; `success_threshold` successful trials close the
//! circuit and a failed trial reopens it.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use regattest_core::{FallbackReason, ValidationLevel};

use crate::config::duration_human;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open a level's circuit
    pub failure_threshold: u32,

    /// How long an open circuit rejects calls before a trial call
    #[serde(with = "duration_human")]
    pub recovery_timeout: Duration,

    /// Successful trial calls needed to close the circuit again
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed {
        consecutive_failures: u32,
    },

    Open {
        since: Instant,
    },

    /// Recovering. `trial` is set while an admitted trial call has not reported.
    HalfOpen {
        successes: u32,
        trial: Option<Instant>,
    },
}

impl CircuitState {
    const CLOSED: Self = Self::Closed {
        consecutive_failures: 0,
    };
}

/// What a remote call amounted to, as fed back to its circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Failure,
}

/// Circuits for validation levels 1..=3.
pub struct CircuitBreaker {
    circuits: [Mutex<CircuitState>; 3],
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            circuits: std::array::from_fn(|_| Mutex::new(CircuitState::CLOSED)),
            config,
        }
    }

    fn circuit(&self, level: ValidationLevel) -> &Mutex<CircuitState> {
        &self.circuits[usize::from(level.as_u8() - 1)]
    }

    /// Ask to call the remote validator for `level`.
    ///
    /// Every admitted call must be followed by [`record`](Self::record).
    /// A trial call that never reports is written off after `recovery_timeout`.
    pub fn admit(&self, level: ValidationLevel) -> Result<(), FallbackReason> {
        let now = Instant::now();
        let mut state = self.circuit(level).lock();

        match *state {
            CircuitState::Closed { .. } => Ok(()),
            CircuitState::Open { since } => {
                if now.duration_since(since) < self.config.recovery_timeout {
                    return Err(FallbackReason::CircuitOpen);
                }
                *state = CircuitState::HalfOpen {
                    successes: 0,
                    trial: Some(now),
                };
                tracing::info!(level = %level, "Circuit half-open, admitting a trial call");
                Ok(())
            }
            CircuitState::HalfOpen {
                trial: Some(started),
                ..
            } if now.duration_since(started) < self.config.recovery_timeout => {
                Err(FallbackReason::CircuitOpen)
            }
            CircuitState::HalfOpen { successes, .. } => {
                *state = CircuitState::HalfOpen {
                    successes,
                    trial: Some(now),
                };
                Ok(())
            }
        }
    }

    /// Feed back the outcome of an admitted call.
    pub fn record(&self, level: ValidationLevel, outcome: CallOutcome) {
        let mut state = self.circuit(level).lock();

        *state = match (*state, outcome) {
            (CircuitState::Closed { .. }, CallOutcome::Success) => CircuitState::CLOSED,
            (CircuitState::Closed { consecutive_failures }, CallOutcome::Failure) => {
                let failures = consecutive_failures + 1;
                if failures >= self.config.failure_threshold {
                    tracing::warn!(
                        level = %level,
                        failures = failures,
                        "Circuit opened, level will use the local validator"
                    );
                    CircuitState::Open {
                        since: Instant::now(),
                    }
                } else {
                    CircuitState::Closed {
                        consecutive_failures: failures,
                    }
                }
            }
            (CircuitState::HalfOpen { successes, .. }, CallOutcome::Success) => {
                let successes = successes + 1;
                if successes >= self.config.success_threshold {
                    tracing::info!(level = %level, "Circuit closed after successful trial calls");
                    CircuitState::CLOSED
                } else {
                    CircuitState::HalfOpen {
                        successes,
                        trial: None,
                    }
                }
            }
            (CircuitState::HalfOpen { .. }, CallOutcome::Failure) => {
                tracing::warn!(level = %level, "Trial call failed, circuit reopened");
                CircuitState::Open {
                    since: Instant::now(),
                }
            }
            // Late report from a call admitted before the circuit opened
            (open @ CircuitState::Open { .. }, _) => open,
        };
    }

    pub fn state(&self, level: ValidationLevel) -> CircuitState {
        *self.circuit(level).lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failure_threshold: u32, success_threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold,
            success_threshold,
            ..Default::default()
        })
    }

    /// Put a level's circuit into the state it has after a long outage.
    fn expire_outage(cb: &CircuitBreaker, level: ValidationLevel) {
        let since = Instant::now()
            .checked_sub(Duration::from_secs(120))
            .unwrap();
        *cb.circuit(level).lock() = CircuitState::Open { since };
    }

    #[test]
    fn test_all_levels_start_closed() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig::default());
        for level in ValidationLevel::ALL {
            assert_eq!(cb.state(level), CircuitState::CLOSED);
            assert!(cb.admit(level).is_ok());
        }
    }

    #[test]
    fn test_consecutive_failures_open_circuit() {
        let cb = breaker(2, 1);

        cb.record(ValidationLevel::Context, CallOutcome::Failure);
        assert!(cb.admit(ValidationLevel::Context).is_ok());

        cb.record(ValidationLevel::Context, CallOutcome::Failure);
        assert_eq!(
            cb.admit(ValidationLevel::Context),
            Err(FallbackReason::CircuitOpen)
        );
    }

    #[test]
    fn test_single_failure_threshold_opens_immediately() {
        let cb = breaker(1, 1);
        cb.record(ValidationLevel::Pattern, CallOutcome::Failure);
        assert!(matches!(
            cb.state(ValidationLevel::Pattern),
            CircuitState::Open { .. }
        ));
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let cb = breaker(3, 1);

        cb.record(ValidationLevel::Pattern, CallOutcome::Failure);
        cb.record(ValidationLevel::Pattern, CallOutcome::Failure);
        cb.record(ValidationLevel::Pattern, CallOutcome::Success);
        cb.record(ValidationLevel::Pattern, CallOutcome::Failure);

        assert_eq!(
            cb.state(ValidationLevel::Pattern),
            CircuitState::Closed {
                consecutive_failures: 1
            }
        );
    }

    #[test]
    fn test_levels_are_independent() {
        let cb = breaker(1, 1);
        cb.record(ValidationLevel::Context, CallOutcome::Failure);

        assert!(cb.admit(ValidationLevel::Context).is_err());
        assert!(cb.admit(ValidationLevel::Pattern).is_ok());
        assert!(cb.admit(ValidationLevel::Text).is_ok());
    }

    #[test]
    fn test_half_open_admits_one_trial_at_a_time() {
        let cb = breaker(1, 2);
        expire_outage(&cb, ValidationLevel::Context);

        assert!(cb.admit(ValidationLevel::Context).is_ok());
        assert_eq!(
            cb.admit(ValidationLevel::Context),
            Err(FallbackReason::CircuitOpen)
        );

        cb.record(ValidationLevel::Context, CallOutcome::Success);
        assert!(cb.admit(ValidationLevel::Context).is_ok());
        cb.record(ValidationLevel::Context, CallOutcome::Success);

        assert_eq!(cb.state(ValidationLevel::Context), CircuitState::CLOSED);
    }

    #[test]
    fn test_failed_trial_reopens() {
        let cb = breaker(1, 1);
        expire_outage(&cb, ValidationLevel::Text);

        assert!(cb.admit(ValidationLevel::Text).is_ok());
        cb.record(ValidationLevel::Text, CallOutcome::Failure);

        assert_eq!(
            cb.admit(ValidationLevel::Text),
            Err(FallbackReason::CircuitOpen)
        );
    }

    #[test]
    fn test_late_report_does_not_close_open_circuit() {
        let cb = breaker(1, 1);
        cb.record(ValidationLevel::Pattern, CallOutcome::Failure);
        cb.record(ValidationLevel::Pattern, CallOutcome::Success);

        assert!(matches!(
            cb.state(ValidationLevel::Pattern),
            CircuitState::Open { .. }
        ));
    }

    #[test]
    fn test_zero_recovery_retries_right_away() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::ZERO,
            success_threshold: 1,
        });

        cb.record(ValidationLevel::Context, CallOutcome::Failure);
        assert!(cb.admit(ValidationLevel::Context).is_ok());
        cb.record(ValidationLevel::Context, CallOutcome::Success);

        assert_eq!(cb.state(ValidationLevel::Context), CircuitState::CLOSED);
    }
}
