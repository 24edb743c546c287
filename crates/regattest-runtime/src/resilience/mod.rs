//! Resilience patterns for remote validator calls.
//!
//! Each call is attempted at most once. A level whose validator keeps
//! failing is short-circuited to the local fallback until it recovers.

mod circuit_breaker;

pub use circuit_breaker::{CallOutcome, CircuitBreaker, CircuitBreakerConfig, CircuitState};
