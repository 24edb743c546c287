//! # regattest-runtime
//!
//! Async orchestration for regattest: routes classified requests to remote
//! validators, merges and gates their verdicts, issues attestation
//! certificates and records audit events.
//!
//! ## Architecture
//!
//! ```text
//! request ─► Orchestrator ─► Classifier (core)
//!                 │
//!                 ├─► Router ─► Validator (L3 → L2 → L1) ─► local fallback
//!                 │               └─ CircuitBreaker per level
//!                 ├─► Aggregator (core): merge, gate, summary
//!                 ├─► VersionService      (optional)
//!                 ├─► CertificateIssuer   (certainty >= 4)
//!                 └─► AuditSink           (best-effort)
//! ```
//!
//! ## Failure Handling
//!
//! - Remote validator failures fall back to the local validator
//! - Audit, issuance and version-check failures are logged and absorbed
//! - Only request-shape, not-found and internal errors reach the caller
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use regattest_runtime::{InMemoryRegulationStore, Orchestrator, RuntimeConfig};
//!
//! let orchestrator = Orchestrator::builder()
//!     .config(RuntimeConfig::from_yaml_file("regattest.yaml")?)
//!     .store(Arc::new(InMemoryRegulationStore::with_regulations(snapshots)))
//!     .build()?;
//!
//! let response = orchestrator.validate_json(&request).await?;
//! println!("{}", response.summary);
//! orchestrator.shutdown().await;
//! ```

pub mod audit;
pub mod certificate;
pub mod config;
pub mod orchestrator;
pub mod resilience;
pub mod router;
pub mod store;
pub mod validator;
pub mod version_service;

// Re-exports
pub use audit::{
    audit_sink_from_config, AuditError, AuditSink, AuditWriterTask, BufferedAuditSink,
    DirectAuditSink,
};
pub use certificate::{
    CertificateError, CertificateIssuer, CertificateRequest, StoreCertificateIssuer,
};
pub use config::{
    AttestationConfig, AuditConfig, AuditMode, ConfigError, RuntimeConfig, ValidatorEndpointConfig,
};
pub use orchestrator::{
    BatchResponse, Orchestrator, OrchestratorBuilder, OrchestratorError, ValidationResponse,
};
pub use resilience::{CallOutcome, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use router::{RouteOutcome, Router};
pub use store::{
    FixedConnector, InMemoryRegulationStore, RegulationFilter, RegulationPage, RegulationStore,
    StoreConnector, StoreError, StoreHandle,
};
pub use validator::{ApiCredential, Validator, ValidatorError, ValidatorPayload, ValidatorRegistry};
pub use version_service::{
    version_status, StoreVersionService, VersionCheck, VersionService, VersionServiceError,
};

#[cfg(feature = "http")]
pub use validator::HttpValidator;
