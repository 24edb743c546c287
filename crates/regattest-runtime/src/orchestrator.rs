//! Orchestrator: owns the control flow of a validation request.
//!
//! States of one request:
//!
//! ```text
//! Received -> Validated -> Classified -> Routed -> Merged -> CertaintyGated
//!          -> (Attested | NotAttested) -> Audited -> Responded
//! ```
//!
//! Any stage failure ends in an error response. Only request-shape,
//! not-found and internal errors reach the caller; validator, audit,
//! version-service and issuer failures are absorbed and only lower
//! certainty or drop an optional part of the response.
//!
//! Batches fan out every item concurrently with an isolated error boundary
//! per item, keep input order, and are wrapped in a pre/post audit pair. A
//! panicking item becomes an internal error in its own slot.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use regattest_core::{
    generate_human_readable_summary, AggregateSummary, Aggregator, AttestationCertificate,
    AuditEvent, AuditEventType, BatchItemResult, Classification, Classifier, ItemError,
    RegulationSnapshot, RequestError, ValidationLevel, ValidationRequest, ValidationResult,
    VersionStatus,
};

use crate::audit::{audit_sink_from_config, AuditSink, AuditWriterTask};
use crate::certificate::{CertificateIssuer, CertificateRequest, StoreCertificateIssuer};
use crate::config::{AuditMode, ConfigError, RuntimeConfig};
use crate::router::{RouteOutcome, Router};
use crate::store::{RegulationFilter, RegulationPage, RegulationStore, StoreError, StoreHandle};
use crate::validator::{Validator, ValidatorRegistry};
use crate::version_service::{StoreVersionService, VersionCheck, VersionService};

/// Errors that reach the caller.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Invalid request: {}", .0.join("; "))]
    RequestShape(Vec<String>),

    #[error("Regulation not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// HTTP-style status class.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::RequestShape(_) => 400,
            Self::NotFound(_) => 404,
            Self::Internal(_) => 500,
        }
    }

    /// Stable machine code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RequestShape(_) => "request_shape",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal",
        }
    }

    /// Error record for a batch slot.
    pub fn to_item_error(&self) -> ItemError {
        ItemError {
            code: self.code().to_string(),
            message: self.to_string(),
            status: self.status_code(),
        }
    }
}

impl From<RequestError> for OrchestratorError {
    fn from(e: RequestError) -> Self {
        Self::RequestShape(e.violations())
    }
}

/// Response to a single validation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub request_id: String,
    pub regulation_id: String,
    pub regulation_version: String,
    pub authority_version: String,
    pub classification: Classification,

    /// Merged and gated result; evidence is empty when the caller opted out
    pub result: ValidationResult,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_status: Option<VersionStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<AttestationCertificate>,

    pub summary: String,
}

/// Response to a batch request. Items are in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub batch_id: String,
    pub items: Vec<BatchItemResult>,
    pub summary: AggregateSummary,
}

/// The validation orchestrator.
///
/// # Architecture
/// - Classification and gating are deterministic (regattest-core)
/// - Routing falls back locally, so remote outages only lower certainty
/// - Audit, issuance and version checks are best-effort collaborators
pub struct Orchestrator {
    store: Arc<StoreHandle>,
    router: Router,
    classifier: Classifier,
    aggregator: Aggregator,
    audit: Arc<dyn AuditSink>,
    audit_task: Option<AuditWriterTask>,
    issuer: Arc<dyn CertificateIssuer>,
    issuer_name: String,
    version_service: Arc<dyn VersionService>,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Validate a raw JSON request. The shape is checked before anything else.
    pub async fn validate_json(
        &self,
        raw: &Value,
    ) -> Result<ValidationResponse, OrchestratorError> {
        let request = ValidationRequest::from_json(raw).map_err(|e| {
            tracing::debug!(error = %e, "Rejected request shape");
            OrchestratorError::from(e)
        })?;
        self.execute(request).await
    }

    /// Validate a typed request.
    pub async fn validate(
        &self,
        request: ValidationRequest,
    ) -> Result<ValidationResponse, OrchestratorError> {
        request.validate()?;
        self.execute(request).await
    }

    async fn execute(
        &self,
        request: ValidationRequest,
    ) -> Result<ValidationResponse, OrchestratorError> {
        let request_id = Uuid::new_v4().to_string();

        let snapshot = self.fetch_snapshot(&request.regulation_id).await?;
        let classification = self.classifier.classify(&snapshot, request.requested_level);

        self.emit(
            AuditEvent::new(
                AuditEventType::ValidationRequested,
                "regulation",
                &request.regulation_id,
                "validate",
            )
            .with_metadata(json!({
                "requestId": request_id,
                "regulationVersion": request.regulation_version,
                "requestedLevel": request.requested_level.as_u8(),
                "validationLevel": classification.validation_level.as_u8(),
                "complexityScore": classification.complexity_score,
            })),
        )
        .await;

        let RouteOutcome {
            mut results,
            resolved_level,
            fallback,
        } = self
            .router
            .route(&classification, &snapshot, &request.content, &request.options)
            .await;

        let merged = if results.len() == 1 {
            results.remove(0)
        } else {
            self.aggregator.merge_validation_results(&results)
        };

        let mut result = self
            .aggregator
            .process_validation_response(merged, &request.options);

        let version_status = if request.options.check_version_changes {
            self.check_version(&request).await
        } else {
            None
        };

        let attestation = if result.is_attestable() {
            self.attest(&request, &result, &request_id).await
        } else {
            None
        };

        let summary = generate_human_readable_summary(&result);

        self.emit(
            AuditEvent::new(
                AuditEventType::ValidationCompleted,
                "regulation",
                &request.regulation_id,
                "validate",
            )
            .with_metadata(json!({
                "requestId": request_id,
                "regulationVersion": request.regulation_version,
                "validationLevel": result.validation_level.as_u8(),
                "resolvedLevel": resolved_level.map(|l| l.as_u8()),
                "isValid": result.is_valid,
                "certaintyLevel": result.certainty_level,
                "overrideReason": result.override_reason,
                "fallbackReason": fallback.map(|r| r.as_str()),
                "attested": attestation.is_some(),
                "certificateId": attestation.as_ref().map(|c| c.certificate_id.clone()),
            })),
        )
        .await;

        if !request.options.include_evidence {
            result.evidence.clear();
        }

        Ok(ValidationResponse {
            request_id,
            regulation_id: request.regulation_id,
            regulation_version: request.regulation_version,
            authority_version: snapshot.current_version,
            classification,
            result,
            version_status,
            attestation,
            summary,
        })
    }

    /// Validate many raw requests concurrently.
    ///
    /// Never fails as a whole: a failing item becomes an error record in its
    /// own slot.
    pub async fn validate_batch(&self, requests: &[Value]) -> BatchResponse {
        let batch_id = Uuid::new_v4().to_string();
        tracing::info!(batch_id = %batch_id, items = requests.len(), "Batch validation started");

        self.emit(
            AuditEvent::new(AuditEventType::BatchRequested, "batch", &batch_id, "validate_batch")
                .with_metadata(json!({ "itemCount": requests.len() })),
        )
        .await;

        let outcomes = join_all(requests.iter().map(|raw| {
            AssertUnwindSafe(self.validate_json(raw))
                .catch_unwind()
                .map(|caught| caught.unwrap_or_else(|panic| Err(panicked_item(panic))))
        }))
        .await;

        let items: Vec<BatchItemResult> = requests
            .iter()
            .zip(outcomes)
            .enumerate()
            .map(|(index, (raw, outcome))| match outcome {
                Ok(response) => BatchItemResult {
                    index,
                    regulation_id: Some(response.regulation_id),
                    validation_result: Some(response.result),
                    error: None,
                    attestation: response.attestation,
                },
                Err(e) => {
                    tracing::warn!(
                        batch_id = %batch_id,
                        index = index,
                        code = e.code(),
                        error = %e,
                        "Batch item failed"
                    );
                    BatchItemResult {
                        index,
                        regulation_id: raw
                            .get("regulationId")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        validation_result: None,
                        error: Some(e.to_item_error()),
                        attestation: None,
                    }
                }
            })
            .collect();

        let summary = self.aggregator.aggregate_results(&items);

        self.emit(
            AuditEvent::new(AuditEventType::BatchCompleted, "batch", &batch_id, "validate_batch")
                .with_metadata(json!({
                    "totalCount": summary.total_count,
                    "successCount": summary.success_count,
                    "failureCount": summary.failure_count,
                    "averageCertainty": summary.average_certainty,
                    "successRate": summary.success_rate,
                })),
        )
        .await;

        tracing::info!(
            batch_id = %batch_id,
            success = summary.success_count,
            failure = summary.failure_count,
            "Batch validation finished"
        );

        BatchResponse {
            batch_id,
            items,
            summary,
        }
    }

    /// Classify a stored regulation without validating anything.
    pub async fn classify(
        &self,
        regulation_id: &str,
        requested_level: ValidationLevel,
    ) -> Result<Classification, OrchestratorError> {
        let snapshot = self.fetch_snapshot(regulation_id).await?;
        Ok(self.classifier.classify(&snapshot, requested_level))
    }

    /// Page through regulations in the store.
    pub async fn list_regulations(
        &self,
        filter: &RegulationFilter,
        page: usize,
        limit: usize,
    ) -> Result<RegulationPage, OrchestratorError> {
        let store = self.connect().await?;
        store
            .list(filter, page, limit)
            .await
            .map_err(|e| self.store_failure(e))
    }

    /// Proxy the store's health check.
    pub async fn health(&self) -> Result<(), OrchestratorError> {
        let store = self.connect().await?;
        store.health_check().await.map_err(|e| self.store_failure(e))
    }

    /// Drop the audit sink and wait for buffered events to be written.
    pub async fn shutdown(self) {
        let Self {
            audit, audit_task, ..
        } = self;
        drop(audit);
        if let Some(task) = audit_task {
            task.finished().await;
        }
    }

    async fn connect(&self) -> Result<Arc<dyn RegulationStore>, OrchestratorError> {
        self.store.get().await.map_err(|e| self.store_failure(e))
    }

    async fn fetch_snapshot(&self, id: &str) -> Result<RegulationSnapshot, OrchestratorError> {
        let store = self.connect().await?;
        match store.get_by_id(id).await {
            Ok(Some(snapshot)) => Ok(snapshot),
            Ok(None) | Err(StoreError::NotFound(_)) => {
                Err(OrchestratorError::NotFound(id.to_string()))
            }
            Err(e) => Err(self.store_failure(e)),
        }
    }

    /// Invalidate the store handle and surface the failure as internal.
    fn store_failure(&self, error: StoreError) -> OrchestratorError {
        self.store.invalidate();
        tracing::error!(error = %error, "Regulation store failure");
        OrchestratorError::Internal(error.to_string())
    }

    async fn check_version(&self, request: &ValidationRequest) -> Option<VersionStatus> {
        let check = VersionCheck::new(&request.regulation_id, &request.regulation_version);
        match self.version_service.check_version(&check).await {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::warn!(
                    regulation_id = %request.regulation_id,
                    error = %e,
                    "Version check failed, omitting drift status"
                );
                None
            }
        }
    }

    async fn attest(
        &self,
        request: &ValidationRequest,
        result: &ValidationResult,
        request_id: &str,
    ) -> Option<AttestationCertificate> {
        let certificate_request = CertificateRequest {
            regulation_id: request.regulation_id.clone(),
            regulation_version: request.regulation_version.clone(),
            result: result.clone(),
            issuer: self.issuer_name.clone(),
            request_id: request_id.to_string(),
        };

        match self.issuer.issue(certificate_request).await {
            Ok(certificate) => Some(certificate),
            Err(e) => {
                tracing::warn!(
                    regulation_id = %request.regulation_id,
                    request_id = %request_id,
                    error = %e,
                    "Certificate issuance failed, responding without attestation"
                );
                None
            }
        }
    }

    /// Best-effort audit: failures are logged and dropped.
    async fn emit(&self, event: AuditEvent) {
        let event_type = event.event_type.as_str();
        let entity_id = event.entity_id.clone();
        if let Err(e) = self.audit.emit(event).await {
            tracing::warn!(
                event_type = event_type,
                entity_id = %entity_id,
                error = %e,
                "Audit emit failed, continuing"
            );
        }
    }
}

/// Builder for [`Orchestrator`].
pub struct OrchestratorBuilder {
    store: Option<Arc<StoreHandle>>,
    config: RuntimeConfig,
    validators: Vec<Arc<dyn Validator>>,
    audit: Option<Arc<dyn AuditSink>>,
    issuer: Option<Arc<dyn CertificateIssuer>>,
    version_service: Option<Arc<dyn VersionService>>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            config: RuntimeConfig::default(),
            validators: Vec::new(),
            audit: None,
            issuer: None,
            version_service: None,
        }
    }

    /// Use an already open store.
    pub fn store(mut self, store: Arc<dyn RegulationStore>) -> Self {
        self.store = Some(Arc::new(StoreHandle::from_store(store)));
        self
    }

    /// Use a lazily connected store handle.
    pub fn store_handle(mut self, handle: Arc<StoreHandle>) -> Self {
        self.store = Some(handle);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a validator. Overrides a configured endpoint at the same level.
    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn certificate_issuer(mut self, issuer: Arc<dyn CertificateIssuer>) -> Self {
        self.issuer = Some(issuer);
        self
    }

    pub fn version_service(mut self, service: Arc<dyn VersionService>) -> Self {
        self.version_service = Some(service);
        self
    }

    /// Build the orchestrator.
    ///
    /// Collaborators not set explicitly default to the store-backed ones.
    /// Buffered audit mode spawns its writer, so it needs a tokio runtime.
    pub fn build(self) -> Result<Orchestrator, ConfigError> {
        self.config.validate()?;

        let store = self
            .store
            .ok_or_else(|| ConfigError::Invalid("No regulation store configured".to_string()))?;

        let mut registry =
            ValidatorRegistry::from_config(&self.config.validators, self.config.validator_timeout)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        for validator in self.validators {
            registry.register(validator);
        }

        let (audit, audit_task) = match self.audit {
            Some(sink) => (sink, None),
            None => {
                if self.config.audit.mode == AuditMode::Buffered
                    && tokio::runtime::Handle::try_current().is_err()
                {
                    return Err(ConfigError::Invalid(
                        "Buffered audit mode requires a tokio runtime".to_string(),
                    ));
                }
                audit_sink_from_config(&self.config.audit, Arc::clone(&store))
            }
        };

        let issuer = self.issuer.unwrap_or_else(|| {
            Arc::new(StoreCertificateIssuer::new(
                Arc::clone(&store),
                self.config.attestation.validity_days,
            ))
        });

        let version_service = self
            .version_service
            .unwrap_or_else(|| Arc::new(StoreVersionService::new(Arc::clone(&store))));

        Ok(Orchestrator {
            router: Router::new(registry, &self.config),
            classifier: Classifier::new(),
            aggregator: Aggregator::new(),
            audit,
            audit_task,
            issuer,
            issuer_name: self.config.attestation.issuer.clone(),
            version_service,
            store,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn panicked_item(panic: Box<dyn Any + Send>) -> OrchestratorError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_default();
    tracing::error!(panic = %message, "Batch item panicked");
    OrchestratorError::Internal("validation task panicked".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRegulationStore;
    use regattest_core::RegulationSnapshot;

    fn store() -> Arc<InMemoryRegulationStore> {
        Arc::new(InMemoryRegulationStore::with_regulations([RegulationSnapshot {
            id: "R1".to_string(),
            title: "Campus parking".to_string(),
            category: "facilities".to_string(),
            jurisdiction: "institutional".to_string(),
            current_version: "1.2.3".to_string(),
            metadata: Default::default(),
        }]))
    }

    #[test]
    fn test_error_codes() {
        let shape = OrchestratorError::RequestShape(vec!["bad".to_string()]);
        assert_eq!(shape.status_code(), 400);
        assert_eq!(shape.code(), "request_shape");

        let missing = OrchestratorError::NotFound("R9".to_string());
        assert_eq!(missing.status_code(), 404);
        assert_eq!(missing.to_item_error().code, "not_found");

        let internal = OrchestratorError::Internal("boom".to_string());
        assert_eq!(internal.status_code(), 500);
        assert_eq!(internal.code(), "internal");
    }

    #[test]
    fn test_build_requires_store() {
        assert!(matches!(
            Orchestrator::builder().build(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_buffered_audit_outside_runtime_is_rejected() {
        let mut config = RuntimeConfig::default();
        config.audit.mode = AuditMode::Buffered;

        let result = Orchestrator::builder().store(store()).config(config).build();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_evidence_stripped_when_not_requested() {
        let orchestrator = Orchestrator::builder().store(store()).build().unwrap();

        let response = orchestrator
            .validate_json(&json!({
                "regulationId": "R1",
                "regulationVersion": "1.2.3",
                "content": { "text": "Park in lot B." },
                "options": { "includeEvidence": false }
            }))
            .await
            .unwrap();

        assert!(response.result.evidence.is_empty());
        assert!(response.result.is_valid);
        assert!(response.summary.contains("low confidence"));
    }

    #[tokio::test]
    async fn test_evidence_kept_by_default() {
        let orchestrator = Orchestrator::builder().store(store()).build().unwrap();

        let response = orchestrator
            .validate_json(&json!({
                "regulationId": "R1",
                "regulationVersion": "1.2.3",
                "content": { "text": "Park in lot B." }
            }))
            .await
            .unwrap();

        assert_eq!(response.result.evidence["fallback"], json!(true));
        assert_eq!(response.authority_version, "1.2.3");
        assert!(Uuid::parse_str(&response.request_id).is_ok());
    }

    #[tokio::test]
    async fn test_health_proxies_store() {
        let orchestrator = Orchestrator::builder().store(store()).build().unwrap();
        assert!(orchestrator.health().await.is_ok());
    }
}
