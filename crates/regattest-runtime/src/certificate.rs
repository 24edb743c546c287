//! Attestation certificate issuance.
//!
//! The issuer builds the certificate, persists it through the store and
//! hands it back. The signature is a SHA-256 digest over the canonical
//! certificate payload; real signing is an external concern.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use regattest_core::{AttestationCertificate, CertificateStatus, ValidationResult};

use crate::store::{StoreError, StoreHandle};

/// Errors from certificate issuance.
#[derive(Error, Debug)]
pub enum CertificateError {
    #[error("Result is not attestable: valid={is_valid}, certainty={certainty}")]
    NotAttestable { is_valid: bool, certainty: u8 },

    #[error("Certificate validity of {0} days is out of range")]
    ValidityOutOfRange(i64),

    #[error("Failed to persist certificate: {0}")]
    Store(#[from] StoreError),
}

/// What the orchestrator asks the issuer to certify.
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    pub regulation_id: String,
    pub regulation_version: String,
    pub result: ValidationResult,
    pub issuer: String,
    pub request_id: String,
}

#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    async fn issue(
        &self,
        request: CertificateRequest,
    ) -> Result<AttestationCertificate, CertificateError>;
}

/// Issues certificates and persists them in the regulation store.
pub struct StoreCertificateIssuer {
    store: Arc<StoreHandle>,
    validity_days: i64,
}

impl StoreCertificateIssuer {
    pub fn new(store: Arc<StoreHandle>, validity_days: i64) -> Self {
        Self {
            store,
            validity_days,
        }
    }

    fn build(
        &self,
        request: &CertificateRequest,
        issued_at: DateTime<Utc>,
    ) -> Result<AttestationCertificate, CertificateError> {
        let expires_at = TimeDelta::try_days(self.validity_days)
            .and_then(|validity| issued_at.checked_add_signed(validity))
            .ok_or(CertificateError::ValidityOutOfRange(self.validity_days))?;

        let certificate_id = Uuid::new_v4().to_string();
        let signature = sign(&certificate_id, request, issued_at, expires_at);

        Ok(AttestationCertificate {
            certificate_id,
            regulation_id: request.regulation_id.clone(),
            regulation_version: request.regulation_version.clone(),
            issued_at,
            expires_at,
            issuer: request.issuer.clone(),
            signature,
            status: CertificateStatus::Active,
        })
    }
}

/// Hex SHA-256 over the pipe-joined canonical fields.
fn sign(
    certificate_id: &str,
    request: &CertificateRequest,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> String {
    let canonical = [
        certificate_id.to_string(),
        request.regulation_id.clone(),
        request.regulation_version.clone(),
        issued_at.to_rfc3339(),
        expires_at.to_rfc3339(),
        request.issuer.clone(),
        request.result.certainty_level.to_string(),
        request.result.validation_level.as_u8().to_string(),
        request.request_id.clone(),
    ]
    .join("|");

    hex::encode(Sha256::digest(canonical.as_bytes()))
}

#[async_trait]
impl CertificateIssuer for StoreCertificateIssuer {
    async fn issue(
        &self,
        request: CertificateRequest,
    ) -> Result<AttestationCertificate, CertificateError> {
        if !request.result.is_attestable() {
            return Err(CertificateError::NotAttestable {
                is_valid: request.result.is_valid,
                certainty: request.result.certainty_level,
            });
        }

        let certificate = self.build(&request, Utc::now())?;

        let store = self.store.get().await?;
        match store.create_certificate(certificate).await {
            Ok(stored) => {
                tracing::info!(
                    certificate_id = %stored.certificate_id,
                    regulation_id = %stored.regulation_id,
                    request_id = %request.request_id,
                    "Attestation certificate issued"
                );
                Ok(stored)
            }
            Err(e) => {
                self.store.invalidate();
                Err(e.into())
            }
        }
    }
}
