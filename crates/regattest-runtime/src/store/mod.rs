//! Regulation store collaborator.
//!
//! The authoritative regulation records, issued certificates and audit
//! events live in an external store. This module defines the call contract
//! ([`RegulationStore`]), an in-memory implementation for tests and local
//! runs, and the lazily connected [`StoreHandle`] the orchestrator owns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use regattest_core::{AttestationCertificate, AuditEvent, RegulationSnapshot};

mod handle;
mod memory;

pub use handle::{FixedConnector, StoreConnector, StoreHandle};
pub use memory::InMemoryRegulationStore;

/// Errors from the regulation store.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Store connection failed: {0}")]
    Connection(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store operation failed: {0}")]
    Backend(String),
}

/// Filters for [`RegulationStore::list`]. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegulationFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
}

impl RegulationFilter {
    pub fn matches(&self, snapshot: &RegulationSnapshot) -> bool {
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |c| c.eq_ignore_ascii_case(&snapshot.category));
        let jurisdiction_ok = self
            .jurisdiction
            .as_deref()
            .map_or(true, |j| j.eq_ignore_ascii_case(&snapshot.jurisdiction));
        category_ok && jurisdiction_ok
    }
}

/// One page of regulations plus the total matching count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegulationPage {
    pub items: Vec<RegulationSnapshot>,
    pub total: usize,
}

/// Call contract of the external regulation store.
#[async_trait]
pub trait RegulationStore: Send + Sync {
    /// Fetch a regulation by id. `Ok(None)` when it does not exist.
    async fn get_by_id(&self, id: &str) -> Result<Option<RegulationSnapshot>, StoreError>;

    /// List regulations. `page` is 1-based.
    async fn list(
        &self,
        filter: &RegulationFilter,
        page: usize,
        limit: usize,
    ) -> Result<RegulationPage, StoreError>;

    async fn create_certificate(
        &self,
        certificate: AttestationCertificate,
    ) -> Result<AttestationCertificate, StoreError>;

    async fn create_audit_event(&self, event: AuditEvent) -> Result<AuditEvent, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(category: &str, jurisdiction: &str) -> RegulationSnapshot {
        RegulationSnapshot {
            id: "R".to_string(),
            title: "T".to_string(),
            category: category.to_string(),
            jurisdiction: jurisdiction.to_string(),
            current_version: "1.0.0".to_string(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(RegulationFilter::default().matches(&snapshot("financial", "federal")));
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let filter = RegulationFilter {
            category: Some("Financial".to_string()),
            jurisdiction: None,
        };
        assert!(filter.matches(&snapshot("financial", "state")));
        assert!(!filter.matches(&snapshot("policy", "state")));
    }
}
