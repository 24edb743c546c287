//! In-memory regulation store for tests and local runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use regattest_core::{AttestationCertificate, AuditEvent, RegulationSnapshot};

use super::{RegulationFilter, RegulationPage, RegulationStore, StoreError};

/// Regulation store held in process memory. Ordered by id.
#[derive(Debug, Default)]
pub struct InMemoryRegulationStore {
    regulations: RwLock<BTreeMap<String, RegulationSnapshot>>,
    certificates: RwLock<Vec<AttestationCertificate>>,
    audit_events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryRegulationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with snapshots.
    pub fn with_regulations(regulations: impl IntoIterator<Item = RegulationSnapshot>) -> Self {
        let store = Self::new();
        for snapshot in regulations {
            store.insert(snapshot);
        }
        store
    }

    /// Insert or replace a regulation.
    pub fn insert(&self, snapshot: RegulationSnapshot) {
        self.regulations.write().insert(snapshot.id.clone(), snapshot);
    }

    /// Certificates persisted so far.
    pub fn certificates(&self) -> Vec<AttestationCertificate> {
        self.certificates.read().clone()
    }

    /// Audit events persisted so far.
    pub fn audit_events(&self) -> Vec<AuditEvent> {
        self.audit_events.read().clone()
    }
}

#[async_trait]
impl RegulationStore for InMemoryRegulationStore {
    async fn get_by_id(&self, id: &str) -> Result<Option<RegulationSnapshot>, StoreError> {
        Ok(self.regulations.read().get(id).cloned())
    }

    async fn list(
        &self,
        filter: &RegulationFilter,
        page: usize,
        limit: usize,
    ) -> Result<RegulationPage, StoreError> {
        let regulations = self.regulations.read();
        let matching: Vec<&RegulationSnapshot> =
            regulations.values().filter(|s| filter.matches(s)).collect();

        let skip = page.saturating_sub(1).saturating_mul(limit);
        let items = matching
            .iter()
            .skip(skip)
            .take(limit)
            .map(|s| (*s).clone())
            .collect();

        Ok(RegulationPage {
            items,
            total: matching.len(),
        })
    }

    async fn create_certificate(
        &self,
        certificate: AttestationCertificate,
    ) -> Result<AttestationCertificate, StoreError> {
        self.certificates.write().push(certificate.clone());
        Ok(certificate)
    }

    async fn create_audit_event(&self, event: AuditEvent) -> Result<AuditEvent, StoreError> {
        self.audit_events.write().push(event.clone());
        Ok(event)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: &str, category: &str) -> RegulationSnapshot {
        RegulationSnapshot {
            id: id.to_string(),
            title: format!("Regulation {}", id),
            category: category.to_string(),
            jurisdiction: "state".to_string(),
            current_version: "1.0.0".to_string(),
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let store = InMemoryRegulationStore::with_regulations([snapshot("R1", "policy")]);

        assert_eq!(store.get_by_id("R1").await.unwrap().unwrap().id, "R1");
        assert!(store.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_pages_and_filters() {
        let store = InMemoryRegulationStore::with_regulations([
            snapshot("R1", "policy"),
            snapshot("R2", "financial"),
            snapshot("R3", "policy"),
            snapshot("R4", "policy"),
        ]);

        let filter = RegulationFilter {
            category: Some("policy".to_string()),
            jurisdiction: None,
        };

        let first = store.list(&filter, 1, 2).await.unwrap();
        assert_eq!(first.total, 3);
        let ids: Vec<_> = first.items.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["R1", "R3"]);

        let second = store.list(&filter, 2, 2).await.unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].id, "R4");

        let beyond = store.list(&filter, 5, 2).await.unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 3);
    }
}
