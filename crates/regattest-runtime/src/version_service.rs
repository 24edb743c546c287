//! Version drift checks.
//!
//! Invoked only when a request sets `checkVersionChanges`. A failing
//! version service never fails the request; the drift status is omitted.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use regattest_core::{RegulationVersion, VersionDrift, VersionParseError, VersionStatus};

use crate::store::{StoreError, StoreHandle};

#[derive(Error, Debug)]
pub enum VersionServiceError {
    #[error("Unknown regulation: {0}")]
    UnknownRegulation(String),

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] VersionParseError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Query sent to the version service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionCheck {
    /// Always "checkVersion"
    pub action: String,
    pub regulation_id: String,
    pub client_version: String,
    pub timestamp: DateTime<Utc>,
}

impl VersionCheck {
    pub fn new(regulation_id: impl Into<String>, client_version: impl Into<String>) -> Self {
        Self {
            action: "checkVersion".to_string(),
            regulation_id: regulation_id.into(),
            client_version: client_version.into(),
            timestamp: Utc::now(),
        }
    }
}

#[async_trait]
pub trait VersionService: Send + Sync {
    async fn check_version(
        &self,
        check: &VersionCheck,
    ) -> Result<VersionStatus, VersionServiceError>;
}

/// Compares the client version with the store's `currentVersion`.
pub struct StoreVersionService {
    store: Arc<StoreHandle>,
}

impl StoreVersionService {
    pub fn new(store: Arc<StoreHandle>) -> Self {
        Self { store }
    }
}

/// Build the drift status between a client and the authority.
pub fn version_status(
    client_version: &str,
    authority_version: &str,
) -> Result<VersionStatus, VersionParseError> {
    let client: RegulationVersion = client_version.parse()?;
    let authority: RegulationVersion = authority_version.parse()?;

    let drift = authority.drift_from(&client);
    let changes = match drift {
        VersionDrift::Current => Vec::new(),
        other => vec![format!("{}: {} -> {}", other.as_str(), client, authority)],
    };

    Ok(VersionStatus {
        has_changes: drift != VersionDrift::Current,
        changes,
        authority_version: authority.to_string(),
    })
}

#[async_trait]
impl VersionService for StoreVersionService {
    async fn check_version(
        &self,
        check: &VersionCheck,
    ) -> Result<VersionStatus, VersionServiceError> {
        let store = self.store.get().await?;
        let snapshot = store
            .get_by_id(&check.regulation_id)
            .await?
            .ok_or_else(|| VersionServiceError::UnknownRegulation(check.regulation_id.clone()))?;

        Ok(version_status(&check.client_version, &snapshot.current_version)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRegulationStore;
    use regattest_core::RegulationSnapshot;

    #[test]
    fn test_current_version_has_no_changes() {
        let status = version_status("1.2.3", "1.2.3").unwrap();
        assert!(!status.has_changes);
        assert!(status.changes.is_empty());
        assert_eq!(status.authority_version, "1.2.3");
    }

    #[test]
    fn test_drift_kinds() {
        assert_eq!(
            version_status("1.2.3", "2.0.0").unwrap().changes,
            vec!["major: 1.2.3 -> 2.0.0"]
        );
        assert_eq!(
            version_status("1.2.3", "1.3.0").unwrap().changes,
            vec!["minor: 1.2.3 -> 1.3.0"]
        );
        assert_eq!(
            version_status("1.2.3", "1.2.9").unwrap().changes,
            vec!["patch: 1.2.3 -> 1.2.9"]
        );
    }

    #[test]
    fn test_client_ahead_is_a_change() {
        let status = version_status("3.0.0", "2.9.9").unwrap();
        assert!(status.has_changes);
        assert_eq!(status.changes, vec!["client_ahead: 3.0.0 -> 2.9.9"]);
    }

    #[test]
    fn test_bad_authority_version_is_error() {
        assert!(version_status("1.0.0", "v2").is_err());
    }

    #[tokio::test]
    async fn test_store_backed_check() {
        let store = InMemoryRegulationStore::with_regulations([RegulationSnapshot {
            id: "R1".to_string(),
            title: "T".to_string(),
            category: "policy".to_string(),
            jurisdiction: "state".to_string(),
            current_version: "1.4.0".to_string(),
            metadata: Default::default(),
        }]);
        let service = StoreVersionService::new(Arc::new(StoreHandle::from_store(Arc::new(store))));

        let status = service
            .check_version(&VersionCheck::new("R1", "1.2.3"))
            .await
            .unwrap();
        assert!(status.has_changes);
        assert_eq!(status.authority_version, "1.4.0");

        let missing = service.check_version(&VersionCheck::new("R9", "1.0.0")).await;
        assert!(matches!(missing, Err(VersionServiceError::UnknownRegulation(_))));
    }
}
