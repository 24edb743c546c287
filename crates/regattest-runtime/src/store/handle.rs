//! Lazily connected, owned handle to the regulation store.
//!
//! The handle connects on first use and reuses the connection for later
//! requests. After a failure the owner calls [`StoreHandle::invalidate`];
//! the next call reconnects. The cached connection sits in an atomic slot, so
//! readers never block and nothing is held across an await.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;

use super::{RegulationStore, StoreError};

/// Opens connections to the regulation store.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn RegulationStore>, StoreError>;
}

/// Connector that always hands out the same store.
pub struct FixedConnector(Arc<dyn RegulationStore>);

impl FixedConnector {
    pub fn new(store: Arc<dyn RegulationStore>) -> Self {
        Self(store)
    }
}

#[async_trait]
impl StoreConnector for FixedConnector {
    async fn connect(&self) -> Result<Arc<dyn RegulationStore>, StoreError> {
        Ok(Arc::clone(&self.0))
    }
}

/// `ArcSwapOption` needs a sized pointee, hence the extra `Arc` layer.
type Connection = Arc<dyn RegulationStore>;

/// Owned store handle with lazy connection and re-creation on failure.
pub struct StoreHandle {
    connector: Arc<dyn StoreConnector>,
    cached: ArcSwapOption<Connection>,
}

impl StoreHandle {
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            connector,
            cached: ArcSwapOption::empty(),
        }
    }

    /// Handle over an already open store.
    pub fn from_store(store: Arc<dyn RegulationStore>) -> Self {
        Self::new(Arc::new(FixedConnector::new(store)))
    }

    /// The cached connection, connecting first if needed.
    pub async fn get(&self) -> Result<Arc<dyn RegulationStore>, StoreError> {
        if let Some(store) = &*self.cached.load() {
            return Ok(Connection::clone(store));
        }

        let fresh = Arc::new(self.connector.connect().await?);
        tracing::debug!("Connected to regulation store");

        // Another caller may have connected while we were awaiting; first one wins
        let previous = self
            .cached
            .compare_and_swap(&None::<Arc<Connection>>, Some(Arc::clone(&fresh)));
        let store = match &*previous {
            Some(existing) => Arc::clone(existing),
            None => fresh,
        };
        Ok(Connection::clone(&store))
    }

    /// Drop the cached connection. The next [`get`](Self::get) reconnects.
    pub fn invalidate(&self) {
        if self.cached.swap(None).is_some() {
            tracing::info!("Regulation store connection invalidated");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.cached.load().is_some()
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("connected", &self.is_connected())
            .finish()
    }
}
