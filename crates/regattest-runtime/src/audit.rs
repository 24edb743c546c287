//! Audit sinks.
//!
//! Emitting is best-effort. [`AuditSink::emit`] reports failures, and the
//! orchestrator always logs and drops them. An audit failure never fails a
//! request and never blocks the response beyond a bounded attempt.
//!
//! Two implementations share the interface:
//! - [`DirectAuditSink`] writes through the store on the request path,
//!   bounded by a timeout.
//! - [`BufferedAuditSink`] enqueues onto a bounded channel drained by a
//!   background task and returns immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use regattest_core::AuditEvent;

use crate::config::{AuditConfig, AuditMode};
use crate::store::{StoreError, StoreHandle};

/// Errors from emitting an audit event.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Audit write failed: {0}")]
    Store(#[from] StoreError),

    #[error("Audit write timed out after {0:?}")]
    Timeout(Duration),

    #[error("Audit queue full")]
    QueueFull,

    #[error("Audit queue closed")]
    Closed,
}

/// Destination for audit events.
///
/// Callers must log and discard errors, never propagate them.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn emit(&self, event: AuditEvent) -> Result<(), AuditError>;
}

/// Writes each event through the store before returning.
pub struct DirectAuditSink {
    store: Arc<StoreHandle>,
    write_timeout: Duration,
}

impl DirectAuditSink {
    pub fn new(store: Arc<StoreHandle>, write_timeout: Duration) -> Self {
        Self {
            store,
            write_timeout,
        }
    }
}

#[async_trait]
impl AuditSink for DirectAuditSink {
    async fn emit(&self, event: AuditEvent) -> Result<(), AuditError> {
        let write = async {
            let store = self.store.get().await?;
            store.create_audit_event(event).await
        };

        match tokio::time::timeout(self.write_timeout, write).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => {
                self.store.invalidate();
                Err(AuditError::Store(e))
            }
            Err(_) => Err(AuditError::Timeout(self.write_timeout)),
        }
    }
}

/// Background writer behind a [`BufferedAuditSink`].
///
/// Finishes once every sender is dropped and the queue is drained.
pub struct AuditWriterTask(JoinHandle<()>);

impl AuditWriterTask {
    /// Wait for the queue to drain.
    pub async fn finished(self) {
        if let Err(e) = self.0.await {
            tracing::error!(error = %e, "Audit writer task failed");
        }
    }
}

/// Enqueues events for a background writer. Never waits on the store.
pub struct BufferedAuditSink {
    sender: mpsc::Sender<AuditEvent>,
}

impl BufferedAuditSink {
    /// Start the writer. Must be called inside a tokio runtime.
    pub fn spawn(store: Arc<StoreHandle>, capacity: usize) -> (Self, AuditWriterTask) {
        let (sender, mut receiver) = mpsc::channel::<AuditEvent>(capacity.max(1));

        let task = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let event_type = event.event_type.as_str();
                let result = match store.get().await {
                    Ok(s) => s.create_audit_event(event).await.map(|_| ()),
                    Err(e) => Err(e),
                };

                if let Err(e) = result {
                    store.invalidate();
                    tracing::warn!(
                        event_type = event_type,
                        error = %e,
                        "Buffered audit write failed, event dropped"
                    );
                }
            }
            tracing::debug!("Audit writer drained and stopped");
        });

        (Self { sender }, AuditWriterTask(task))
    }
}

#[async_trait]
impl AuditSink for BufferedAuditSink {
    async fn emit(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AuditError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => AuditError::Closed,
        })
    }
}

/// Build the sink selected by `audit.mode`.
///
/// Buffered mode also returns the writer task; it must be called inside a
/// tokio runtime.
pub fn audit_sink_from_config(
    config: &AuditConfig,
    store: Arc<StoreHandle>,
) -> (Arc<dyn AuditSink>, Option<AuditWriterTask>) {
    match config.mode {
        AuditMode::Direct => (
            Arc::new(DirectAuditSink::new(store, config.write_timeout)),
            None,
        ),
        AuditMode::Buffered => {
            let (sink, task) = BufferedAuditSink::spawn(store, config.buffer_capacity);
            (Arc::new(sink), Some(task))
        }
    }
}
