//! In-memory store for local development and tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::db::repository::{
    ensure_storable, ErrorContext, LogStore, RepositoryError, RepositoryResult,
    EVENT_LOGS_COLLECTION,
};
use crate::models::LogEntry;

/// A document as the local store keeps it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Generated document id.
    pub id: String,
    /// Collection the document was appended to.
    pub collection: &'static str,
    pub entry: LogEntry,
}

/// Append-only, process-local store.
#[derive(Debug, Default)]
pub struct LocalRepository {
    documents: RwLock<Vec<StoredDocument>>,
    closed: AtomicBool,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored document, in insertion order.
    pub fn documents(&self) -> Vec<StoredDocument> {
        self.documents.read().clone()
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

#[async_trait]
impl LogStore for LocalRepository {
    async fn save(&self, entry: &LogEntry) -> RepositoryResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RepositoryError::storage_with_context(
                "store is closed",
                ErrorContext::new("save").with_entity(EVENT_LOGS_COLLECTION),
            ));
        }
        ensure_storable(entry)?;

        let document = StoredDocument {
            id: Uuid::new_v4().simple().to_string(),
            collection: EVENT_LOGS_COLLECTION,
            entry: entry.clone(),
        };
        log::debug!("Stored local document {}", document.id);
        self.documents.write().push(document);
        Ok(())
    }

    async fn close(&self) -> RepositoryResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_available(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
