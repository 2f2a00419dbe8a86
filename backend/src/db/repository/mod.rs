//! Store trait shared by every backend.
//!
//! The HTTP layer only ever sees `Arc<dyn LogStore>`. Whether that is the
//! Firestore client, the in-memory store, or the always-failing degraded
//! store is decided once at startup by [`crate::db::StoreFactory`].

use async_trait::async_trait;

use crate::models::LogEntry;

pub mod error;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

/// Name of the collection every accepted event is appended to.
pub const EVENT_LOGS_COLLECTION: &str = "event_logs";

/// Write-only sink for [`LogEntry`] records.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Append `entry` as a new document in [`EVENT_LOGS_COLLECTION`].
    ///
    /// The entry must already carry a timestamp. The generated document id
    /// is not returned. Nothing is retried, so calling this twice stores two
    /// documents.
    async fn save(&self, entry: &LogEntry) -> RepositoryResult<()>;

    /// Release the underlying connection. Later `save` calls fail.
    async fn close(&self) -> RepositoryResult<()>;

    /// Whether writes are expected to reach the store.
    fn is_available(&self) -> bool;

    /// Short backend label used in logs.
    fn name(&self) -> &'static str;
}

/// Reject entries that reach a store without a timestamp or event type.
pub(crate) fn ensure_storable(entry: &LogEntry) -> RepositoryResult<()> {
    entry.validate()?;
    if !entry.has_timestamp() {
        return Err(RepositoryError::validation_with_context(
            "entry has no timestamp",
            ErrorContext::new("save").with_entity(EVENT_LOGS_COLLECTION),
        ));
    }
    Ok(())
}
