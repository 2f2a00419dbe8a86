//! Degraded-mode store used when the real store could not be reached at startup.

use async_trait::async_trait;

use crate::db::repository::{
    ErrorContext, LogStore, RepositoryError, RepositoryResult, EVENT_LOGS_COLLECTION,
};
use crate::models::LogEntry;

/// Store whose writes always fail.
///
/// Keeps the reason the real store could not be initialized so every
/// failed write can be traced back to it in the logs.
#[derive(Debug, Clone)]
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[async_trait]
impl LogStore for UnavailableStore {
    async fn save(&self, _entry: &LogEntry) -> RepositoryResult<()> {
        Err(RepositoryError::storage_with_context(
            "store unavailable",
            ErrorContext::new("save")
                .with_entity(EVENT_LOGS_COLLECTION)
                .with_details(self.reason.clone()),
        ))
    }

    async fn close(&self) -> RepositoryResult<()> {
        Ok(())
    }

    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}
