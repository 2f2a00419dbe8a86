//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::LogStore;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Store every accepted event is written to. Never replaced after startup.
    pub store: Arc<dyn LogStore>,
}

impl AppState {
    /// Create a new application state with the given store.
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }
}
