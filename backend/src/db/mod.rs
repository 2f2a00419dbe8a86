//! Store adapter for event log persistence.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  HTTP Layer (handlers)                                   │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │  Arc<dyn LogStore>
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  LogStore trait (repository) - save / close              │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┼──────────────────┐
//!     ▼               ▼                  ▼
//!  FirestoreStore  LocalRepository  UnavailableStore
//!  (REST API)      (in-memory)      (degraded mode)
//! ```
//!
//! The store is chosen once at startup by [`StoreFactory`] from a
//! [`StoreConfig`], which is read from `store.toml` or the environment.

pub mod config;
pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

pub use config::{CredentialsSource, FirestoreConfig, StoreConfig};
pub use factory::{StoreFactory, StoreType};
pub use repo_config::StoreFileConfig;
pub use repositories::{FirestoreStore, LocalRepository, StoredDocument, UnavailableStore};
pub use repository::{
    ErrorContext, LogStore, RepositoryError, RepositoryResult, EVENT_LOGS_COLLECTION,
};
