//! Store factory for dependency injection.
//!
//! This module turns a [`StoreConfig`] into the `Arc<dyn LogStore>` the
//! HTTP layer is built with.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use super::config::StoreConfig;
use super::repo_config::StoreFileConfig;
use super::repositories::{FirestoreStore, LocalRepository, UnavailableStore};
use super::repository::{LogStore, RepositoryResult};

/// Store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    /// Google Cloud Firestore
    Firestore,
    /// In-memory local store
    Local,
}

impl FromStr for StoreType {
    type Err = String;

    /// Parse store type from string ("firestore", "local").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "local" | "memory" => Ok(Self::Local),
            _ => Err(format!("Unknown store type: {}", s)),
        }
    }
}

impl StoreType {
    /// Read `LOG_STORE`; Firestore when unset.
    pub fn from_env() -> Result<Self, String> {
        match std::env::var("LOG_STORE") {
            Ok(val) if !val.trim().is_empty() => val.parse(),
            _ => Ok(Self::Firestore),
        }
    }
}

/// Factory for creating store instances.
///
/// # Example
/// ```ignore
/// use event_log_ingest::db::{StoreConfig, StoreFactory};
///
/// #[tokio::main]
/// async fn main() {
///     let config = StoreConfig::from_env().unwrap_or_default();
///     // Never fails: falls back to a store that rejects every write.
///     let store = StoreFactory::connect_or_degrade(&config).await;
///     println!("store available: {}", store.is_available());
/// }
/// ```
pub struct StoreFactory;

impl StoreFactory {
    /// Build the configured store.
    ///
    /// # Errors
    /// `ConnectionError` when the Firestore client cannot be established.
    pub async fn initialize(config: &StoreConfig) -> RepositoryResult<Arc<dyn LogStore>> {
        match config.store_type {
            StoreType::Firestore => {
                let store = FirestoreStore::connect(&config.firestore).await?;
                Ok(Arc::new(store))
            }
            StoreType::Local => Ok(Self::create_local()),
        }
    }

    /// Like [`StoreFactory::initialize`], but on failure logs a warning and
    /// returns an [`UnavailableStore`] so the server can run degraded.
    pub async fn connect_or_degrade(config: &StoreConfig) -> Arc<dyn LogStore> {
        match Self::initialize(config).await {
            Ok(store) => store,
            Err(e) => {
                log::warn!(
                    "Failed to connect to {:?} store: {}. Check GOOGLE_APPLICATION_CREDENTIALS. \
                     Running in degraded mode; events will not be persisted.",
                    config.store_type,
                    e
                );
                Self::create_unavailable(e.to_string())
            }
        }
    }

    /// Create an in-memory local store.
    pub fn create_local() -> Arc<dyn LogStore> {
        Arc::new(LocalRepository::new())
    }

    /// Create a store whose writes always fail.
    pub fn create_unavailable(reason: impl Into<String>) -> Arc<dyn LogStore> {
        Arc::new(UnavailableStore::new(reason))
    }

    /// Create a store from a TOML configuration file.
    pub async fn from_config_file<P: AsRef<Path>>(
        config_path: P,
    ) -> RepositoryResult<Arc<dyn LogStore>> {
        let config = StoreFileConfig::from_file(config_path)?.to_store_config()?;
        Self::initialize(&config).await
    }
}
