//! Store configuration file support.
//!
//! Reads `store.toml`:
//!
//! ```toml
//! [store]
//! type = "firestore"
//!
//! [firestore]
//! credentials = "file"
//! credentials_file = "service-account.json"
//! project_id = "my-project"
//! database_id = "(default)"
//! # emulator_host = "localhost:8081"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::config::{CredentialsSource, FirestoreConfig, StoreConfig, DEFAULT_DATABASE_ID};
use super::factory::StoreType;
use super::repository::RepositoryError;

const DEFAULT_LOCATIONS: [&str; 2] = ["store.toml", "backend/store.toml"];

/// Store configuration from file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreFileConfig {
    pub store: StoreSettings,
    #[serde(default)]
    pub firestore: FirestoreSettings,
}

/// Store type settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(rename = "type")]
    pub store_type: String,
}

/// Firestore connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirestoreSettings {
    #[serde(default = "default_credentials")]
    pub credentials: String,
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_database_id")]
    pub database_id: String,
    #[serde(default)]
    pub emulator_host: Option<String>,
}

impl Default for FirestoreSettings {
    fn default() -> Self {
        Self {
            credentials: default_credentials(),
            credentials_file: None,
            project_id: None,
            database_id: default_database_id(),
            emulator_host: None,
        }
    }
}

fn default_credentials() -> String {
    "default".to_string()
}

fn default_database_id() -> String {
    DEFAULT_DATABASE_ID.to_string()
}

impl StoreFileConfig {
    /// Load store configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RepositoryError::configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            RepositoryError::configuration(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Load store configuration from the default location.
    ///
    /// Searches for `store.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    ///
    /// Returns `Ok(None)` when no file exists. A file that exists but cannot
    /// be read or parsed is an error.
    pub fn from_default_location() -> Result<Option<Self>, RepositoryError> {
        Self::find_in(Path::new(""))
    }

    /// Same search as [`Self::from_default_location`], relative to `dir`.
    pub fn find_in(dir: &Path) -> Result<Option<Self>, RepositoryError> {
        for relative in DEFAULT_LOCATIONS {
            let path = dir.join(relative);
            if path.exists() {
                log::info!("Loading store configuration from {}", path.display());
                return Self::from_file(&path).map(Some);
            }
        }
        Ok(None)
    }

    /// Get the store type from configuration.
    pub fn store_type(&self) -> Result<StoreType, String> {
        StoreType::from_str(&self.store.store_type)
    }

    /// Convert into the runtime configuration.
    ///
    /// A relative `credentials_file` is kept relative to the working directory.
    pub fn to_store_config(&self) -> Result<StoreConfig, RepositoryError> {
        let store_type = self.store_type().map_err(|e| {
            RepositoryError::configuration(format!("Invalid store type: {}", e))
        })?;

        let credentials = CredentialsSource::parse(
            &self.firestore.credentials,
            self.firestore.credentials_file.clone(),
        )
        .map_err(RepositoryError::configuration)?;

        Ok(StoreConfig {
            store_type,
            firestore: FirestoreConfig {
                credentials,
                project_id: self.firestore.project_id.clone(),
                database_id: self.firestore.database_id.clone(),
                emulator_host: self.firestore.emulator_host.clone(),
            },
        })
    }
}

impl StoreConfig {
    /// Load configuration for the server.
    ///
    /// Uses the file named by `STORE_CONFIG`, else a `store.toml` in the
    /// standard locations, else environment variables.
    pub fn load() -> Result<Self, RepositoryError> {
        Self::load_in(Path::new(""))
    }

    /// [`Self::load`] with the standard locations taken relative to `dir`.
    pub fn load_in(dir: &Path) -> Result<Self, RepositoryError> {
        if let Some(path) = super::config::non_empty_var("STORE_CONFIG") {
            return StoreFileConfig::from_file(path)?.to_store_config();
        }
        match StoreFileConfig::find_in(dir)? {
            Some(file) => file.to_store_config(),
            None => Self::from_env().map_err(RepositoryError::configuration),
        }
    }
}
