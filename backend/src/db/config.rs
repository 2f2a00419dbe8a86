//! Store configuration and environment variable handling.

use std::env;
use std::path::PathBuf;

use super::factory::StoreType;

/// Firestore database used when none is configured.
pub const DEFAULT_DATABASE_ID: &str = "(default)";

/// Where Google credentials are read from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CredentialsSource {
    /// A credentials JSON file at an explicit path.
    File(PathBuf),
    /// The file named by `GOOGLE_APPLICATION_CREDENTIALS`.
    Env,
    /// Application-default chain: `GOOGLE_APPLICATION_CREDENTIALS`, the
    /// gcloud well-known file, then the metadata server.
    #[default]
    Default,
}

impl CredentialsSource {
    /// Build a source from its name (`file`, `env`, `default`).
    ///
    /// `file` needs a path.
    pub fn parse(kind: &str, path: Option<PathBuf>) -> Result<Self, String> {
        match kind.trim().to_lowercase().as_str() {
            "file" => path
                .map(Self::File)
                .ok_or_else(|| "credentials source 'file' requires a credentials file path".to_string()),
            "env" => Ok(Self::Env),
            "default" | "" => Ok(Self::Default),
            other => Err(format!("Unknown credentials source: {}", other)),
        }
    }
}

/// Firestore connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirestoreConfig {
    /// Where credentials come from. Ignored when an emulator is configured.
    pub credentials: CredentialsSource,
    /// Explicit project id; otherwise resolved from env, credentials, or metadata.
    pub project_id: Option<String>,
    /// Firestore database id
    pub database_id: String,
    /// `host:port` of a Firestore emulator. Disables authentication.
    pub emulator_host: Option<String>,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            credentials: CredentialsSource::Default,
            project_id: None,
            database_id: DEFAULT_DATABASE_ID.to_string(),
            emulator_host: None,
        }
    }
}

impl FirestoreConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `FIRESTORE_CREDENTIALS`: `file` | `env` | `default` (default: `default`,
    ///   or `file` when `FIRESTORE_CREDENTIALS_FILE` is set)
    /// - `FIRESTORE_CREDENTIALS_FILE`: credentials file for the `file` source
    /// - `FIRESTORE_PROJECT_ID`: project id override
    /// - `FIRESTORE_DATABASE_ID`: database id (default: `(default)`)
    /// - `FIRESTORE_EMULATOR_HOST`: emulator `host:port`
    pub fn from_env() -> Result<Self, String> {
        let credentials_file = non_empty_var("FIRESTORE_CREDENTIALS_FILE").map(PathBuf::from);
        let credentials = match non_empty_var("FIRESTORE_CREDENTIALS") {
            Some(kind) => CredentialsSource::parse(&kind, credentials_file)?,
            None => credentials_file
                .map(CredentialsSource::File)
                .unwrap_or_default(),
        };

        Ok(Self {
            credentials,
            project_id: non_empty_var("FIRESTORE_PROJECT_ID"),
            database_id: non_empty_var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|| DEFAULT_DATABASE_ID.to_string()),
            emulator_host: non_empty_var("FIRESTORE_EMULATOR_HOST"),
        })
    }

    /// Configuration pointing at an emulator.
    pub fn emulator(host: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            emulator_host: Some(host.into()),
            ..Default::default()
        }
    }

    /// Configuration reading credentials from an explicit file.
    pub fn with_credentials_file(path: impl Into<PathBuf>) -> Self {
        Self {
            credentials: CredentialsSource::File(path.into()),
            ..Default::default()
        }
    }
}

/// Everything needed to build a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub store_type: StoreType,
    pub firestore: FirestoreConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::Firestore,
            firestore: FirestoreConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Create configuration from environment variables.
    ///
    /// `LOG_STORE` selects the backend; see [`FirestoreConfig::from_env`] for the rest.
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            store_type: StoreType::from_env()?,
            firestore: FirestoreConfig::from_env()?,
        })
    }

    /// In-memory store configuration.
    pub fn local() -> Self {
        Self {
            store_type: StoreType::Local,
            ..Default::default()
        }
    }
}

pub(crate) fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
