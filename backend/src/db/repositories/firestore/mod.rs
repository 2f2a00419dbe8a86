//! Firestore store implementation over the REST API.
//!
//! Each saved entry becomes one document created with
//! `POST .../documents/event_logs`, letting Firestore pick the document id.
//!
//! ## Configuration
//!
//! See [`FirestoreConfig`]. With an emulator host set, requests go to
//! `http://{host}/v1` and no credentials are loaded.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::db::config::{non_empty_var, FirestoreConfig};
use crate::db::repository::{
    ensure_storable, ErrorContext, LogStore, RepositoryError, RepositoryResult,
    EVENT_LOGS_COLLECTION,
};
use crate::models::LogEntry;

pub mod auth;
pub mod document;

use auth::{TokenProvider, TokenSource};
use document::{describe_error, encode_entry, CreatedDocument};

const FIRESTORE_API_BASE: &str = "https://firestore.googleapis.com/v1";

/// Firestore-backed store.
///
/// The inner `reqwest::Client` pools connections and is shared by all
/// concurrent `save` calls.
#[derive(Debug)]
pub struct FirestoreStore {
    client: reqwest::Client,
    project_id: String,
    database_id: String,
    documents_url: String,
    tokens: TokenProvider,
    closed: AtomicBool,
}

impl FirestoreStore {
    /// Resolve credentials and project, then fetch a first access token.
    ///
    /// # Errors
    /// `ConnectionError` when credentials cannot be found or read, no
    /// project id can be determined, or the token endpoint refuses them.
    pub async fn connect(config: &FirestoreConfig) -> RepositoryResult<Self> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            RepositoryError::connection_with_context(
                format!("Failed to build HTTP client: {}", e),
                ErrorContext::new("connect"),
            )
        })?;

        let source = match &config.emulator_host {
            Some(_) => TokenSource::Emulator,
            None => TokenSource::resolve(&config.credentials)?,
        };
        let project_id = resolve_project_id(config, &source, &client).await?;

        let base = match &config.emulator_host {
            Some(host) => format!("http://{}/v1", host),
            None => FIRESTORE_API_BASE.to_string(),
        };
        let documents_url = format!(
            "{}/projects/{}/databases/{}/documents",
            base, project_id, config.database_id
        );

        let tokens = TokenProvider::new(source);
        tokens
            .token(&client)
            .await
            .map_err(|e| e.with_operation("connect"))?;

        log::info!(
            "Connected to Firestore project '{}' (database {})",
            project_id,
            config.database_id
        );

        Ok(Self {
            client,
            project_id,
            database_id: config.database_id.clone(),
            documents_url,
            tokens,
            closed: AtomicBool::new(false),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.documents_url, EVENT_LOGS_COLLECTION)
    }
}

async fn resolve_project_id(
    config: &FirestoreConfig,
    source: &TokenSource,
    client: &reqwest::Client,
) -> RepositoryResult<String> {
    if let Some(id) = config.project_id.clone() {
        return Ok(id);
    }
    if let Some(id) =
        non_empty_var("GOOGLE_CLOUD_PROJECT").or_else(|| non_empty_var("GCLOUD_PROJECT"))
    {
        return Ok(id);
    }
    if let Some(id) = source.project_id() {
        return Ok(id.to_string());
    }
    if let Some(id) = source.metadata_project_id(client).await {
        return Ok(id);
    }

    Err(RepositoryError::connection_with_context(
        "Could not determine the Google Cloud project id",
        ErrorContext::new("resolve_project_id")
            .with_details("set FIRESTORE_PROJECT_ID or GOOGLE_CLOUD_PROJECT"),
    ))
}

fn save_context() -> ErrorContext {
    ErrorContext::new("save").with_entity(EVENT_LOGS_COLLECTION)
}

#[async_trait]
impl LogStore for FirestoreStore {
    async fn save(&self, entry: &LogEntry) -> RepositoryResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RepositoryError::storage_with_context(
                "store is closed",
                save_context(),
            ));
        }
        ensure_storable(entry)?;
        let body = encode_entry(entry)?;

        let token = self.tokens.token(&self.client).await.map_err(|e| {
            RepositoryError::storage_with_context(
                "Failed to obtain access token",
                save_context().with_details(e.to_string()),
            )
        })?;

        let response = self
            .client
            .post(self.collection_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                RepositoryError::storage_with_context(
                    format!("Request failed: {}", e),
                    save_context(),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<empty response>".to_string());
            return Err(RepositoryError::storage_with_context(
                format!("Firestore rejected write ({})", status),
                save_context().with_details(describe_error(&body)),
            ));
        }

        match response.json::<CreatedDocument>().await {
            Ok(created) => log::debug!("Created document {}", created.id()),
            Err(e) => log::debug!("Created document (unreadable response: {})", e),
        }
        Ok(())
    }

    async fn close(&self) -> RepositoryResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.tokens.clear().await;
            log::info!("Closed Firestore store for project '{}'", self.project_id);
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    fn name(&self) -> &'static str {
        "firestore"
    }
}
