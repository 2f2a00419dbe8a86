//! Google credential discovery and OAuth access tokens for Firestore.
//!
//! Supported sources:
//! - `service_account` key files: an RS256-signed JWT assertion is exchanged
//!   at the key's token endpoint.
//! - `authorized_user` files (written by `gcloud auth application-default login`):
//!   the refresh token is exchanged for an access token.
//! - The GCE metadata server, as the last step of the default chain.
//! - The Firestore emulator, which accepts the fixed `owner` token.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::db::config::{non_empty_var, CredentialsSource};
use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};

/// OAuth scope granting Firestore access.
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
const WELL_KNOWN_CREDENTIALS: &str = ".config/gcloud/application_default_credentials.json";
const EMULATOR_TOKEN: &str = "owner";

/// Per-request limit on metadata server calls, so startup off GCP does not hang.
const METADATA_TIMEOUT: Duration = Duration::from_secs(3);
/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
/// Lifetime of a signed assertion and the default token lifetime.
const TOKEN_LIFETIME_SECS: u64 = 3600;

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

/// Service account key file contents.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// User credentials written by gcloud.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUserCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub quota_project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// A Google credentials JSON file, discriminated by its `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialsFile {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUserCredentials),
}

impl CredentialsFile {
    /// Read and parse a credentials file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> RepositoryResult<Self> {
        let path = path.as_ref();
        let context = || {
            ErrorContext::new("load_credentials")
                .with_entity("credentials")
                .with_details(path.display().to_string())
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            RepositoryError::connection_with_context(
                format!("Failed to read credentials file: {}", e),
                context(),
            )
        })?;

        serde_json::from_str(&content).map_err(|e| {
            RepositoryError::connection_with_context(
                format!("Failed to parse credentials file: {}", e),
                context(),
            )
        })
    }

    /// Project id recorded in the file, if any.
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::ServiceAccount(key) => key.project_id.as_deref(),
            Self::AuthorizedUser(user) => user.quota_project_id.as_deref(),
        }
    }
}

/// Where access tokens come from once credentials are resolved.
#[derive(Debug, Clone)]
pub enum TokenSource {
    Emulator,
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUserCredentials),
    MetadataServer { host: String },
}

impl From<CredentialsFile> for TokenSource {
    fn from(file: CredentialsFile) -> Self {
        match file {
            CredentialsFile::ServiceAccount(key) => Self::ServiceAccount(key),
            CredentialsFile::AuthorizedUser(user) => Self::AuthorizedUser(user),
        }
    }
}

impl TokenSource {
    /// Resolve a credentials source into a token source.
    ///
    /// File reads happen here; no network calls are made.
    pub fn resolve(source: &CredentialsSource) -> RepositoryResult<Self> {
        match source {
            CredentialsSource::File(path) => Ok(CredentialsFile::from_file(path)?.into()),
            CredentialsSource::Env => {
                let path = non_empty_var("GOOGLE_APPLICATION_CREDENTIALS").ok_or_else(|| {
                    RepositoryError::connection_with_context(
                        "GOOGLE_APPLICATION_CREDENTIALS is not set",
                        ErrorContext::new("load_credentials").with_entity("credentials"),
                    )
                })?;
                Ok(CredentialsFile::from_file(path)?.into())
            }
            CredentialsSource::Default => {
                if let Some(path) = non_empty_var("GOOGLE_APPLICATION_CREDENTIALS") {
                    return Ok(CredentialsFile::from_file(path)?.into());
                }
                if let Some(path) = well_known_credentials_path().filter(|p| p.exists()) {
                    log::debug!("Using gcloud credentials from {}", path.display());
                    return Ok(CredentialsFile::from_file(path)?.into());
                }
                log::debug!("No credentials file found, falling back to the metadata server");
                Ok(Self::MetadataServer {
                    host: metadata_host(),
                })
            }
        }
    }

    /// Project id known without a network call.
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::ServiceAccount(key) => key.project_id.as_deref(),
            Self::AuthorizedUser(user) => user.quota_project_id.as_deref(),
            Self::Emulator | Self::MetadataServer { .. } => None,
        }
    }

    /// Ask the metadata server for the project id. Only meaningful on GCP.
    pub async fn metadata_project_id(&self, client: &reqwest::Client) -> Option<String> {
        let Self::MetadataServer { host } = self else {
            return None;
        };
        let url = format!("http://{}/computeMetadata/v1/project/project-id", host);
        let response = client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .timeout(METADATA_TIMEOUT)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        response
            .text()
            .await
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    async fn fetch(&self, client: &reqwest::Client) -> RepositoryResult<AccessToken> {
        match self {
            Self::Emulator => Ok(AccessToken {
                value: EMULATOR_TOKEN.to_string(),
                expires_at: None,
            }),
            Self::ServiceAccount(key) => {
                let assertion = sign_assertion(key)?;
                let params = [
                    ("grant_type", JWT_BEARER_GRANT),
                    ("assertion", assertion.as_str()),
                ];
                let request = client.post(&key.token_uri).form(&params);
                exchange(request, "service_account").await
            }
            Self::AuthorizedUser(user) => {
                let params = [
                    ("grant_type", "refresh_token"),
                    ("client_id", user.client_id.as_str()),
                    ("client_secret", user.client_secret.as_str()),
                    ("refresh_token", user.refresh_token.as_str()),
                ];
                let request = client.post(&user.token_uri).form(&params);
                exchange(request, "authorized_user").await
            }
            Self::MetadataServer { host } => {
                let url = format!(
                    "http://{}/computeMetadata/v1/instance/service-accounts/default/token",
                    host
                );
                let request = client
                    .get(&url)
                    .query(&[("scopes", DATASTORE_SCOPE)])
                    .header("Metadata-Flavor", "Google")
                    .timeout(METADATA_TIMEOUT);
                exchange(request, "metadata_server").await
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Emulator => "emulator",
            Self::ServiceAccount(_) => "service_account",
            Self::AuthorizedUser(_) => "authorized_user",
            Self::MetadataServer { .. } => "metadata_server",
        }
    }
}

fn well_known_credentials_path() -> Option<PathBuf> {
    non_empty_var("HOME").map(|home| PathBuf::from(home).join(WELL_KNOWN_CREDENTIALS))
}

fn metadata_host() -> String {
    non_empty_var("GCE_METADATA_HOST").unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string())
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

fn sign_assertion(key: &ServiceAccountKey) -> RepositoryResult<String> {
    let context = || {
        ErrorContext::new("sign_assertion")
            .with_entity("credentials")
            .with_details(key.client_email.clone())
    };

    let iat = Utc::now().timestamp();
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: DATASTORE_SCOPE,
        aud: &key.token_uri,
        iat,
        exp: iat + TOKEN_LIFETIME_SECS as i64,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
        RepositoryError::connection_with_context(format!("Invalid private key: {}", e), context())
    })?;

    encode(&header, &claims, &encoding_key).map_err(|e| {
        RepositoryError::connection_with_context(
            format!("Failed to sign token assertion: {}", e),
            context(),
        )
    })
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

async fn exchange(request: reqwest::RequestBuilder, kind: &str) -> RepositoryResult<AccessToken> {
    let context = || ErrorContext::new("fetch_token").with_entity(kind.to_string());

    let response = request.send().await.map_err(|e| {
        RepositoryError::connection_with_context(
            format!("Failed to request access token: {}", e),
            context(),
        )
    })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<empty response>".to_string());

    if !status.is_success() {
        return Err(RepositoryError::connection_with_context(
            format!("Token request failed ({}): {}", status, body.trim()),
            context(),
        ));
    }

    let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
        RepositoryError::connection_with_context(
            format!("Failed to parse token response: {}", e),
            context(),
        )
    })?;

    let lifetime = Duration::from_secs(token.expires_in.unwrap_or(TOKEN_LIFETIME_SECS));
    Ok(AccessToken {
        value: token.access_token,
        expires_at: Some(Instant::now() + lifetime),
    })
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    /// `None` never expires.
    expires_at: Option<Instant>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        match self.expires_at {
            None => true,
            Some(at) => Instant::now() + EXPIRY_MARGIN < at,
        }
    }
}

/// Hands out bearer tokens, refreshing them shortly before expiry.
#[derive(Debug)]
pub struct TokenProvider {
    source: TokenSource,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenProvider {
    pub fn new(source: TokenSource) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &TokenSource {
        &self.source
    }

    /// Current bearer token. Concurrent callers share one refresh.
    pub async fn token(&self, client: &reqwest::Client) -> RepositoryResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        log::debug!("Fetching access token ({})", self.source.kind());
        let token = self.source.fetch(client).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Drop any cached token.
    pub async fn clear(&self) {
        self.cached.lock().await.take();
    }
}
