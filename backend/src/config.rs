//! Server settings read from the environment.

use std::env;

use tokio::net::TcpListener;

/// Origins allowed to post events cross-origin when none are configured.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost:3000",
    "https://mirutabi.com",
    "https://tabista.vercel.app",
];

pub const DEFAULT_PORT: u16 = 8080;

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Exact origins accepted by the CORS layer.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `HOST`: Server host (default: 0.0.0.0)
    /// - `PORT`: Server port (default: 8080)
    /// - `CORS_ALLOWED_ORIGINS`: comma-separated origin list
    ///
    /// # Errors
    /// Returns an error if `PORT` is set but is not a valid port number.
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let host = env::var("HOST")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or(defaults.host);

        let port = match env::var("PORT") {
            Ok(p) if !p.trim().is_empty() => p
                .trim()
                .parse()
                .map_err(|_| format!("PORT must be a valid port number, got '{}'", p))?,
            _ => defaults.port,
        };

        let allowed_origins = match env::var("CORS_ALLOWED_ORIGINS") {
            Ok(list) if !list.trim().is_empty() => parse_origins(&list),
            _ => defaults.allowed_origins,
        };

        Ok(Self {
            host,
            port,
            allowed_origins,
        })
    }

    /// Bind a listener on `host:port`. Host names such as `localhost` are
    /// resolved, and bare IPv6 literals like `::` are accepted.
    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind((self.host.as_str(), self.port)).await
    }
}

fn parse_origins(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
