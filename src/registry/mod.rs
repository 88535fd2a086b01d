use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};
use url::Url;

// Constants for registry client configuration
const REQUEST_TIMEOUT: u64 = 30; // seconds
const CONNECT_TIMEOUT: u64 = 10; // seconds
const DEFAULT_USER_AGENT: &str = "ProxyHerder/1.0";

// Marker the proxy store puts in a 400 body when the server is a duplicate
const ALREADY_IMPORTED_MARKER: &str = "This proxy was already imported";

/// Per-candidate registration failure
///
/// `AlreadyExists` is expected and informational; the remaining variants are
/// genuine failures. None of them abort processing of the other candidates
/// found in the same message.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("this proxy was already imported")]
    AlreadyExists,

    #[error("registry rejected the server ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("registry returned unexpected status {status}")]
    MalformedResponse { status: u16 },

    #[error("registry request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Configuration for the proxy-store registration client
///
/// Built once at startup and handed to the client by value; nothing in this
/// crate reads registry settings from ambient global state.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Base URL of the proxy store, without the `/api/proxies/` suffix
    pub base_url: String,

    /// HTTP basic auth credentials
    pub username: String,
    pub password: String,

    /// Timeout for registration requests
    pub request_timeout: Duration,

    /// Timeout for establishing new connections
    pub connect_timeout: Duration,

    /// User agent sent with every request
    pub user_agent: String,
}

impl RegistryConfig {
    /// Creates a configuration with default timeouts
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Loads the configuration from the environment
    ///
    /// Reads `SERVICE_URL`, `SERVICE_USERNAME` and `SERVICE_PASSWORD`; a
    /// missing variable is a fatal startup error.
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("SERVICE_URL").context("SERVICE_URL is not set")?;
        let username = env::var("SERVICE_USERNAME").context("SERVICE_USERNAME is not set")?;
        let password = env::var("SERVICE_PASSWORD").context("SERVICE_PASSWORD is not set")?;
        Ok(Self::new(base_url, username, password))
    }

    /// Sets the request timeout duration
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the connection timeout for establishing new connections
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP client for the proxy-store registration endpoint
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    config: RegistryConfig,
}

impl RegistryClient {
    /// Creates a registration client from the given configuration
    ///
    /// Validates the base URL up front and builds a single reqwest client
    /// that is reused for every registration call.
    ///
    /// # Arguments
    /// * `config` - Registry endpoint and credentials
    ///
    /// # Returns
    /// * `Result<RegistryClient>` - The client, or a configuration error
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let parsed = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid registry base URL: {}", config.base_url))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            anyhow::bail!("Registry base URL scheme '{}' is not allowed", parsed.scheme());
        }

        debug!(
            "Building registry client for {} with timeout {:?}",
            config.base_url, config.request_timeout
        );
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build registry HTTP client")?;

        Ok(Self { client, config })
    }

    /// Registers one server connection string with the proxy store
    ///
    /// Sends `url=<server>` as a form body with basic auth. A `201 Created`
    /// means the server was recorded; a `400` carrying the store's duplicate
    /// marker maps to `RegistryError::AlreadyExists`. Any other non-success
    /// status is reported with the store's error detail when the body parses,
    /// or as `MalformedResponse` with the raw status code when it does not.
    ///
    /// # Arguments
    /// * `server` - Canonical connection string produced by the extractor
    pub async fn register(&self, server: &str) -> Result<(), RegistryError> {
        let endpoint = format!("{}/api/proxies/", self.config.base_url.trim_end_matches('/'));
        debug!("Registering server [{}] at {}", server, endpoint);

        let body = format!("url={}", urlencoding::encode(server));
        let response = self
            .client
            .post(&endpoint)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .basic_auth(&self.config.username, Some(&self.config.password))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        trace!("Registry responded with status {}", status);

        if status == StatusCode::CREATED {
            info!("Registered server {}", server);
            return Ok(());
        }

        let body = response.text().await?;
        if status == StatusCode::BAD_REQUEST && body.contains(ALREADY_IMPORTED_MARKER) {
            info!("Server {} was already imported", server);
            return Err(RegistryError::AlreadyExists);
        }

        match parse_error_detail(&body) {
            Some(detail) => {
                warn!("Registry rejected server {} ({}): {}", server, status, detail);
                Err(RegistryError::Rejected {
                    status: status.as_u16(),
                    detail,
                })
            }
            None => {
                error!(
                    "Registry returned status {} with unparseable body for {}",
                    status, server
                );
                Err(RegistryError::MalformedResponse {
                    status: status.as_u16(),
                })
            }
        }
    }
}

/// Pulls a human-readable detail out of the store's JSON error body
///
/// The store answers errors either as a bare string, a list of messages, or a
/// field-to-messages map with an optional top-level `detail`. Anything else
/// is treated as unparseable.
fn parse_error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        serde_json::Value::Object(map) => {
            if let Some(detail) = map.get("detail").and_then(|v| v.as_str()) {
                return Some(detail.to_string());
            }
            let mut parts = Vec::new();
            for (field, errors) in &map {
                if let Some(items) = errors.as_array() {
                    let messages: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
                    if !messages.is_empty() {
                        parts.push(format!("{}: {}", field, messages.join("; ")));
                    }
                }
            }
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("; "))
            }
        }
        _ => None,
    }
}
