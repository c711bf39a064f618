use crate::config::{AssetKey, SiteConfig};
use crate::wire::{error_message, extract_collection};
use crate::{Caster, Match, Team};
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    /// Non-2xx response. `message` is the server's own text when it sent one.
    Api { status: u16, message: String, url: String },
    Parsing(String, String),
    /// Rejected locally before any request was made.
    Validation(String),
    Unauthorized(String),
    NotFound(String),
    Io(std::io::Error, String),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api { status, message, url } => {
                write!(f, "API error {status} for {url}: {message}")
            }
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::Validation(msg) => write!(f, "Invalid input: {msg}"),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Io(e, path) => write!(f, "I/O error for {path}: {e}"),
            ApiError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Text for a notice shown to the operator: the server's message or the
    /// validation reason verbatim, anything else in full.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Api { message, .. } => message.clone(),
            ApiError::Validation(msg) | ApiError::Unauthorized(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Which attempt of the fetch chain produced the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Remote,
    Static,
    Direct,
}

impl fmt::Display for FetchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FetchSource::Remote => "remote",
            FetchSource::Static => "static",
            FetchSource::Direct => "direct",
        })
    }
}

/// Everything a view needs to locate data and media.
pub trait SiteAdapter {
    fn config(&self) -> &SiteConfig;

    fn fetch_json(&self, endpoint: &str) -> impl Future<Output = ApiResult<Value>> + Send;

    fn build_api_url(&self, endpoint: &str) -> String {
        self.config().build_api_url(endpoint)
    }

    fn resolve_media_url(&self, path: &str) -> String {
        self.config().resolve_media_url(path)
    }

    fn default_asset(&self, key: AssetKey) -> &str {
        self.config().default_asset(key)
    }

    fn with_default(&self, path: Option<&str>, key: AssetKey) -> String {
        self.config().with_default(path, key)
    }
}

/// Public data shown outside the admin console. Each collection fails on its
/// own so one bad endpoint does not blank the others.
#[derive(Debug)]
pub struct PublicData {
    pub teams: ApiResult<Vec<Team>>,
    pub matches: ApiResult<Vec<Match>>,
    pub casters: ApiResult<Vec<Caster>>,
}

/// Client for the community tournament API.
#[derive(Debug, Clone)]
pub struct RaynuClient {
    client: Client,
    config: Arc<SiteConfig>,
    timeout: Duration,
    last_source: Arc<Mutex<Option<FetchSource>>>,
}

impl Default for RaynuClient {
    fn default() -> Self {
        Self::new(SiteConfig::default())
    }
}

impl SiteAdapter for RaynuClient {
    fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Fetch chain:
    /// 1) live API at `{api}/{endpoint}`
    /// 2) static mirror at `{static}/{endpoint}.json` (HTTP or a local directory)
    ///
    /// A disabled base skips its attempt. With both disabled the endpoint is
    /// requested as given.
    fn fetch_json(&self, endpoint: &str) -> impl Future<Output = ApiResult<Value>> + Send {
        let endpoint = endpoint.to_owned();
        async move { self.fetch_with_fallback(&endpoint).await }
    }
}

impl RaynuClient {
    pub fn new(config: SiteConfig) -> Self {
        let timeout = config.http_timeout;
        Self {
            client: Client::builder()
                .user_agent("raynu-tui/0.1 (terminal tournament client)")
                .build()
                .unwrap_or_default(),
            config: Arc::new(config),
            timeout,
            last_source: Arc::new(Mutex::new(None)),
        }
    }

    /// Source of the most recent successful fetch, if any.
    pub fn last_source(&self) -> Option<FetchSource> {
        self.last_source.lock().ok().and_then(|s| *s)
    }

    pub async fn fetch_collection<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        key: &str,
    ) -> ApiResult<Vec<T>> {
        let body = self.fetch_json(endpoint).await?;
        Ok(extract_collection(body, key))
    }

    pub async fn fetch_teams(&self) -> ApiResult<Vec<Team>> {
        self.fetch_collection("/teams", "teams").await
    }

    pub async fn fetch_matches(&self) -> ApiResult<Vec<Match>> {
        self.fetch_collection("/matches", "matches").await
    }

    pub async fn fetch_casters(&self) -> ApiResult<Vec<Caster>> {
        self.fetch_collection("/casters", "casters").await
    }

    pub async fn fetch_public(&self) -> PublicData {
        let (teams, matches, casters) =
            futures_util::join!(self.fetch_teams(), self.fetch_matches(), self.fetch_casters());
        PublicData { teams, matches, casters }
    }

    async fn fetch_with_fallback(&self, endpoint: &str) -> ApiResult<Value> {
        let mut attempts: Vec<(String, FetchSource)> = Vec::with_capacity(2);
        if let Some(url) = self.config.remote_url(endpoint) {
            attempts.push((url, FetchSource::Remote));
        }
        if let Some(url) = self.config.static_mirror_url(endpoint) {
            attempts.push((url, FetchSource::Static));
        }
        if attempts.is_empty() {
            attempts.push((endpoint.to_owned(), FetchSource::Direct));
        }

        let mut last_error: Option<ApiError> = None;
        for (url, source) in attempts {
            match self.fetch_attempt(&url, source).await {
                Ok(value) => {
                    debug!("fetched {endpoint} from {source} ({url})");
                    if let Ok(mut last) = self.last_source.lock() {
                        *last = Some(source);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    warn!("request to {url} failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ApiError::Other(format!("no source for {endpoint}"))))
    }

    async fn fetch_attempt(&self, url: &str, source: FetchSource) -> ApiResult<Value> {
        if source == FetchSource::Static && !is_http_url(url) {
            return read_local_json(url).await;
        }
        self.get_json(url).await
    }

    async fn get_json(&self, url: &str) -> ApiResult<Value> {
        self.execute(self.client.get(url), url).await
    }

    /// Send a prepared request and decode its JSON body. An empty success
    /// body decodes to `null`.
    pub(crate) async fn execute(&self, request: RequestBuilder, url: &str) -> ApiResult<Value> {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            // 403 refuses one action; only 401 says the token itself is bad
            return Err(match status {
                StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
                _ => ApiError::Api { status: status.as_u16(), message, url: url.to_owned() },
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Parsing(e.to_string(), url.to_owned()))
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }
}

fn is_http_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

async fn read_local_json(path: &str) -> ApiResult<Value> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ApiError::Io(e, path.to_owned()))?;
    serde_json::from_str(&content).map_err(|e| ApiError::Parsing(e.to_string(), path.to_owned()))
}
