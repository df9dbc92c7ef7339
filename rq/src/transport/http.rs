//! HTTP transport backed by reqwest
//!
//! Maps HTTP 429 to a rate-limit rejection, honoring a `Retry-After` header
//! given in seconds.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Transport, TransportError};

/// HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpTransportConfig {
    /// Prefix for request paths that are not absolute URLs
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,

    /// Per-request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 30_000,
            user_agent: format!("ratequeue/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// An outbound HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL, or a path joined onto the configured base URL
    pub target: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(target: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            target: target.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn post(target: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            target: target.into(),
            headers: BTreeMap::new(),
            body: Some(body.into()),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A successful HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// reqwest-backed [`Transport`]
pub struct HttpTransport {
    http: Client,
    base_url: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &HttpTransportConfig) -> Result<Self, TransportError> {
        debug!(?config, "HttpTransport::new: called");
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    fn resolve_url(&self, target: &str) -> Result<String, TransportError> {
        if target.starts_with("http://") || target.starts_with("https://") {
            return Ok(target.to_string());
        }
        match &self.base_url {
            Some(base) => Ok(format!(
                "{}/{}",
                base.trim_end_matches('/'),
                target.trim_start_matches('/')
            )),
            None => Err(TransportError::Invalid(format!(
                "relative target '{}' with no base-url configured",
                target
            ))),
        }
    }
}

/// Parse a `Retry-After` header given as delay seconds
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}

#[async_trait]
impl Transport for HttpTransport {
    type Request = HttpRequest;
    type Response = HttpResponse;

    async fn dispatch(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.resolve_url(&request.target)?;
        debug!(method = %request.method, %url, "HttpTransport::dispatch: called");

        let mut builder = self.http.request(request.method.clone(), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = parse_retry_after(response.headers());
            debug!(?retry_after, "HttpTransport::dispatch: rate limited (429)");
            return Err(TransportError::RateLimited { retry_after });
        }

        let headers = header_map(response.headers());
        let body = response.text().await?;

        if !(200..300).contains(&status) {
            debug!(%status, "HttpTransport::dispatch: API error");
            return Err(TransportError::Status { status, message: body });
        }

        Ok(HttpResponse { status, headers, body })
    }
}
