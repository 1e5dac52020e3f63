//! HTTP transport for registry communication.
//!
//! Requests and responses are plain owned values so that a request can be
//! replayed after an authentication challenge and a response can be kept
//! around for diagnostics. [`HttpTransport`] sends them with reqwest;
//! [`AuthenticatingTransport`] wraps any [`Transport`] and answers registry
//! authentication challenges.

use crate::error::{Result, SkiffError};
use async_trait::async_trait;
use reqwest::header::{AsHeaderName, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub mod auth;

#[cfg(test)]
mod tests;

pub use auth::AuthenticatingTransport;

/// An HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Creates a request with no headers and no body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::HEAD, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    /// Sets a header, replacing any previous value.
    ///
    /// Values that are not valid header text are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use libskiff::transport::Request;
    /// use reqwest::header::ACCEPT;
    ///
    /// let request = Request::get("https://ghcr.io/v2/").with_header(ACCEPT, "application/json");
    /// assert_eq!(request.header(ACCEPT), Some("application/json"));
    /// ```
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// Sets the request body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a header in place, replacing any previous value.
    pub fn set_header(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(_) => tracing::warn!(header = %name, "dropping header with invalid value"),
        }
    }

    /// Returns the value of a header, if present and valid text.
    pub fn header(&self, name: impl AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    url: String,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    pub fn new(
        status: StatusCode,
        url: impl Into<String>,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Self {
        Self {
            status,
            url: url.into(),
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the final URL, after any redirects.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the value of a header, if present and valid text.
    pub fn header(&self, name: impl AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            SkiffError::validation_with_source(
                format!("Failed to parse JSON response from {}", self.url),
                e,
            )
        })
    }

    /// Returns the body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }
}

/// Sends HTTP requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and reads the whole response.
    ///
    /// Any status code is a successful send; only failures to exchange the
    /// request are errors.
    async fn send(&self, request: Request) -> Result<Response>;
}

/// Configuration for the HTTP transport.
///
/// # Examples
///
/// ```
/// use libskiff::transport::TransportConfig;
///
/// let config = TransportConfig::new()
///     .with_timeout(60)
///     .with_max_idle_per_host(20);
/// assert_eq!(config.timeout_seconds, 60);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// Maximum idle connections per host (default: 10)
    pub max_idle_per_host: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_idle_per_host: 10,
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request timeout in seconds.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the maximum idle connections per host.
    pub fn with_max_idle_per_host(mut self, max: usize) -> Self {
        self.max_idle_per_host = max;
        self
    }
}

/// [`Transport`] backed by a pooled reqwest client.
///
/// Redirects are followed, so blob downloads served from a storage backend
/// arrive as a single response.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: ReqwestClient,
    timeout_seconds: u64,
}

impl HttpTransport {
    /// Creates a transport with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(TransportConfig::default())
    }

    /// Creates a transport with custom configuration.
    pub fn with_config(config: TransportConfig) -> Result<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build()
            .map_err(|e| SkiffError::network_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            http_client,
            timeout_seconds: config.timeout_seconds,
        })
    }

    fn translate_reqwest_error(&self, error: reqwest::Error, url: &str) -> SkiffError {
        if error.is_timeout() {
            SkiffError::network(format!(
                "Request to {} timed out after {} seconds",
                url, self.timeout_seconds
            ))
        } else if error.is_connect() {
            SkiffError::network_with_source(format!("Failed to connect to {}", url), error)
        } else if error.is_request() {
            SkiffError::network_with_source(format!("Failed to send request to {}", url), error)
        } else {
            SkiffError::network_with_source(
                format!("Network error communicating with {}", url),
                error,
            )
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let Request {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self.http_client.request(method, &url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.translate_reqwest_error(e, &url))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            SkiffError::network_with_source(format!("Failed to read response from {}", final_url), e)
        })?;

        Ok(Response::new(status, final_url, headers, body.to_vec()))
    }
}
