//! # JSON-over-HTTP Transport
//!
//! Every remote call in this crate is a JSON request/response round trip:
//! the Sheets API, the values API and the OAuth token endpoint. The
//! [`Transport`] trait is the narrow seam between that traffic and the
//! network, so the uploader and the auth flows can be driven by a scripted
//! fake in tests.
//!
//! ```text
//! SheetsClient / OAuthClient / ServiceAccount
//!                 │  HttpRequest { method, url, headers, query, body }
//!                 ▼
//!        ┌─────────────────┐
//!        │ dyn Transport   │  ← ReqwestTransport in production
//!        └────────┬────────┘
//!                 │  HttpResponse { status, body }
//!                 ▼
//!        execute::<T>()  → status check → serde_json decode
//! ```
//!
//! ## Rust Pattern: async_trait
//!
//! Async functions in traits used as `dyn Trait` need boxing; the
//! `async_trait` attribute generates the `Pin<Box<dyn Future>>` plumbing.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::schema::ApiErrorBody;

// =============================================================================
// Request / Response
// =============================================================================

/// HTTP methods used by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

/// A JSON request, independent of any HTTP client.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Base URL, without query string.
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Query parameters, appended in order.
    pub query: Vec<(String, String)>,
    /// Encoded JSON body.
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    /// A `GET` request to `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// A `POST` request to `url`.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// A `PUT` request to `url`.
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds every header in `headers`.
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Adds a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Encodes `body` as the JSON request body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Value of the first header named `name` (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Value of the first query parameter named `name`.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A raw response: status plus undecoded body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A response with a JSON body.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// =============================================================================
// Transport Trait
// =============================================================================

/// Sends one HTTP request and returns the raw response.
///
/// Implementations only fail for transport-level problems (connection,
/// TLS, timeout). Non-2xx statuses are returned as responses and turned into
/// [`Error::Api`] by [`execute`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Sends `request` and decodes a successful JSON response into `T`.
///
/// An empty success body decodes as `{}`.
pub async fn execute<T: DeserializeOwned>(
    transport: &dyn Transport,
    request: HttpRequest,
) -> Result<T> {
    let response = transport.send(request).await?;

    if !response.is_success() {
        return Err(api_error(&response));
    }

    if response.body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(serde_json::from_slice(b"{}")?);
    }
    Ok(serde_json::from_slice(&response.body)?)
}

/// Builds an [`Error::Api`] from a non-success response.
fn api_error(response: &HttpResponse) -> Error {
    let message = serde_json::from_slice::<ApiErrorBody>(&response.body)
        .map(|body| body.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).into_owned());

    Error::Api {
        status: response.status,
        message,
    }
}

// =============================================================================
// Reqwest Transport
// =============================================================================

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a client with the configured request timeout.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(method = ?request.method, url = %request.url, "sending request");

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        debug!(status, bytes = body.len(), "received response");
        Ok(HttpResponse { status, body })
    }
}

// =============================================================================
// Tests
// =============================================================================
