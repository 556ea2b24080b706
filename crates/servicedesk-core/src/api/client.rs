//! Transport client for the admin REST API.
//!
//! Every outgoing request passes through two hooks:
//! - before sending, the current auth token is read from the session store
//!   and attached verbatim as the `Authorization` header (empty when absent)
//! - after receiving, a 401 carrying `{"status": "session_expired"}` tears
//!   the session down and publishes `SessionEvent::Invalidated`; every other
//!   failure is returned to the caller as a typed `ApiError`

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Request, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::request::{join_url, ApiResponse, RequestEnvelope};
use super::ApiError;
use crate::session::Session;

/// Content type sent with every request unless overridden
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Body `status` value the server uses to signal an expired session
const SESSION_EXPIRED_STATUS: &str = "session_expired";

/// Fixed settings for a transport client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub base_url: String,
    /// `None` disables the request timeout entirely; a hung request then
    /// never completes.
    pub timeout: Option<Duration>,
    pub content_type: String,
}

impl TransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: Option<String>,
}

fn is_session_expired(status: StatusCode, body: &str) -> bool {
    status == StatusCode::UNAUTHORIZED
        && serde_json::from_str::<StatusBody>(body)
            .ok()
            .and_then(|b| b.status)
            .is_some_and(|s| s == SESSION_EXPIRED_STATUS)
}

/// HTTP client bound to one base URL and one session.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct TransportClient {
    client: Client,
    base_url: Arc<str>,
    session: Session,
}

impl TransportClient {
    pub fn new(config: &TransportConfig, session: Session) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(&config.content_type).context("Invalid content type")?,
        );

        let mut builder = Client::builder().default_headers(default_headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: Arc::from(config.base_url.as_str()),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Header value for the current token. Never fails: a missing or
    /// unencodable token yields an empty value.
    fn auth_header_value(&self) -> HeaderValue {
        match self.session.token() {
            Some(token) => HeaderValue::from_str(&token).unwrap_or_else(|_| {
                warn!("Stored auth token is not a valid header value, sending empty");
                HeaderValue::from_static("")
            }),
            None => HeaderValue::from_static(""),
        }
    }

    /// Replace every `Authorization` value on the built request with the
    /// current token.
    fn authorize(&self, request: &mut Request) {
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, self.auth_header_value());
    }

    /// Start a request against the base URL. Finish it with [`send`], which
    /// attaches credentials.
    ///
    /// [`send`]: TransportClient::send
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    pub async fn execute(&self, envelope: RequestEnvelope) -> Result<ApiResponse, ApiError> {
        let RequestEnvelope {
            method,
            path,
            query,
            body,
            headers,
        } = envelope;

        let mut builder = self.request(method, &path).headers(headers);
        if let Some(ref query) = query {
            builder = builder.query(query);
        }
        if let Some(ref body) = body {
            builder = builder.json(body);
        }
        self.send(builder).await
    }

    pub async fn send(&self, builder: RequestBuilder) -> Result<ApiResponse, ApiError> {
        let mut request = builder
            .build()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.authorize(&mut request);
        debug!(method = %request.method(), url = %request.url(), "Sending request");
        let result = self.client.execute(request).await;
        self.intercept(result).await
    }

    async fn intercept(&self, result: reqwest::Result<Response>) -> Result<ApiResponse, ApiError> {
        let response = result.map_err(|e| {
            warn!(error = %e, "Request failed before a response arrived");
            ApiError::Network(e)
        })?;

        let status = response.status();
        debug!(status = %status, url = %response.url(), "Response received");
        if status.is_success() {
            return ApiResponse::read(response).await;
        }

        let body = response.text().await.map_err(|e| {
            warn!(status = %status, error = %e, "Failed to read error response body");
            ApiError::Network(e)
        })?;
        if is_session_expired(status, &body) {
            self.session.invalidate();
            return Err(ApiError::SessionExpired);
        }
        Err(ApiError::from_status(status, &body))
    }
}
