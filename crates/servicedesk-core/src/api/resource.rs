//! CRUD verbs used by feature code to reach REST resources.
//!
//! `get`, `post` and `file_get` hand back the whole [`ApiResponse`] so callers
//! can inspect status and headers. `update`, `patch`, `delete` and `upload`
//! return only the decoded body.

use std::path::Path;

use anyhow::Context;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::client::TransportClient;
use super::request::{ApiResponse, Query, RequestEnvelope};
use super::ApiError;

#[derive(Serialize)]
struct PatchBody<'a, P: ?Sized> {
    params: Option<&'a P>,
    headers: Map<String, Value>,
}

/// Six-verb facade over a [`TransportClient`].
#[derive(Clone)]
pub struct ResourceClient {
    transport: TransportClient,
}

impl ResourceClient {
    pub fn new(transport: TransportClient) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &TransportClient {
        &self.transport
    }

    pub async fn get(&self, path: &str, query: Option<&Query>) -> Result<ApiResponse, ApiError> {
        let envelope = RequestEnvelope::new(Method::GET, path).query(query);
        self.transport.execute(envelope).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        let envelope = RequestEnvelope::new(Method::POST, path).json(body)?;
        self.transport.execute(envelope).await
    }

    /// Replace a resource (`PUT`).
    pub async fn update<T, B>(
        &self,
        path: &str,
        body: Option<&B>,
        query: Option<&Query>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut envelope = RequestEnvelope::new(Method::PUT, path).query(query);
        if let Some(body) = body {
            envelope = envelope.json(body)?;
        }
        self.transport.execute(envelope).await?.json()
    }

    /// Send a `PATCH` whose JSON body is `{"params": <params>, "headers": {}}`.
    ///
    /// Existing backend handlers read the update from the `params` key, so the
    /// wrapper shape is kept as-is. There is no way to send a bare body.
    pub async fn patch<T, P>(&self, path: &str, params: Option<&P>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let body = PatchBody {
            params,
            headers: Map::new(),
        };
        let envelope = RequestEnvelope::new(Method::PATCH, path).json(&body)?;
        self.transport.execute(envelope).await?.json()
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let envelope = RequestEnvelope::new(Method::DELETE, path);
        self.transport.execute(envelope).await?.json()
    }

    /// Download an opaque binary payload. The body is left undecoded.
    pub async fn file_get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        let mut envelope = RequestEnvelope::new(Method::GET, path);
        envelope
            .headers
            .insert(header::ACCEPT, header::HeaderValue::from_static("*/*"));
        self.transport.execute(envelope).await
    }

    /// Post a `multipart/form-data` body.
    pub async fn upload<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T, ApiError> {
        let builder = self.transport.request(Method::POST, path).multipart(form);
        self.transport.send(builder).await?.json()
    }
}

/// A single file destined for a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub field: String,
    pub file_name: String,
    pub content: Vec<u8>,
    pub mime: Option<String>,
}

impl UploadFile {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            content,
            mime: None,
        }
    }

    pub fn from_path(field: impl Into<String>, path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read(path)
            .with_context(|| format!("Failed to read upload file {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(field, file_name, content))
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn into_form(self) -> Result<Form, ApiError> {
        let mut part = Part::bytes(self.content).file_name(self.file_name);
        if let Some(mime) = self.mime {
            part = part
                .mime_str(&mime)
                .map_err(|e| ApiError::InvalidRequest(format!("Invalid MIME type {}: {}", mime, e)))?;
        }
        Ok(Form::new().part(self.field, part))
    }
}
