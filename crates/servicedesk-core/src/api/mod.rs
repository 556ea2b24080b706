//! REST API access for the vehicle-service admin backend.
//!
//! This module provides the `TransportClient`, which attaches the stored
//! auth token to every request and tears the session down when the server
//! reports it expired, and the `ResourceClient` verbs that feature code
//! uses to reach individual endpoints.
//!
//! Tokens are sent verbatim in the `Authorization` header, without a
//! `Bearer` prefix.

pub mod client;
pub mod error;
pub mod request;
pub mod resource;

pub use client::{TransportClient, TransportConfig, DEFAULT_CONTENT_TYPE};
pub use error::ApiError;
pub use request::{ApiResponse, Query, RequestEnvelope};
pub use resource::{ResourceClient, UploadFile};
