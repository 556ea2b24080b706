//! Core library for the vehicle-service admin API.
//!
//! The host application builds one [`TransportClient`] at start-up, wraps it
//! in a [`ResourceClient`] and hands clones of that to feature code. It
//! subscribes to [`SessionEvents`] to learn when the server ended the
//! session.

pub mod api;
pub mod config;
pub mod session;

pub use api::{ApiError, ApiResponse, Query, ResourceClient, TransportClient, TransportConfig};
pub use config::Config;
pub use session::{
    FileSessionStore, MemorySessionStore, Session, SessionEvent, SessionEvents, SessionStore,
    AUTH_TOKEN_KEY,
};
