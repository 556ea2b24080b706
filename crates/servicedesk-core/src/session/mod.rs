//! Session state for authenticated API access.
//!
//! This module provides:
//! - `SessionStore`: key-value storage for the auth token
//! - `MemorySessionStore` / `FileSessionStore`: in-process and on-disk stores
//! - `Session`: token lifecycle (login, logout, server-side invalidation)
//! - `SessionEvents`: broadcast of lifecycle changes to the host application
//!
//! Tokens carry no expiry locally; the server decides when a session ends.

pub mod events;
pub mod file;
pub mod lifecycle;
pub mod store;

pub use events::{SessionEvent, SessionEvents};
pub use file::FileSessionStore;
pub use lifecycle::Session;
pub use store::{MemorySessionStore, SessionStore, AUTH_TOKEN_KEY};
