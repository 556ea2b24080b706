//! servicedesk - command-line access to the vehicle-service admin API.
//!
//! This binary is the composition root: it loads configuration, opens the
//! persisted session, builds the transport client once and hands it to the
//! requested command.

mod commands;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use servicedesk_core::{
    ApiError, Config, FileSessionStore, ResourceClient, Session, SessionEvent, TransportClient,
};
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{Command, USAGE};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    let config = Config::load()?.with_env()?;
    let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
    debug!(?cache_dir, "Cache directory configured");

    let store = FileSessionStore::open(&cache_dir)?;
    let session = Session::new(Arc::new(store));

    if !command.needs_api() {
        return commands::run_local(&command, &session, config.api_url.as_deref());
    }

    let transport_config = config.transport_config()?;
    info!(base_url = %transport_config.base_url, "servicedesk starting");
    let mut events = session.events().subscribe();
    let transport = TransportClient::new(&transport_config, session)?;
    let client = ResourceClient::new(transport);

    let result = commands::run_remote(command, &client).await;

    loop {
        match events.try_recv() {
            Ok(SessionEvent::Invalidated) => {
                eprintln!("Your session has expired. Run `servicedesk login` to sign in again.");
            }
            Ok(_) => {}
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }

    match result {
        Err(e) if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_session_expired) => {
            std::process::exit(1);
        }
        other => other,
    }
}
