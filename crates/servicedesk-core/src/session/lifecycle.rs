use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use super::{SessionEvent, SessionEvents, SessionStore, AUTH_TOKEN_KEY};

/// Auth token lifecycle over a shared store.
/// Clone is cheap - the store and the event hub are shared.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn SessionStore>,
    events: SessionEvents,
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            events: SessionEvents::new(),
        }
    }

    pub fn with_events(store: Arc<dyn SessionStore>, events: SessionEvents) -> Self {
        Self { store, events }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    /// Current auth token, read fresh from the store on every call
    pub fn token(&self) -> Option<String> {
        self.store.get(AUTH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Store a token obtained from the login endpoint
    pub fn login(&self, token: &str) -> Result<()> {
        self.store.set(AUTH_TOKEN_KEY, token)?;
        self.events.emit(SessionEvent::LoggedIn);
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.store.remove(AUTH_TOKEN_KEY)?;
        self.store.clear()?;
        self.events.emit(SessionEvent::LoggedOut);
        Ok(())
    }

    /// Tear down all session state after the server rejected the session.
    /// Storage failures are logged; subscribers are notified regardless.
    pub(crate) fn invalidate(&self) {
        warn!("Session expired, clearing local session state");
        if let Err(e) = self.store.remove(AUTH_TOKEN_KEY) {
            warn!(error = %e, "Failed to remove auth token");
        }
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear session store");
        }
        debug!("Publishing session invalidation");
        self.events.emit(SessionEvent::Invalidated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;

    #[test]
    fn test_login_logout() {
        let session = Session::new(Arc::new(MemorySessionStore::new()));
        let mut rx = session.events().subscribe();
        assert!(!session.is_authenticated());

        session.login("tok").unwrap();
        assert_eq!(session.token().as_deref(), Some("tok"));
        assert_eq!(rx.try_recv(), Ok(SessionEvent::LoggedIn));

        session.logout().unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(rx.try_recv(), Ok(SessionEvent::LoggedOut));
    }

    #[test]
    fn test_empty_token_counts_as_absent() {
        let session = Session::new(Arc::new(MemorySessionStore::with_token("")));
        assert_eq!(session.token(), None);
    }

    #[test]
    fn test_invalidate_clears_everything() {
        let store = Arc::new(MemorySessionStore::with_token("tok"));
        store.set("userName", "admin").unwrap();
        let session = Session::new(store.clone());
        let mut rx = session.events().subscribe();

        session.invalidate();

        assert!(store.is_empty());
        assert_eq!(rx.try_recv(), Ok(SessionEvent::Invalidated));
    }
}
