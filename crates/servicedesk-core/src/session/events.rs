use tokio::sync::broadcast;
use tracing::debug;

/// Buffer size for session event subscribers that fall behind
const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A token was stored by an explicit login
    LoggedIn,
    /// The session was cleared by an explicit logout
    LoggedOut,
    /// The server reported the session as expired and local state was torn
    /// down. The host should send the user back to login.
    Invalidated,
}

/// Broadcast hub for session lifecycle changes.
/// Clone is cheap; all clones publish to the same subscribers.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine; the event is simply dropped
        if self.tx.send(event).is_err() {
            debug!(?event, "No session event subscribers");
        }
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_emit_without_subscribers() {
        SessionEvents::new().emit(SessionEvent::Invalidated);
    }

    #[test]
    fn test_all_clones_reach_subscriber() {
        let events = SessionEvents::new();
        let mut rx = events.subscribe();
        events.clone().emit(SessionEvent::LoggedIn);
        events.emit(SessionEvent::Invalidated);

        assert_eq!(rx.try_recv(), Ok(SessionEvent::LoggedIn));
        assert_eq!(rx.try_recv(), Ok(SessionEvent::Invalidated));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }
}
