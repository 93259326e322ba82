//! Session signal bus
//!
//! A live notification channel carrying one event type: the current
//! authenticated session is over. It decouples the HTTP layer from the UI
//! layer that must react (clear user state, navigate to sign-in). Late
//! subscribers do not see past events — this is not a durable log.

use tokio::sync::broadcast;
use tracing::debug;

/// Why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEndReason {
    /// The refresh endpoint failed; the credential is gone for good.
    RefreshFailed,
    /// The user signed out.
    ExplicitLogout,
}

/// Emitted at most once per failed-refresh episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEndedEvent {
    pub reason: SessionEndReason,
}

/// Process-wide publish/subscribe channel for session-ended events.
///
/// Cloning the bus shares the underlying channel. Publishing with zero
/// subscribers is fine — nobody is listening yet.
#[derive(Clone)]
pub struct SessionBus {
    tx: broadcast::Sender<SessionEndedEvent>,
}

impl SessionBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    /// Deliver an event to all current subscribers.
    pub fn publish(&self, event: SessionEndedEvent) {
        debug!(reason = ?event.reason, "session ended");
        let _ = self.tx.send(event);
    }

    /// Subscribe to future events. Returns an unsubscribing-on-drop receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEndedEvent> {
        self.tx.subscribe()
    }
}

impl Default for SessionBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = SessionBus::new();
        let mut rx = bus.subscribe();

        bus.publish(SessionEndedEvent {
            reason: SessionEndReason::RefreshFailed,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.reason, SessionEndReason::RefreshFailed);
    }

    #[tokio::test]
    async fn late_subscriber_misses_past_events() {
        let bus = SessionBus::new();
        bus.publish(SessionEndedEvent {
            reason: SessionEndReason::ExplicitLogout,
        });

        let mut rx = bus.subscribe();
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_not_an_error() {
        let bus = SessionBus::new();
        bus.publish(SessionEndedEvent {
            reason: SessionEndReason::RefreshFailed,
        });
    }

    #[tokio::test]
    async fn all_subscribers_see_each_event() {
        let bus = SessionBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(SessionEndedEvent {
            reason: SessionEndReason::RefreshFailed,
        });

        assert_eq!(rx1.recv().await.unwrap().reason, SessionEndReason::RefreshFailed);
        assert_eq!(rx2.recv().await.unwrap().reason, SessionEndReason::RefreshFailed);
    }
}
