//! Broadcast event bus for distributing `SessionEvent` to multiple subscribers.
//!
//! Built on `tokio::sync::broadcast`, the `EventBus` supports multiple
//! concurrent subscribers. Publishing with no active subscribers is a no-op.

use tether_types::event::SessionEvent;
use tokio::sync::broadcast;

/// Multi-consumer bus for session lifecycle and turn-completion events.
///
/// Wraps a `tokio::sync::broadcast` channel. Cloning the bus clones the
/// sender, allowing multiple producers and consumers.
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no subscribers, the event is silently dropped.
    pub fn publish(&self, event: SessionEvent) {
        tracing::trace!(?event, "publishing session event");
        let _ = self.sender.send(event);
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tether_types::event::LogoutReason;

    fn turn_finished(id: &str) -> SessionEvent {
        SessionEvent::TurnFinished {
            conversation_id: Some(id.into()),
        }
    }

    #[tokio::test]
    async fn turn_finished_reaches_only_earlier_subscribers() {
        let bus = EventBus::new(16);
        let mut quota = bus.subscribe();

        bus.publish(turn_finished("c-1"));
        let mut late = bus.subscribe();

        assert_eq!(quota.recv().await.unwrap(), turn_finished("c-1"));
        assert!(matches!(
            late.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        bus.publish(turn_finished("c-2"));
        assert_eq!(late.recv().await.unwrap(), turn_finished("c-2"));
    }

    #[tokio::test]
    async fn renewal_then_logout_arrive_in_order_for_every_subscriber() {
        let bus = EventBus::new(16);
        let mut menu = bus.subscribe();
        let mut quota = bus.subscribe();
        let expires_at = Utc::now();

        bus.publish(SessionEvent::CredentialRenewed { expires_at });
        bus.publish(SessionEvent::LoggedOut {
            reason: LogoutReason::RenewalFailed,
        });

        for rx in [&mut menu, &mut quota] {
            assert_eq!(
                rx.recv().await.unwrap(),
                SessionEvent::CredentialRenewed { expires_at }
            );
            assert_eq!(
                rx.recv().await.unwrap(),
                SessionEvent::LoggedOut {
                    reason: LogoutReason::RenewalFailed
                }
            );
        }
    }

    #[test]
    fn logout_without_subscribers_is_dropped() {
        let bus = EventBus::default();
        bus.publish(SessionEvent::LoggedOut {
            reason: LogoutReason::UserInitiated,
        });
        assert_eq!(bus.receiver_count(), 0);

        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn slow_subscriber_lags_but_sees_latest_turn() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();

        for i in 0..5 {
            bus.publish(turn_finished(&format!("c-{i}")));
        }

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(3))
        ));
        assert_eq!(rx.try_recv().unwrap(), turn_finished("c-3"));
        assert_eq!(rx.try_recv().unwrap(), turn_finished("c-4"));
    }

    #[test]
    fn clone_publishes_to_the_same_subscribers() {
        let bus = EventBus::new(16);
        let chat_side = bus.clone();
        let mut rx = bus.subscribe();

        chat_side.publish(turn_finished("c-9"));

        assert_eq!(rx.try_recv().unwrap(), turn_finished("c-9"));
        assert_eq!(chat_side.receiver_count(), 1);
    }
}
