use super::NotificationEvent;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Fire-and-forget sink for notification events.
///
/// Implementations must not fail the caller: delivery problems are logged
/// and swallowed.
pub trait Notifier: Send + Sync + fmt::Debug {
    fn emit(&self, event: NotificationEvent);
}

/// Broadcast-based event publisher for lifecycle and alert events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub event: NotificationEvent,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Notifier for EventPublisher {
    fn emit(&self, event: NotificationEvent) {
        let event_type = event.event_type();
        let published = PublishedEvent {
            event,
            published_at: chrono::Utc::now(),
        };

        // send() only fails when nobody is subscribed, which is acceptable
        if self.sender.send(published).is_err() {
            debug!(event_type, "No subscribers for notification event");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(crate::constants::notifications::DEFAULT_CHANNEL_CAPACITY)
    }
}

/// Notifier that keeps every event in memory; used by tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<NotificationEvent>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().clone()
    }

    pub fn count_of(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.event_type() == event_type)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn emit(&self, event: NotificationEvent) {
        self.events.lock().push(event);
    }
}
