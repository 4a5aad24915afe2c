//! Notification builders with sensible defaults.

use courier_core::{Destination, Notification, SequenceId};

const DEFAULT_DESTINATION: &str = "https://example.com/webhook";

/// Builder for test notifications.
///
/// Panics on an invalid destination; fixtures are expected to be valid.
#[derive(Debug, Clone)]
pub struct NotificationBuilder {
    destination: String,
    sequence_id: SequenceId,
    name: String,
    event_type: String,
}

impl NotificationBuilder {
    /// Creates a builder for `https://example.com/webhook`.
    pub fn new() -> Self {
        Self {
            destination: DEFAULT_DESTINATION.to_string(),
            sequence_id: SequenceId::new("1"),
            name: "Test Customer".to_string(),
            event_type: "order.created".to_string(),
        }
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn destination(mut self, url: impl Into<String>) -> Self {
        self.destination = url.into();
        self
    }

    /// Sets the sequence identifier.
    #[must_use]
    pub fn sequence_id(mut self, id: impl Into<SequenceId>) -> Self {
        self.sequence_id = id.into();
        self
    }

    /// Sets the event name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the event type.
    #[must_use]
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    /// Builds the notification.
    #[allow(clippy::expect_used)]
    pub fn build(self) -> Notification {
        let destination =
            Destination::parse(&self.destination).expect("fixture destination must be valid");
        Notification::new(destination, self.sequence_id, self.name, self.event_type)
    }
}

impl Default for NotificationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `count` notifications to `url`, with sequence ids `0..count`.
pub fn notifications_to(url: &str, count: u64) -> Vec<Notification> {
    (0..count)
        .map(|id| NotificationBuilder::new().destination(url).sequence_id(id).build())
        .collect()
}
