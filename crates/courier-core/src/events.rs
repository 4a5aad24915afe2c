//! Delivery events and the handlers that observe them.
//!
//! The scheduler reports every chain transition through an [`EventHandler`]
//! passed in at construction instead of writing to a process-wide logger.
//!
//! ```text
//!                       AttemptStarted / Delivered /
//! ┌─────────────────┐   RetryScheduled / Abandoned /   ┌────────────────────┐
//! │ RetryScheduler  │ ──────────── Skipped ──────────▶ │ EventHandler       │
//! │ (Producer)      │                                  │ (Tracing, no-op    │
//! └─────────────────┘                                  │  or test recorder) │
//!                                                      └────────────────────┘
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::{Destination, SequenceId};

/// Events emitted by the retry scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeliveryEvent {
    /// A delivery attempt is about to be sent.
    AttemptStarted(AttemptStartedEvent),

    /// The destination accepted the notification. Terminal.
    Delivered(DeliveredEvent),

    /// An attempt failed and the chain was rescheduled.
    RetryScheduled(RetryScheduledEvent),

    /// An attempt failed and the next delay exceeded the ceiling. Terminal.
    Abandoned(AbandonedEvent),

    /// The destination was over its failure cap; nothing was sent. Terminal.
    Skipped(SkippedEvent),
}

impl DeliveryEvent {
    /// Sequence identifier of the notification this event concerns.
    pub fn sequence_id(&self) -> &SequenceId {
        match self {
            Self::AttemptStarted(e) => &e.sequence_id,
            Self::Delivered(e) => &e.sequence_id,
            Self::RetryScheduled(e) => &e.sequence_id,
            Self::Abandoned(e) => &e.sequence_id,
            Self::Skipped(e) => &e.sequence_id,
        }
    }

    /// Destination of the notification this event concerns.
    pub fn destination(&self) -> &Destination {
        match self {
            Self::AttemptStarted(e) => &e.destination,
            Self::Delivered(e) => &e.destination,
            Self::RetryScheduled(e) => &e.destination,
            Self::Abandoned(e) => &e.destination,
            Self::Skipped(e) => &e.destination,
        }
    }

    /// Whether this event ends its delivery chain.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered(_) | Self::Abandoned(_) | Self::Skipped(_))
    }
}

/// Emitted right before the delivery client is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptStartedEvent {
    /// Notification being delivered.
    pub sequence_id: SequenceId,
    /// Destination of the attempt.
    pub destination: Destination,
    /// Attempt number within the chain (1-based).
    pub attempt_number: u32,
    /// When the attempt started.
    pub started_at: DateTime<Utc>,
}

/// Emitted when an attempt succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveredEvent {
    /// Notification that was delivered.
    pub sequence_id: SequenceId,
    /// Destination that accepted it.
    pub destination: Destination,
    /// HTTP status returned by the destination.
    pub status_code: u16,
    /// Attempt number that succeeded (1-based).
    pub attempt_number: u32,
    /// When the delivery completed.
    pub delivered_at: DateTime<Utc>,
}

/// Emitted when a failed attempt is rescheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryScheduledEvent {
    /// Notification being retried.
    pub sequence_id: SequenceId,
    /// Destination of the chain.
    pub destination: Destination,
    /// Attempt number that failed (1-based).
    pub attempt_number: u32,
    /// Delay until the next attempt.
    pub delay: Duration,
    /// Why the attempt failed.
    pub error_message: String,
}

/// Emitted when a chain gives up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbandonedEvent {
    /// Notification that was abandoned.
    pub sequence_id: SequenceId,
    /// Destination of the chain.
    pub destination: Destination,
    /// Total attempts made in the chain.
    pub attempts: u32,
    /// Abandoned chains recorded for the destination, this one included.
    pub destination_failures: u32,
    /// Why the last attempt failed.
    pub error_message: String,
    /// When the chain was abandoned.
    pub abandoned_at: DateTime<Utc>,
}

/// Emitted when an attempt is dropped because its destination is capped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEvent {
    /// Notification that was skipped.
    pub sequence_id: SequenceId,
    /// Capped destination.
    pub destination: Destination,
    /// Abandoned chains recorded for the destination.
    pub destination_failures: u32,
}

/// Trait for observing delivery events.
///
/// Handlers must not fail the run: errors inside a handler are the
/// handler's to log and swallow.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync + std::fmt::Debug {
    /// Handles a delivery event.
    async fn handle_event(&self, event: DeliveryEvent);
}

/// Event handler that discards all events.
#[derive(Debug, Default)]
pub struct NoOpEventHandler;

impl NoOpEventHandler {
    /// Creates a new no-op event handler.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl EventHandler for NoOpEventHandler {
    async fn handle_event(&self, _event: DeliveryEvent) {}
}

/// Event handler that writes every event to `tracing`.
///
/// Successful deliveries and scheduled retries are logged at `info`,
/// attempts at `debug`, abandoned chains and skips at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventHandler;

impl TracingEventHandler {
    /// Creates a new tracing event handler.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl EventHandler for TracingEventHandler {
    async fn handle_event(&self, event: DeliveryEvent) {
        match event {
            DeliveryEvent::AttemptStarted(e) => debug!(
                sequence_id = %e.sequence_id,
                destination = %e.destination,
                attempt = e.attempt_number,
                "sending webhook"
            ),
            DeliveryEvent::Delivered(e) => info!(
                sequence_id = %e.sequence_id,
                destination = %e.destination,
                status = e.status_code,
                attempt = e.attempt_number,
                "webhook delivered"
            ),
            DeliveryEvent::RetryScheduled(e) => info!(
                sequence_id = %e.sequence_id,
                destination = %e.destination,
                attempt = e.attempt_number,
                delay_ms = e.delay.as_millis(),
                error = %e.error_message,
                "webhook delivery failed, retry scheduled"
            ),
            DeliveryEvent::Abandoned(e) => warn!(
                sequence_id = %e.sequence_id,
                destination = %e.destination,
                attempts = e.attempts,
                failures = e.destination_failures,
                error = %e.error_message,
                "webhook abandoned after reaching max delay"
            ),
            DeliveryEvent::Skipped(e) => warn!(
                sequence_id = %e.sequence_id,
                destination = %e.destination,
                failures = e.destination_failures,
                "skipping webhook, destination reached maximum failures"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skipped_event() -> DeliveryEvent {
        DeliveryEvent::Skipped(SkippedEvent {
            sequence_id: SequenceId::new("7"),
            destination: Destination::parse("https://example.com/webhook").unwrap(),
            destination_failures: 5,
        })
    }

    #[tokio::test]
    async fn built_in_handlers_accept_events() {
        TracingEventHandler::new().handle_event(skipped_event()).await;
        NoOpEventHandler::new().handle_event(skipped_event()).await;
    }

    #[test]
    fn terminal_events_identified() {
        assert!(skipped_event().is_terminal());

        let started = DeliveryEvent::AttemptStarted(AttemptStartedEvent {
            sequence_id: SequenceId::new("7"),
            destination: Destination::parse("https://example.com/webhook").unwrap(),
            attempt_number: 1,
            started_at: Utc::now(),
        });
        assert!(!started.is_terminal());
        assert_eq!(started.sequence_id().as_str(), "7");
        assert_eq!(started.destination().as_str(), "https://example.com/webhook");
    }
}
