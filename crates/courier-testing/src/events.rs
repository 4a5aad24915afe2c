//! Event handler that keeps every delivery event for later assertions.

use std::collections::HashMap;

use courier_core::{DeliveryEvent, EventHandler, SequenceId};
use tokio::sync::RwLock;

/// Records delivery events in the order they were emitted.
#[derive(Debug, Default)]
pub struct RecordingEventHandler {
    events: RwLock<Vec<DeliveryEvent>>,
}

impl RecordingEventHandler {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded event.
    pub async fn events(&self) -> Vec<DeliveryEvent> {
        self.events.read().await.clone()
    }

    /// Number of recorded events matching `predicate`.
    pub async fn count_matching(&self, predicate: impl Fn(&DeliveryEvent) -> bool) -> usize {
        self.events.read().await.iter().filter(|&event| predicate(event)).count()
    }

    /// Number of `Delivered` events.
    pub async fn delivered_count(&self) -> usize {
        self.count_matching(|event| matches!(event, DeliveryEvent::Delivered(_))).await
    }

    /// Number of `Abandoned` events.
    pub async fn abandoned_count(&self) -> usize {
        self.count_matching(|event| matches!(event, DeliveryEvent::Abandoned(_))).await
    }

    /// Number of `Skipped` events.
    pub async fn skipped_count(&self) -> usize {
        self.count_matching(|event| matches!(event, DeliveryEvent::Skipped(_))).await
    }

    /// Terminal events grouped by notification.
    pub async fn terminal_events(&self) -> HashMap<SequenceId, Vec<DeliveryEvent>> {
        let mut grouped: HashMap<SequenceId, Vec<DeliveryEvent>> = HashMap::new();
        for event in self.events.read().await.iter().filter(|event| event.is_terminal()) {
            grouped.entry(event.sequence_id().clone()).or_default().push(event.clone());
        }
        grouped
    }
}

#[async_trait::async_trait]
impl EventHandler for RecordingEventHandler {
    async fn handle_event(&self, event: DeliveryEvent) {
        self.events.write().await.push(event);
    }
}
