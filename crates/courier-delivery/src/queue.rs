//! Min-priority queue of pending delivery attempts.
//!
//! Attempts are ordered by due time, earliest first; attempts due at the same
//! instant are ordered by their carried delay, smallest first. The ordering
//! never looks at the notification.

use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
    sync::Arc,
    time::{Duration, Instant},
};

use courier_core::Notification;

/// One pending attempt of a delivery chain.
#[derive(Debug, Clone)]
pub struct ScheduledAttempt {
    /// Instant at which the attempt becomes eligible.
    pub due_time: Instant,
    /// Delay that produced `due_time`, carried forward to the next retry.
    pub current_delay: Duration,
    /// Notification shared by every attempt of the chain.
    pub notification: Arc<Notification>,
    /// Attempt number within the chain (1-based). Not part of the ordering.
    pub attempt_number: u32,
}

impl ScheduledAttempt {
    /// First attempt of a chain, due at `now`.
    pub fn first(notification: Arc<Notification>, now: Instant, seed_delay: Duration) -> Self {
        Self { due_time: now, current_delay: seed_delay, notification, attempt_number: 1 }
    }

    /// Next attempt of the same chain, due `next_delay` after `now`.
    ///
    /// Returns `None` if the due time cannot be represented as an `Instant`.
    pub fn retry(&self, now: Instant, next_delay: Duration) -> Option<Self> {
        Some(Self {
            due_time: now.checked_add(next_delay)?,
            current_delay: next_delay,
            notification: Arc::clone(&self.notification),
            attempt_number: self.attempt_number.saturating_add(1),
        })
    }

    fn sort_key(&self) -> (Instant, Duration) {
        (self.due_time, self.current_delay)
    }
}

impl PartialEq for ScheduledAttempt {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for ScheduledAttempt {}

impl PartialOrd for ScheduledAttempt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledAttempt {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Queue of attempts popped in `(due_time, current_delay)` order.
#[derive(Debug, Default)]
pub struct AttemptQueue {
    heap: BinaryHeap<Reverse<ScheduledAttempt>>,
}

impl AttemptQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty queue with room for `capacity` attempts.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { heap: BinaryHeap::with_capacity(capacity) }
    }

    /// Adds an attempt.
    pub fn push(&mut self, attempt: ScheduledAttempt) {
        self.heap.push(Reverse(attempt));
    }

    /// Removes and returns the earliest attempt.
    pub fn pop(&mut self) -> Option<ScheduledAttempt> {
        self.heap.pop().map(|Reverse(attempt)| attempt)
    }

    /// Earliest attempt, without removing it.
    pub fn peek(&self) -> Option<&ScheduledAttempt> {
        self.heap.peek().map(|Reverse(attempt)| attempt)
    }

    /// Number of pending attempts.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether no attempts are pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
