//! Batch retry scheduler.
//!
//! Seeds one delivery chain per notification and services attempts one at a
//! time in `(due_time, current_delay)` order until none remain. A failed
//! attempt is rescheduled with a grown delay, or abandoned once that delay
//! would exceed the ceiling. Destinations that accumulate `max_url_failure`
//! abandoned chains are skipped for the rest of the run.
//!
//! # Chain lifecycle
//!
//! ```text
//!  Scheduled ──▶ Waiting ──▶ Attempting ──▶ Delivered
//!     ▲  │                       │
//!     │  │                       ├──▶ Retrying ──┐
//!     │  │                       │               │
//!     │  │                       └──▶ Abandoned  │
//!     │  └──▶ Skipped                            │
//!     └──────────────────────────────────────────┘
//! ```
//!
//! Waiting suspends the whole scheduler through the injected clock; no other
//! attempt is serviced meanwhile.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use courier_core::{
    AbandonedEvent, AttemptStartedEvent, Clock, DeliveredEvent, DeliveryEvent, Destination,
    EventHandler, Notification, RealClock, RetryScheduledEvent, SkippedEvent, TracingEventHandler,
};
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::{
    client::{ClientConfig, Deliver, DeliveryOutcome, HttpDeliveryClient},
    error::{DeliveryError, Result},
    queue::{AttemptQueue, ScheduledAttempt},
    retry::{RetryDecision, RetryPolicy},
    tracker::FailureTracker,
};

/// Configuration for the retry scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Ceiling beyond which a chain is abandoned.
    pub max_delay_time: Duration,

    /// Delay before the first retry of a chain.
    pub initial_delay_time: Duration,

    /// Multiplicative growth of the delay per failed attempt.
    pub exponential_backoff_factor: f64,

    /// Abandoned chains tolerated per destination before it is skipped.
    pub max_url_failure: u32,

    /// Per-attempt timeout forwarded to the HTTP client.
    pub response_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_delay_time: crate::DEFAULT_MAX_DELAY_TIME,
            initial_delay_time: crate::DEFAULT_INITIAL_DELAY_TIME,
            exponential_backoff_factor: crate::DEFAULT_BACKOFF_FACTOR,
            max_url_failure: crate::DEFAULT_MAX_URL_FAILURE,
            response_timeout: crate::DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

impl SchedulerConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if the backoff factor is
    /// not a finite number greater than 1, or if the initial delay or the
    /// response timeout is zero.
    pub fn validate(&self) -> Result<()> {
        self.retry_policy().validate()?;
        if self.response_timeout.is_zero() {
            return Err(DeliveryError::configuration("response timeout must be greater than zero"));
        }
        Ok(())
    }

    /// Backoff policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: self.initial_delay_time,
            max_delay: self.max_delay_time,
            backoff_factor: self.exponential_backoff_factor,
        }
    }

    /// HTTP client configuration bounded by `response_timeout`.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig { timeout: self.response_timeout, ..ClientConfig::default() }
    }
}

/// Counters for the most recent `process` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Notifications seeded.
    pub notifications: u64,
    /// Delivery client invocations.
    pub attempts: u64,
    /// Chains that ended in a successful delivery.
    pub delivered: u64,
    /// Failed attempts that were rescheduled.
    pub retries_scheduled: u64,
    /// Chains abandoned after exceeding the delay ceiling.
    pub abandoned: u64,
    /// Chains dropped because their destination was capped.
    pub skipped: u64,
}

impl SchedulerStats {
    /// Chains that reached a terminal state.
    pub fn completed(&self) -> u64 {
        self.delivered + self.abandoned + self.skipped
    }
}

/// Retry scheduler for a batch of notifications.
///
/// Owns its queue and failure tracker for the duration of a run; nothing is
/// shared with other tasks.
#[derive(Debug)]
pub struct RetryScheduler {
    config: SchedulerConfig,
    policy: RetryPolicy,
    client: Arc<dyn Deliver>,
    clock: Arc<dyn Clock>,
    event_handler: Arc<dyn EventHandler>,
    tracker: FailureTracker,
    stats: SchedulerStats,
}

impl RetryScheduler {
    /// Creates a scheduler that delivers through `client`.
    ///
    /// Uses the system clock and logs events through `tracing` until
    /// overridden with [`RetryScheduler::with_clock`] and
    /// [`RetryScheduler::with_event_handler`].
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if `config` is invalid.
    pub fn new(config: SchedulerConfig, client: Arc<dyn Deliver>) -> Result<Self> {
        config.validate()?;
        let policy = config.retry_policy();

        Ok(Self {
            config,
            policy,
            client,
            clock: Arc::new(RealClock::new()),
            event_handler: Arc::new(TracingEventHandler::new()),
            tracker: FailureTracker::new(),
            stats: SchedulerStats::default(),
        })
    }

    /// Creates a scheduler that delivers over HTTP with `response_timeout`.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if `config` is invalid or
    /// the HTTP client cannot be built.
    pub fn with_http_client(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        let client = HttpDeliveryClient::new(config.client_config())?;
        Self::new(config, Arc::new(client))
    }

    /// Replaces the clock used for due times and waiting.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the sink that receives delivery events.
    #[must_use]
    pub fn with_event_handler(mut self, event_handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = event_handler;
        self
    }

    /// Returns the scheduler configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Counters for the most recent run.
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Abandoned chains per destination after the most recent run.
    pub fn failure_counts(&self) -> HashMap<Destination, u32> {
        self.tracker.snapshot()
    }

    /// Delivers every notification, retrying failures until each chain is
    /// delivered, abandoned or skipped.
    ///
    /// Returns once no attempts remain. Delivery failures never escape; they
    /// are reported through the event handler and reflected in
    /// [`RetryScheduler::stats`]. Failure counts start from zero on every
    /// call.
    pub async fn process<I>(&mut self, notifications: I)
    where
        I: IntoIterator,
        I::Item: Into<Arc<Notification>>,
    {
        self.tracker = FailureTracker::new();
        self.stats = SchedulerStats::default();

        let now = self.clock.now();
        let seed_delay = self.policy.seed_delay();
        let notifications = notifications.into_iter();
        let mut queue = AttemptQueue::with_capacity(notifications.size_hint().0);
        for notification in notifications {
            queue.push(ScheduledAttempt::first(notification.into(), now, seed_delay));
        }
        self.stats.notifications = queue.len() as u64;

        let span = info_span!("delivery_run", run_id = %Uuid::new_v4());
        self.drain(queue).instrument(span).await;
    }

    async fn drain(&mut self, mut queue: AttemptQueue) {
        info!(notifications = queue.len(), "starting delivery run");

        while let Some(attempt) = queue.pop() {
            if let Some(retry) = self.service(attempt).await {
                queue.push(retry);
            }
        }

        info!(
            attempts = self.stats.attempts,
            delivered = self.stats.delivered,
            abandoned = self.stats.abandoned,
            skipped = self.stats.skipped,
            "delivery run complete"
        );
    }

    /// Runs one attempt and returns its follow-up, if the chain continues.
    async fn service(&mut self, attempt: ScheduledAttempt) -> Option<ScheduledAttempt> {
        let notification = Arc::clone(&attempt.notification);
        let destination = &notification.destination;

        if self.tracker.is_capped(destination, self.config.max_url_failure) {
            self.stats.skipped += 1;
            self.emit(DeliveryEvent::Skipped(SkippedEvent {
                sequence_id: notification.sequence_id.clone(),
                destination: destination.clone(),
                destination_failures: self.tracker.count(destination),
            }))
            .await;
            return None;
        }

        let now = self.clock.now();
        if attempt.due_time > now {
            let wait = attempt.due_time - now;
            debug!(
                sequence_id = %notification.sequence_id,
                wait_ms = wait.as_millis(),
                "waiting for next due attempt"
            );
            self.clock.sleep(wait).await;
        }

        self.stats.attempts += 1;
        self.emit(DeliveryEvent::AttemptStarted(AttemptStartedEvent {
            sequence_id: notification.sequence_id.clone(),
            destination: destination.clone(),
            attempt_number: attempt.attempt_number,
            started_at: self.wall_clock(),
        }))
        .await;

        let reason = match self.client.send(&notification).await {
            DeliveryOutcome::Delivered { status_code } => {
                self.stats.delivered += 1;
                self.emit(DeliveryEvent::Delivered(DeliveredEvent {
                    sequence_id: notification.sequence_id.clone(),
                    destination: destination.clone(),
                    status_code,
                    attempt_number: attempt.attempt_number,
                    delivered_at: self.wall_clock(),
                }))
                .await;
                return None;
            },
            DeliveryOutcome::Failed { reason } => reason,
        };

        let decision = self.policy.decide(attempt.attempt_number, attempt.current_delay);
        if let RetryDecision::Retry { next_delay } = decision {
            if let Some(retry) = attempt.retry(self.clock.now(), next_delay) {
                self.stats.retries_scheduled += 1;
                self.emit(DeliveryEvent::RetryScheduled(RetryScheduledEvent {
                    sequence_id: notification.sequence_id.clone(),
                    destination: destination.clone(),
                    attempt_number: attempt.attempt_number,
                    delay: next_delay,
                    error_message: reason.to_string(),
                }))
                .await;
                return Some(retry);
            }
        }

        // Over the ceiling, or due beyond any representable instant.
        let failures = self.tracker.record_chain_abandoned(destination);
        self.stats.abandoned += 1;
        debug!(
            sequence_id = %notification.sequence_id,
            next_delay_ms = decision.next_delay().as_millis(),
            max_delay_ms = self.config.max_delay_time.as_millis(),
            "chain cannot be rescheduled"
        );
        self.emit(DeliveryEvent::Abandoned(AbandonedEvent {
            sequence_id: notification.sequence_id.clone(),
            destination: destination.clone(),
            attempts: attempt.attempt_number,
            destination_failures: failures,
            error_message: reason.to_string(),
            abandoned_at: self.wall_clock(),
        }))
        .await;
        None
    }

    async fn emit(&self, event: DeliveryEvent) {
        self.event_handler.handle_event(event).await;
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.clock.now_system())
    }
}
