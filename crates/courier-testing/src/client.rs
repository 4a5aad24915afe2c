//! Scripted delivery client.
//!
//! Answers each call according to a [`Behavior`], chosen per destination
//! with a fallback default, and records the call along with the clock
//! instant it happened at.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Instant,
};

use async_trait::async_trait;
use courier_core::{Clock, Destination, Notification, SequenceId};
use courier_delivery::{Deliver, DeliveryError, DeliveryOutcome};
use tokio::sync::Mutex;

/// How a failing call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 5xx response with the given status.
    ServerError(u16),
    /// 4xx response with the given status.
    ClientError(u16),
    /// 429 response.
    RateLimited,
    /// Response timeout.
    Timeout,
    /// Connection refused.
    Network,
}

impl FailureKind {
    fn to_error(self) -> DeliveryError {
        match self {
            Self::ServerError(status) => DeliveryError::server_error(status, "scripted failure"),
            Self::ClientError(status) => DeliveryError::client_error(status, "scripted failure"),
            Self::RateLimited => DeliveryError::rate_limited(),
            Self::Timeout => DeliveryError::timeout(2000),
            Self::Network => DeliveryError::network("connection refused"),
        }
    }
}

/// Scripted response to a delivery call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Every call succeeds with 200.
    Succeed,
    /// Every call fails.
    Fail(FailureKind),
    /// The first `n` calls for each notification fail, later ones succeed.
    FailTimes(usize, FailureKind),
}

/// One recorded call to [`ScriptedClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryCall {
    /// Notification that was sent.
    pub sequence_id: SequenceId,
    /// Destination it was sent to.
    pub destination: Destination,
    /// Clock instant of the call.
    pub at: Instant,
    /// Whether the scripted answer was a success.
    pub succeeded: bool,
}

/// Delivery client with scripted answers and a call log.
#[derive(Debug)]
pub struct ScriptedClient {
    default: Behavior,
    per_destination: HashMap<Destination, Behavior>,
    clock: Option<Arc<dyn Clock>>,
    call_count: AtomicUsize,
    calls: Mutex<Vec<DeliveryCall>>,
    calls_per_notification: Mutex<HashMap<SequenceId, usize>>,
}

impl ScriptedClient {
    /// Creates a client that answers with `default` for every destination.
    pub fn new(default: Behavior) -> Self {
        Self {
            default,
            per_destination: HashMap::new(),
            clock: None,
            call_count: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            calls_per_notification: Mutex::new(HashMap::new()),
        }
    }

    /// Client whose every call succeeds.
    pub fn always_succeed() -> Self {
        Self::new(Behavior::Succeed)
    }

    /// Client whose every call fails with a 503.
    pub fn always_fail() -> Self {
        Self::new(Behavior::Fail(FailureKind::ServerError(503)))
    }

    /// Client that fails the first `n` calls of each notification with a 503.
    pub fn fail_times(n: usize) -> Self {
        Self::new(Behavior::FailTimes(n, FailureKind::ServerError(503)))
    }

    /// Overrides the behavior for one destination.
    #[must_use]
    pub fn with_destination(mut self, destination: Destination, behavior: Behavior) -> Self {
        self.per_destination.insert(destination, behavior);
        self
    }

    /// Timestamps calls with `clock` instead of the system clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Total calls so far.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every recorded call, in order.
    pub async fn calls(&self) -> Vec<DeliveryCall> {
        self.calls.lock().await.clone()
    }

    /// Calls made for one notification.
    pub async fn calls_for(&self, sequence_id: &SequenceId) -> Vec<DeliveryCall> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| &call.sequence_id == sequence_id)
            .cloned()
            .collect()
    }

    /// Number of calls made to one destination.
    pub async fn calls_to(&self, destination: &Destination) -> usize {
        self.calls.lock().await.iter().filter(|call| &call.destination == destination).count()
    }

    fn now(&self) -> Instant {
        self.clock.as_ref().map_or_else(Instant::now, |clock| clock.now())
    }
}

#[async_trait]
impl Deliver for ScriptedClient {
    async fn send(&self, notification: &Notification) -> DeliveryOutcome {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let previous_calls = {
            let mut per_notification = self.calls_per_notification.lock().await;
            let count = per_notification.entry(notification.sequence_id.clone()).or_insert(0);
            *count += 1;
            *count - 1
        };

        let behavior =
            self.per_destination.get(&notification.destination).copied().unwrap_or(self.default);
        let outcome = match behavior {
            Behavior::Succeed => DeliveryOutcome::Delivered { status_code: 200 },
            Behavior::Fail(kind) => DeliveryOutcome::Failed { reason: kind.to_error() },
            Behavior::FailTimes(n, kind) if previous_calls < n => {
                DeliveryOutcome::Failed { reason: kind.to_error() }
            },
            Behavior::FailTimes(..) => DeliveryOutcome::Delivered { status_code: 200 },
        };

        self.calls.lock().await.push(DeliveryCall {
            sequence_id: notification.sequence_id.clone(),
            destination: notification.destination.clone(),
            at: self.now(),
            succeeded: outcome.is_success(),
        });

        outcome
    }
}
