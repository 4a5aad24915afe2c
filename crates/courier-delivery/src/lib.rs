//! Webhook delivery with bounded exponential backoff.
//!
//! This crate delivers a batch of notifications to their destinations,
//! retrying failures with exponentially growing delays until each one is
//! delivered, abandoned, or skipped because its destination has failed too
//! often.
//!
//! # Architecture
//!
//! A single async loop owns a min-priority queue of pending attempts and a
//! per-destination failure tracker:
//!
//! 1. **Seed** - One attempt per notification, due immediately
//! 2. **Skip Check** - Drop attempts whose destination reached its cap
//! 3. **Wait** - Suspend on the injected clock until the attempt is due
//! 4. **Deliver** - POST the JSON payload with a bounded timeout
//! 5. **Back Off** - Reschedule with a grown delay or abandon the chain
//!
//! # Example
//!
//! ```no_run
//! use courier_core::load_notifications;
//! use courier_delivery::{RetryScheduler, SchedulerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let notifications = load_notifications("webhooks.txt")?;
//! let mut scheduler = RetryScheduler::with_http_client(SchedulerConfig::default())?;
//!
//! scheduler.process(notifications).await;
//! println!("{:?}", scheduler.stats());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::time::Duration;

pub mod client;
pub mod error;
pub mod queue;
pub mod retry;
pub mod scheduler;
pub mod tracker;

pub use client::{ClientConfig, Deliver, DeliveryOutcome, HttpDeliveryClient};
pub use error::{DeliveryError, ErrorCategory, Result};
pub use queue::{AttemptQueue, ScheduledAttempt};
pub use retry::{RetryDecision, RetryPolicy};
pub use scheduler::{RetryScheduler, SchedulerConfig, SchedulerStats};
pub use tracker::FailureTracker;

/// Default ceiling on the delay between attempts.
pub const DEFAULT_MAX_DELAY_TIME: Duration = Duration::from_secs(60);

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY_TIME: Duration = Duration::from_secs(1);

/// Default multiplicative growth of the retry delay.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

/// Default number of abandoned chains tolerated per destination.
pub const DEFAULT_MAX_URL_FAILURE: u32 = 5;

/// Default per-attempt response timeout.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);
