//! Core domain models and event types.
//!
//! Provides the notification model, canonical destination identity, delivery
//! event definitions, the clock abstraction used for scheduling, and ingestion
//! of the delimited input file. The delivery crate builds the retry scheduler
//! on top of these types.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod ingest;
pub mod models;
pub mod time;

pub use error::{CoreError, Result};
pub use events::{
    AbandonedEvent, AttemptStartedEvent, DeliveredEvent, DeliveryEvent, EventHandler,
    NoOpEventHandler, RetryScheduledEvent, SkippedEvent, TracingEventHandler,
};
pub use ingest::{load_notifications, read_notifications, IngestError};
pub use models::{Destination, Notification, NotificationPayload, SequenceId};
pub use time::{Clock, RealClock, TestClock};
