//! Test infrastructure for deterministic scheduler testing.
//!
//! Provides a scripted delivery client that records every call, an event
//! handler that records every delivery event, notification builders, and
//! proptest strategies. Pair them with [`TestClock`] so backoff sequences
//! run on virtual time.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod client;
pub mod events;
pub mod fixtures;
pub mod strategies;

pub use client::{Behavior, DeliveryCall, FailureKind, ScriptedClient};
pub use courier_core::{Clock, TestClock};
pub use events::RecordingEventHandler;
pub use fixtures::{notifications_to, NotificationBuilder};
