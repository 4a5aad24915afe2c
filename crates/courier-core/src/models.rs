//! Core domain models and strongly-typed identifiers.
//!
//! Defines the notification record, its correlation identifier, and the
//! canonical destination identity used to key per-destination failure
//! tracking.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CoreError, Result};

/// Canonical identity of a webhook destination.
///
/// Wraps a parsed absolute URL normalized so that logically equal
/// destinations compare and hash equal:
///
/// - scheme and host are lowercased and the default port is dropped
/// - an empty path becomes `/`
/// - trailing slashes on a non-root path are removed
/// - the fragment is dropped
///
/// # Example
///
/// ```
/// use courier_core::models::Destination;
///
/// let a = Destination::parse("HTTPS://Example.com:443/hooks/").unwrap();
/// let b = Destination::parse("https://example.com/hooks").unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Destination(Url);

impl Destination {
    /// Parses and canonicalizes a destination.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidDestination` if the input is not an
    /// absolute `http` or `https` URL with a host.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let mut url = Url::parse(trimmed)
            .map_err(|e| CoreError::invalid_destination(trimmed, e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::invalid_destination(
                trimmed,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(CoreError::invalid_destination(trimmed, "missing host"));
        }

        url.set_fragment(None);

        let path = url.path();
        if path.len() > 1 && path.ends_with('/') {
            let stripped = path.trim_end_matches('/').to_string();
            url.set_path(if stripped.is_empty() { "/" } else { &stripped });
        }

        Ok(Self(url))
    }

    /// Returns the canonical URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the canonical URL as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl FromStr for Destination {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Destination {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Destination> for String {
    fn from(destination: Destination) -> Self {
        destination.0.into()
    }
}

/// Caller-supplied identifier of a notification.
///
/// Only used for log correlation and as the `id` field of the delivered
/// payload; uniqueness is not enforced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(pub String);

impl SequenceId {
    /// Creates a sequence identifier from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SequenceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SequenceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for SequenceId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// One event to deliver to one destination.
///
/// Notifications are immutable once created. The scheduler shares a single
/// instance across every attempt of its delivery chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Where the notification is delivered.
    pub destination: Destination,
    /// Correlation identifier, sent as the payload `id`.
    pub sequence_id: SequenceId,
    /// Human-readable subject of the event.
    pub name: String,
    /// Event type, sent as the payload `event`.
    pub event_type: String,
}

impl Notification {
    /// Creates a notification.
    pub fn new(
        destination: Destination,
        sequence_id: impl Into<SequenceId>,
        name: impl Into<String>,
        event_type: impl Into<String>,
    ) -> Self {
        Self {
            destination,
            sequence_id: sequence_id.into(),
            name: name.into(),
            event_type: event_type.into(),
        }
    }

    /// Returns the JSON body delivered to the destination.
    pub fn payload(&self) -> NotificationPayload<'_> {
        NotificationPayload { id: &self.sequence_id, event: &self.event_type, name: &self.name }
    }
}

/// Wire body of a delivery: `{"id": ..., "event": ..., "name": ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotificationPayload<'a> {
    /// Sequence identifier of the notification.
    pub id: &'a SequenceId,
    /// Event type.
    pub event: &'a str,
    /// Event name.
    pub name: &'a str,
}
