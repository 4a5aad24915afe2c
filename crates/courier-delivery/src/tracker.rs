//! Per-destination count of abandoned delivery chains.
//!
//! A destination that has exhausted `max_url_failure` chains is considered
//! down for the rest of the run: the scheduler skips every remaining attempt
//! to it without calling the client. Counts only ever grow and live for one
//! `process` invocation.
//!
//! ```text
//!   chain abandoned                    count >= max_url_failure
//!  ─────────────────▶ count += 1  ─────────────────────────────▶ skip
//! ```

use std::collections::HashMap;

use courier_core::Destination;

/// Owned by the scheduler loop; never shared across tasks.
#[derive(Debug, Default, Clone)]
pub struct FailureTracker {
    counts: HashMap<Destination, u32>,
}

impl FailureTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one abandoned chain for `destination` and returns the new
    /// count.
    pub fn record_chain_abandoned(&mut self, destination: &Destination) -> u32 {
        let count = self.counts.entry(destination.clone()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Abandoned chains recorded for `destination`.
    pub fn count(&self, destination: &Destination) -> u32 {
        self.counts.get(destination).copied().unwrap_or(0)
    }

    /// Whether attempts to `destination` must be skipped.
    ///
    /// A cap of zero skips every destination.
    pub fn is_capped(&self, destination: &Destination, max_failures: u32) -> bool {
        self.count(destination) >= max_failures
    }

    /// Copy of every non-zero count.
    pub fn snapshot(&self) -> HashMap<Destination, u32> {
        self.counts.clone()
    }
}
