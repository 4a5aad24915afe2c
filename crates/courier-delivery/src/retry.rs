//! Exponential backoff policy for failed deliveries.
//!
//! A delivery chain carries its current delay forward. The first attempt is
//! seeded with `initial_delay / backoff_factor` and the first retry waits
//! exactly `initial_delay`. The wait after failed attempt `n` is
//! `initial_delay * backoff_factor^(n - 1)`, computed from the attempt number
//! so rounding never accumulates along the chain, and the chain gives up once
//! that delay would exceed `max_delay`.
//!
//! With the defaults (1s, factor 2, 60s ceiling) an always-failing chain is
//! attempted 7 times, waiting 1s, 2s, 4s, 8s, 16s and 32s in between.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DeliveryError, Result};

/// Backoff configuration for a delivery chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Ceiling; a chain whose next delay exceeds it is abandoned.
    pub max_delay: Duration,

    /// Multiplicative growth applied after each failure.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
        }
    }
}

/// Result of a retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after `next_delay`.
    Retry {
        /// Delay until the next attempt, carried forward by the chain
        next_delay: Duration,
    },
    /// Abandon the chain.
    GiveUp {
        /// The delay that exceeded the ceiling
        next_delay: Duration,
    },
}

impl RetryDecision {
    /// The delay the decision was based on.
    pub fn next_delay(&self) -> Duration {
        match *self {
            Self::Retry { next_delay } | Self::GiveUp { next_delay } => next_delay,
        }
    }
}

impl RetryPolicy {
    /// Creates a validated policy.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if the policy is invalid,
    /// see [`RetryPolicy::validate`].
    pub fn new(initial_delay: Duration, max_delay: Duration, backoff_factor: f64) -> Result<Self> {
        let policy = Self { initial_delay, max_delay, backoff_factor };
        policy.validate()?;
        Ok(policy)
    }

    /// Checks that the policy describes a terminating backoff.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if the factor is not a
    /// finite number greater than 1 or the initial delay is zero.
    pub fn validate(&self) -> Result<()> {
        if !self.backoff_factor.is_finite() || self.backoff_factor <= 1.0 {
            return Err(DeliveryError::configuration(format!(
                "exponential backoff factor must be a finite number greater than 1, got {}",
                self.backoff_factor
            )));
        }
        if self.initial_delay.is_zero() {
            return Err(DeliveryError::configuration("initial delay must be greater than zero"));
        }
        Ok(())
    }

    /// Delay carried by the first attempt of a chain.
    ///
    /// Only orders first attempts against each other; the first retry waits
    /// exactly `initial_delay` regardless of how this value rounds.
    pub fn seed_delay(&self) -> Duration {
        let seed = duration_from_nanos(self.initial_delay.as_nanos() as f64 / self.backoff_factor)
            .unwrap_or(Duration::ZERO);
        seed.min(self.initial_delay.saturating_sub(Duration::from_nanos(1)))
    }

    /// Wait that follows failed attempt `attempt_number` (1-based), computed
    /// as `initial_delay * backoff_factor^(attempt_number - 1)` rounded to the
    /// nearest nanosecond.
    ///
    /// Returns `None` when the delay cannot be represented as a `Duration`.
    pub fn delay_after(&self, attempt_number: u32) -> Option<Duration> {
        let exponent = i32::try_from(attempt_number.saturating_sub(1)).ok()?;
        if exponent == 0 {
            return Some(self.initial_delay);
        }
        let growth = self.backoff_factor.powi(exponent);
        duration_from_nanos(self.initial_delay.as_nanos() as f64 * growth)
    }

    /// Decides what follows failed attempt `attempt_number`, which carried
    /// `current_delay`.
    ///
    /// The next delay is always strictly greater than `current_delay`, even
    /// when rounding would bring it back down. A next delay too large to
    /// represent is treated as exceeding the ceiling.
    pub fn decide(&self, attempt_number: u32, current_delay: Duration) -> RetryDecision {
        let Some(scaled) = self.delay_after(attempt_number) else {
            return RetryDecision::GiveUp { next_delay: Duration::MAX };
        };

        let next_delay = scaled.max(current_delay.saturating_add(Duration::from_nanos(1)));
        if next_delay > self.max_delay {
            RetryDecision::GiveUp { next_delay }
        } else {
            RetryDecision::Retry { next_delay }
        }
    }

    /// Waits between attempts of a chain that never succeeds.
    pub fn retry_delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let mut current = self.seed_delay();
        let mut attempt_number = 0u32;
        std::iter::from_fn(move || {
            attempt_number = attempt_number.checked_add(1)?;
            match self.decide(attempt_number, current) {
                RetryDecision::Retry { next_delay } => {
                    current = next_delay;
                    Some(next_delay)
                },
                RetryDecision::GiveUp { .. } => None,
            }
        })
    }

    /// Delivery calls an always-failing chain makes before it is abandoned.
    pub fn max_attempts(&self) -> usize {
        self.retry_delays().count() + 1
    }
}

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Rounds a nanosecond count to the nearest representable `Duration`.
fn duration_from_nanos(nanos: f64) -> Option<Duration> {
    if !nanos.is_finite() || nanos < 0.0 {
        return None;
    }
    let secs = (nanos / NANOS_PER_SEC).trunc();
    if secs >= u64::MAX as f64 {
        return None;
    }
    let subsec_nanos = (nanos - secs * NANOS_PER_SEC).round().max(0.0);
    Duration::from_secs(secs as u64).checked_add(Duration::from_nanos(subsec_nanos as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(value: f64) -> Duration {
        Duration::from_secs_f64(value)
    }

    #[test]
    fn default_policy_doubles_up_to_ceiling() {
        let policy = RetryPolicy::default();
        let delays: Vec<Duration> = policy.retry_delays().collect();

        assert_eq!(
            delays,
            [1, 2, 4, 8, 16, 32].map(Duration::from_secs).to_vec(),
            "64s would exceed the 60s ceiling"
        );
        assert_eq!(policy.max_attempts(), 7);
    }

    #[test]
    fn seed_delay_divides_initial_by_factor() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.seed_delay(), Duration::from_millis(500));
        assert_eq!(
            policy.decide(1, policy.seed_delay()),
            RetryDecision::Retry { next_delay: Duration::from_secs(1) }
        );
    }

    #[test]
    fn first_retry_waits_exactly_initial_delay_when_division_is_inexact() {
        let policy =
            RetryPolicy::new(Duration::from_millis(10), Duration::from_millis(50), 3.0).unwrap();

        assert!(policy.seed_delay() < policy.initial_delay);
        assert_eq!(
            policy.decide(1, policy.seed_delay()),
            RetryDecision::Retry { next_delay: Duration::from_millis(10) }
        );
        assert_eq!(
            policy.retry_delays().collect::<Vec<_>>(),
            [Duration::from_millis(10), Duration::from_millis(30)]
        );
    }

    #[test]
    fn attempt_counts_match_closed_form_at_ceiling_boundaries() {
        // Smallest k with initial * factor^(k - 1) > max, in whole nanoseconds.
        fn expected_attempts(initial_ns: u64, factor: u64, max_ns: u64) -> usize {
            let (mut attempts, mut delay) = (1, initial_ns);
            while delay <= max_ns {
                delay *= factor;
                attempts += 1;
            }
            attempts
        }

        for (initial_ns, factor, max_ns) in [
            (10_000_000, 3, 50_000_000),
            (10_000_000, 3, 30_000_000),
            (10_000_000, 3, 29_999_999),
            (10_000_000, 3, 9_999_999),
            (1_000_000_000, 2, 60_000_000_000),
            (1_000_000_000, 2, 64_000_000_000),
            (1_000_000_000, 2, 63_999_999_999),
            (250_000_000, 5, 156_250_000_000),
            (250_000_000, 5, 156_249_999_999),
        ] {
            let policy = RetryPolicy::new(
                Duration::from_nanos(initial_ns),
                Duration::from_nanos(max_ns),
                factor as f64,
            )
            .unwrap();

            assert_eq!(
                policy.max_attempts(),
                expected_attempts(initial_ns, factor, max_ns),
                "initial={initial_ns}ns factor={factor} max={max_ns}ns"
            );
        }
    }

    #[test]
    fn short_ceiling_allows_three_attempts() {
        let policy = RetryPolicy::new(secs(0.01), secs(0.05), 3.0).unwrap();

        assert_eq!(policy.max_attempts(), 3);

        let delays: Vec<Duration> = policy.retry_delays().collect();
        assert_eq!(delays.len(), 2);
        assert!(delays[0] < delays[1]);
        assert!(delays.iter().all(|delay| *delay <= policy.max_delay));
    }

    #[test]
    fn zero_ceiling_gives_up_after_first_attempt() {
        let policy = RetryPolicy::new(secs(1.0), Duration::ZERO, 2.0).unwrap();

        assert!(matches!(policy.decide(1, policy.seed_delay()), RetryDecision::GiveUp { .. }));
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn delay_equal_to_ceiling_still_retries() {
        let policy = RetryPolicy::new(secs(1.0), secs(4.0), 2.0).unwrap();

        assert_eq!(
            policy.decide(3, Duration::from_secs(2)),
            RetryDecision::Retry { next_delay: Duration::from_secs(4) }
        );
        assert_eq!(
            policy.decide(4, Duration::from_secs(4)),
            RetryDecision::GiveUp { next_delay: Duration::from_secs(8) }
        );
    }

    #[test]
    fn unrepresentable_delay_gives_up() {
        let policy = RetryPolicy::new(secs(1.0), Duration::MAX, 1e300).unwrap();

        assert_eq!(
            policy.decide(2, Duration::from_secs(1)),
            RetryDecision::GiveUp { next_delay: Duration::MAX }
        );
    }

    #[test]
    fn tiny_factor_still_grows() {
        let policy = RetryPolicy::new(secs(1.0), secs(60.0), 1.000_000_000_1).unwrap();
        let current = Duration::from_secs(1);

        match policy.decide(2, current) {
            RetryDecision::Retry { next_delay } => assert!(next_delay > current),
            RetryDecision::GiveUp { .. } => unreachable!("1s is below the ceiling"),
        }
    }

    #[test]
    fn invalid_policies_rejected() {
        for factor in [1.0, 0.5, -2.0, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(
                    RetryPolicy::new(secs(1.0), secs(60.0), factor),
                    Err(DeliveryError::ConfigurationError { .. })
                ),
                "factor {factor} should be rejected"
            );
        }

        assert!(RetryPolicy::new(Duration::ZERO, secs(60.0), 2.0).is_err());
    }
}
