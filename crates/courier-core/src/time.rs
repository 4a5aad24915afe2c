//! Time abstractions for deterministic scheduling.
//!
//! The retry scheduler never reads the system clock directly. It asks an
//! injected [`Clock`] for the current instant and suspends through
//! [`Clock::sleep`], so tests can drive backoff sequences on virtual time.

use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant, SystemTime},
};

/// Clock abstraction for time operations.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current monotonic instant used for due times.
    fn now(&self) -> Instant;

    /// Returns the current wall-clock time for event timestamps.
    fn now_system(&self) -> SystemTime;

    /// Suspends the caller for the given duration.
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Production clock backed by the system clock and tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealClock;

impl RealClock {
    /// Creates a new real clock instance.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_system(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Virtual clock for deterministic tests.
///
/// Time only moves when [`TestClock::advance`] or [`Clock::sleep`] is called;
/// sleeping advances the clock by the requested duration and yields once.
/// Clones share the same timeline.
#[derive(Debug, Clone)]
pub struct TestClock {
    elapsed_ns: Arc<AtomicU64>,
    base_instant: Instant,
    base_system: SystemTime,
}

impl TestClock {
    /// Creates a test clock starting at the current wall-clock time.
    pub fn new() -> Self {
        Self::with_start_time(SystemTime::now())
    }

    /// Creates a test clock whose wall-clock time starts at `start`.
    pub fn with_start_time(start: SystemTime) -> Self {
        Self {
            elapsed_ns: Arc::new(AtomicU64::new(0)),
            base_instant: Instant::now(),
            base_system: start,
        }
    }

    /// Advances the clock by the specified duration.
    pub fn advance(&self, duration: Duration) {
        let duration_ns = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        let _ = self.elapsed_ns.fetch_update(Ordering::AcqRel, Ordering::Acquire, |elapsed| {
            Some(elapsed.saturating_add(duration_ns))
        });
    }

    /// Returns virtual time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns.load(Ordering::Acquire))
    }

    /// Returns the wall-clock time the clock was created at.
    pub fn start_time(&self) -> SystemTime {
        self.base_system
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.base_instant + self.elapsed()
    }

    fn now_system(&self) -> SystemTime {
        self.base_system + self.elapsed()
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.advance(duration);
        Box::pin(tokio::task::yield_now())
    }
}

#[cfg(test)]
mod tests {
    use std::time::UNIX_EPOCH;

    use super::*;

    #[test]
    fn test_clock_advances() {
        let clock = TestClock::new();
        let start = clock.now();

        clock.advance(Duration::from_secs(10));

        assert_eq!(clock.now().duration_since(start), Duration::from_secs(10));
        assert_eq!(clock.elapsed(), Duration::from_secs(10));
    }

    #[test]
    fn test_clock_system_time_follows_monotonic() {
        let start = UNIX_EPOCH + Duration::from_secs(1000);
        let clock = TestClock::with_start_time(start);

        assert_eq!(clock.now_system(), start);

        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.now_system(), start + Duration::from_millis(1500));
    }

    #[test]
    fn clones_share_timeline() {
        let clock = TestClock::new();
        let other = clock.clone();

        other.advance(Duration::from_secs(3));

        assert_eq!(clock.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_clock_sleep_advances_without_waiting() {
        let clock = TestClock::new();
        let start = clock.now();
        let wall_start = Instant::now();

        clock.sleep(Duration::from_secs(3600)).await;

        assert_eq!(clock.now().duration_since(start), Duration::from_secs(3600));
        assert!(wall_start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn real_clock_sleep_waits() {
        let clock = RealClock::new();
        let start = clock.now();

        clock.sleep(Duration::from_millis(20)).await;

        assert!(clock.now().duration_since(start) >= Duration::from_millis(20));
    }
}
