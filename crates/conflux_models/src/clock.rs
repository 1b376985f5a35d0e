//! Time source used by middleware that paces output.
//!
//! [`Clock`] wraps a [`ClockProvider`]. The default provider reads
//! `Instant::now()` and sleeps on the tokio timer; tests substitute
//! [`MockClock`], which advances virtual time instead of waiting.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Trait for providing current time and delays.
///
/// Implement this for custom time providers (e.g., a mock clock for testing).
///
/// # Example
///
/// ```no_run
/// use std::time::{Duration, Instant};
/// use futures::future::BoxFuture;
/// use conflux_models::clock::ClockProvider;
///
/// /// A clock that never waits and always reports the same instant.
/// struct FrozenClock(Instant);
///
/// impl ClockProvider for FrozenClock {
///     fn now(&self) -> Instant {
///         self.0
///     }
///
///     fn sleep(&self, _duration: Duration) -> BoxFuture<'static, ()> {
///         Box::pin(async {})
///     }
/// }
/// ```
pub trait ClockProvider: Send + Sync + 'static {
    /// Returns the current instant.
    fn now(&self) -> Instant;

    /// Returns a future that completes once `duration` has passed.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// System clock provider backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
struct SystemClock;

impl ClockProvider for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Shared time source.
///
/// Cloning is cheap; clones share the same provider.
#[derive(Clone)]
pub struct Clock {
    provider: Arc<dyn ClockProvider>,
}

impl core::fmt::Debug for Clock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Clock").finish_non_exhaustive()
    }
}

impl Clock {
    /// Creates a Clock using the system clock.
    #[must_use]
    pub fn system() -> Self {
        Self {
            provider: Arc::new(SystemClock),
        }
    }

    /// Creates a Clock with a custom provider.
    #[must_use]
    pub fn with_provider(provider: Arc<dyn ClockProvider>) -> Self {
        Self { provider }
    }

    /// Returns the current instant.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.provider.now()
    }

    /// Returns the duration elapsed since the given instant.
    #[must_use]
    pub fn elapsed_since(&self, earlier: Instant) -> Duration {
        self.now().duration_since(earlier)
    }

    /// Waits for `duration`. A zero duration completes immediately.
    pub async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            self.provider.sleep(duration).await;
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MockClock for Testing
// ─────────────────────────────────────────────────────────────────────────────

/// Mock clock with controllable virtual time.
///
/// Sleeping completes immediately, advances the virtual time and records the
/// requested duration.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use std::time::{Duration, Instant};
/// use conflux_models::clock::{Clock, MockClock};
///
/// let mock = Arc::new(MockClock::new(Instant::now()));
/// let clock = Clock::with_provider(mock.clone());
///
/// clock.sleep(Duration::from_millis(20)).await;
/// assert_eq!(mock.sleeps(), vec![Duration::from_millis(20)]);
/// ```
#[cfg(any(test, feature = "test-utils"))]
pub struct MockClock {
    current: parking_lot::RwLock<Instant>,
    sleeps: parking_lot::Mutex<Vec<Duration>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockClock {
    /// Creates a mock clock set to the given instant.
    #[must_use]
    pub fn new(start: Instant) -> Self {
        Self {
            current: parking_lot::RwLock::new(start),
            sleeps: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Advances the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        *self.current.write() += duration;
    }

    /// Returns the current instant.
    #[must_use]
    pub fn current(&self) -> Instant {
        *self.current.read()
    }

    /// Returns every duration slept so far, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    /// Total virtual time spent sleeping.
    #[must_use]
    pub fn total_slept(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl ClockProvider for MockClock {
    fn now(&self) -> Instant {
        self.current()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.sleeps.lock().push(duration);
        self.advance(duration);
        Box::pin(async {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_default_uses_system_time() {
        let clock = Clock::default();
        let before = Instant::now();
        let clock_now = clock.now();
        let after = Instant::now();

        assert!(clock_now >= before);
        assert!(clock_now <= after);
    }

    #[tokio::test]
    async fn mock_clock_advances_on_sleep() {
        let start = Instant::now();
        let mock = Arc::new(MockClock::new(start));
        let clock = Clock::with_provider(mock.clone());

        clock.sleep(Duration::from_millis(20)).await;
        clock.sleep(Duration::ZERO).await;
        clock.sleep(Duration::from_millis(5)).await;

        assert_eq!(
            mock.sleeps(),
            vec![Duration::from_millis(20), Duration::from_millis(5)]
        );
        assert_eq!(clock.elapsed_since(start), Duration::from_millis(25));
    }
}
