//! Clock injection.
//!
//! `created_at`, `now`, and the worker's sleep between retry rounds are all
//! routed through this trait so that tests can fast-forward through the
//! retry schedule and the 12-hour give-up horizon without real-time waits.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

#[async_trait::async_trait]
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> SystemTime;

    async fn sleep(&self, duration: Duration);
}

pub type SharedClock = Arc<dyn Clock>;

/// Production clock: wall-clock time, real sleeps via `tokio::time`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait::async_trait]
impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Test clock whose `now()` advances in lockstep with `tokio::time`'s paused
/// clock rather than the OS wall clock: it anchors a `SystemTime` to a
/// `tokio::time::Instant` at construction and reports `now()` as that anchor
/// plus however far the (pause-aware) `Instant` has moved since. Under
/// `#[tokio::test(start_paused = true)]`, a single `tokio::time::advance`
/// call fast-forwards both the worker's `sleep`s *and* its `since_created`
/// accounting — including the give-up horizon — with no real waiting.
pub struct TestClock {
    epoch_system: SystemTime,
    epoch_instant: tokio::time::Instant,
}

impl TestClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch_system: SystemTime::now(),
            epoch_instant: tokio::time::Instant::now(),
        }
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Clock for TestClock {
    fn now(&self) -> SystemTime {
        self.epoch_system + self.epoch_instant.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
