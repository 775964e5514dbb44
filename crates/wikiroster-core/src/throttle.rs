//! Global request pacing for polite fetching.
//!
//! The wiki's API terms ask for a substantial gap between requests, so
//! the pipeline holds a single shared gate: every remote fetch waits
//! until the configured gap has elapsed since the previous one. Cache
//! hits never touch the gate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// A shared minimum-gap gate over consecutive fetches.
///
/// Clones share the same gate. The first `wait` of a run returns
/// immediately; each later call sleeps out the remainder of `min_gap`
/// since the previous call.
#[derive(Clone)]
pub struct Throttle {
    min_gap: Duration,
    last_fetch: Arc<Mutex<Option<Instant>>>,
}

impl Throttle {
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last_fetch: Arc::new(Mutex::new(None)),
        }
    }

    /// Block until the gap since the previous fetch has elapsed, then
    /// mark now as the latest fetch time.
    pub async fn wait(&self) {
        let mut last = self.last_fetch.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_gap {
                let sleep_duration = self.min_gap - elapsed;
                tracing::debug!(
                    sleep_ms = %sleep_duration.as_millis(),
                    "Throttling fetch"
                );
                tokio::time::sleep(sleep_duration).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_wait_is_immediate() {
        let throttle = Throttle::new(Duration::from_millis(200));

        let start = Instant::now();
        throttle.wait().await;
        let elapsed = start.elapsed();

        assert!(
            elapsed < Duration::from_millis(50),
            "First wait should not sleep, elapsed: {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn second_wait_enforces_gap() {
        let throttle = Throttle::new(Duration::from_millis(100));

        let start = Instant::now();
        throttle.wait().await;
        throttle.wait().await;
        let elapsed = start.elapsed();

        assert!(
            elapsed >= Duration::from_millis(100),
            "Second wait should sleep out the gap, elapsed: {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn clones_share_the_gate() {
        let throttle = Throttle::new(Duration::from_millis(100));
        let other = throttle.clone();

        let start = Instant::now();
        throttle.wait().await;
        other.wait().await;
        let elapsed = start.elapsed();

        assert!(
            elapsed >= Duration::from_millis(100),
            "A clone should see the original's last fetch, elapsed: {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn elapsed_gap_does_not_sleep() {
        let throttle = Throttle::new(Duration::from_millis(20));
        throttle.wait().await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        let start = Instant::now();
        throttle.wait().await;
        let elapsed = start.elapsed();

        assert!(
            elapsed < Duration::from_millis(15),
            "Gap already elapsed, wait should return immediately, elapsed: {elapsed:?}"
        );
    }
}
