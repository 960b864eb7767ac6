//! Minimum-interval gate owned by a single source adapter.
//!
//! Every adapter builds its own [`Throttle`], so a slow source never delays
//! another one. Calls reserve the next free slot under a short lock and then
//! sleep outside of it, which keeps concurrent callers of the same adapter
//! spaced by at least `min_interval` measured from the start of each request.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    /// Start time reserved by the most recent request; `None` before the first.
    last_start: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until this caller may start its request. Returns the time spent
    /// waiting.
    pub async fn acquire(&self) -> Duration {
        if self.min_interval.is_zero() {
            return Duration::ZERO;
        }

        let now = Instant::now();
        let slot = {
            let mut last = self.last_start.lock().await;
            let slot = match *last {
                Some(prev) if prev + self.min_interval > now => prev + self.min_interval,
                _ => now,
            };
            *last = Some(slot);
            slot
        };

        if slot > now {
            let wait = slot - now;
            log::debug!("Throttling request for {}ms", wait.as_millis());
            sleep_until(slot).await;
            wait
        } else {
            Duration::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_immediate() {
        let throttle = Throttle::new(Duration::from_millis(500));
        let waited = throttle.acquire().await;
        assert_eq!(waited, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_requests_are_spaced() {
        let throttle = Throttle::new(Duration::from_millis(500));

        let first_began = Instant::now();
        throttle.acquire().await;
        throttle.acquire().await;
        let second_began = Instant::now();

        assert!(second_began - first_began >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_interval_elapsed() {
        let throttle = Throttle::new(Duration::from_millis(200));
        throttle.acquire().await;
        tokio::time::advance(Duration::from_millis(300)).await;
        assert_eq!(throttle.acquire().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_get_distinct_slots() {
        let throttle = std::sync::Arc::new(Throttle::new(Duration::from_millis(100)));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let t = throttle.clone();
            handles.push(tokio::spawn(async move {
                t.acquire().await;
                Instant::now()
            }));
        }

        let mut starts = Vec::new();
        for h in handles {
            starts.push(h.await.unwrap() - start);
        }
        starts.sort();

        assert_eq!(starts[0], Duration::ZERO);
        assert!(starts[1] >= Duration::from_millis(100));
        assert!(starts[2] >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_zero_interval_disables() {
        let throttle = Throttle::new(Duration::ZERO);
        throttle.acquire().await;
        assert_eq!(throttle.acquire().await, Duration::ZERO);
    }
}
