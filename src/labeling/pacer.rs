// Call pacing for labeling endpoints.
//
// Hosted chat APIs throttle bursts, and a local Ollama instance slows to a
// crawl when requests pile up. The pacer enforces a minimum interval between
// consecutive calls so concurrent category tasks don't fire back-to-back.
//
// Designed to be shared across tasks via Arc<Pacer>, using interior
// mutability (Mutex) so callers only need a &self reference.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Enforces a minimum interval between consecutive calls.
///
/// Thread-safe via interior mutability so it can be shared across
/// concurrent tasks with `Arc<Pacer>`.
pub struct Pacer {
    /// Minimum gap between consecutive calls.
    min_interval: Duration,
    /// Timestamp of the most recent call.
    last_call: Mutex<Option<Instant>>,
}

impl Pacer {
    /// Create a pacer with the given minimum interval between calls.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Convenience constructor: at most `calls` per second, evenly spaced.
    pub fn per_second(calls: u32) -> Self {
        let interval = if calls == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(1000 / calls as u64)
        };
        Self::new(interval)
    }

    /// Wait until the minimum interval since the previous call has elapsed,
    /// then claim the slot.
    ///
    /// The wait is computed while holding the lock, but the lock is dropped
    /// before sleeping (to avoid holding a MutexGuard across await). The
    /// loop re-checks after sleeping so concurrent waiters serialize instead
    /// of all claiming the same slot.
    pub async fn wait(&self) {
        loop {
            let wait = {
                let mut last = self.last_call.lock().unwrap();
                let now = Instant::now();
                match *last {
                    Some(prev) => {
                        let elapsed = now.duration_since(prev);
                        if elapsed < self.min_interval {
                            Some(self.min_interval - elapsed)
                        } else {
                            *last = Some(now);
                            None
                        }
                    }
                    None => {
                        *last = Some(now);
                        None
                    }
                }
            }; // Lock is dropped here

            match wait {
                None => return,
                Some(wait) => tokio::time::sleep(wait).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_call_is_immediate() {
        let pacer = Pacer::new(Duration::from_millis(100));

        let start = Instant::now();
        pacer.wait().await;
        let elapsed = start.elapsed();

        assert!(
            elapsed < Duration::from_millis(50),
            "First call should be near-instant, got {:?}",
            elapsed
        );
        assert!(pacer.last_call.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_second_call_waits_for_interval() {
        let pacer = Pacer::new(Duration::from_millis(50));

        let start = Instant::now();
        pacer.wait().await;
        pacer.wait().await;
        let elapsed = start.elapsed();

        assert!(
            elapsed >= Duration::from_millis(45),
            "Expected at least ~50ms between calls, got {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_zero_interval_allows_rapid_fire() {
        let pacer = Pacer::new(Duration::ZERO);

        let start = Instant::now();
        for _ in 0..50 {
            pacer.wait().await;
        }
        let elapsed = start.elapsed();

        assert!(
            elapsed < Duration::from_millis(50),
            "Zero-interval calls should be near-instant, got {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_concurrent_tasks_are_spaced_out() {
        let pacer = Arc::new(Pacer::new(Duration::from_millis(30)));
        let mut handles = Vec::new();

        let start = Instant::now();
        for _ in 0..3 {
            let p = Arc::clone(&pacer);
            handles.push(tokio::spawn(async move {
                p.wait().await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let elapsed = start.elapsed();

        // First claim is immediate; the other two serialize at ~30ms each
        assert!(
            elapsed >= Duration::from_millis(55),
            "Expected at least ~60ms for 3 concurrent calls at 30ms spacing, got {:?}",
            elapsed
        );
    }

    #[test]
    fn test_per_second_spacing() {
        let pacer = Pacer::per_second(4);
        assert_eq!(pacer.min_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_per_second_zero_means_unpaced() {
        let pacer = Pacer::per_second(0);
        assert_eq!(pacer.min_interval, Duration::ZERO);
    }
}
