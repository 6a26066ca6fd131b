use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free "at most once per interval" gate for log statements on hot
/// paths, such as send failures on a 20 ms packet clock.
#[derive(Debug)]
pub struct LogThrottle {
    origin: Instant,
    interval_ms: u64,
    /// Millis since `origin` of the last permitted emit, plus one; zero means never.
    last_emit: AtomicU64,
    suppressed: AtomicU64,
}

impl LogThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            origin: Instant::now(),
            interval_ms: interval.as_millis() as u64,
            last_emit: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
        }
    }

    /// Returns true if the caller should log now. Calls that return false
    /// are counted and can be reported with [`LogThrottle::take_suppressed`].
    pub fn should_log(&self) -> bool {
        let now = self.origin.elapsed().as_millis() as u64 + 1;
        let last = self.last_emit.load(Ordering::Relaxed);
        if last != 0 && now.saturating_sub(last) < self.interval_ms {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        match self
            .last_emit
            .compare_exchange(last, now, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => true,
            Err(_) => {
                self.suppressed.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Number of suppressed calls since the last call to this method
    pub fn take_suppressed(&self) -> u64 {
        self.suppressed.swap(0, Ordering::Relaxed)
    }
}
