use std::time::Instant;

#[cfg(test)]
use mockall::automock;

/// The endpoint's only source of time, kept behind a trait so tests can step
///  time explicitly - the same seam the socket uses for I/O. Timestamps are
///  seconds as `f64`; they travel inside ping packets but are only ever
///  interpreted by the endpoint that wrote them, so the epoch is free to be
///  per-process.
#[cfg_attr(test, automock)]
pub trait Clock {
    /// Monotonic seconds since some fixed epoch.
    fn now(&self) -> f64;
}

/// Seconds since the clock was created.
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> MonotonicClock {
        MonotonicClock {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic() {
        let clock = MonotonicClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(first >= 0.0);
        assert!(second >= first);
    }
}
