use std::time::{Duration, Instant};

/// Time source used by the scheduler's rate control.
pub trait Clock {
    /// Time elapsed since the clock's origin.
    fn now(&mut self) -> Duration;

    /// Blocks (or pretends to block) for `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// Wall clock backed by [`Instant`] and [`std::thread::sleep`].
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&mut self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Deterministic clock for simulations.
///
/// Every reading advances time by `read_cost`, which stands in for the work
/// performed between two readings. Sleeping advances time by exactly the
/// requested duration.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Duration,
    read_cost: Duration,
    slept: Duration,
    sleeps: u64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_cost(read_cost: Duration) -> Self {
        Self {
            read_cost,
            ..Self::default()
        }
    }

    pub fn set_read_cost(&mut self, read_cost: Duration) {
        self.read_cost = read_cost;
    }

    pub fn advance(&mut self, delta: Duration) {
        self.now += delta;
    }

    pub fn reset(&mut self) {
        self.now = Duration::ZERO;
        self.slept = Duration::ZERO;
        self.sleeps = 0;
    }

    /// Current time without charging a reading.
    pub fn peek(&self) -> Duration {
        self.now
    }

    /// Total time spent in [`Clock::sleep`].
    pub fn slept(&self) -> Duration {
        self.slept
    }

    pub fn sleep_count(&self) -> u64 {
        self.sleeps
    }
}

impl Clock for ManualClock {
    fn now(&mut self) -> Duration {
        let reading = self.now;
        self.now += self.read_cost;
        reading
    }

    fn sleep(&mut self, duration: Duration) {
        self.now += duration;
        self.slept += duration;
        self.sleeps += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_are_spaced_by_cost() {
        let mut clock = ManualClock::with_read_cost(Duration::from_millis(5));
        let first = clock.now();
        let second = clock.now();
        assert_eq!(second - first, Duration::from_millis(5));
    }

    #[test]
    fn sleeping_advances_and_records() {
        let mut clock = ManualClock::new();
        clock.sleep(Duration::from_millis(20));
        clock.advance(Duration::from_millis(1));

        assert_eq!(clock.peek(), Duration::from_millis(21));
        assert_eq!(clock.slept(), Duration::from_millis(20));
        assert_eq!(clock.sleep_count(), 1);

        clock.reset();
        assert_eq!(clock.peek(), Duration::ZERO);
        assert_eq!(clock.sleep_count(), 0);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let mut clock = SystemClock::new();
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}
