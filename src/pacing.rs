//! Pacing - simulated propagation and retransmission delays
//!
//! Every pause the protocols take goes through a [`Pacer`], so the CLI can
//! really sleep while tests advance a logical clock and finish instantly.
use std::thread;
use std::time::Duration;

/// Blocking delay function
///
/// A pause is not a suspension point: nothing else runs while it lasts.
pub trait Pacer {
    fn pause(&mut self, duration: Duration);
}

impl<P: Pacer + ?Sized> Pacer for &mut P {
    fn pause(&mut self, duration: Duration) {
        (**self).pause(duration)
    }
}

/// Wall-clock pacing via `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Pacer for ThreadSleep {
    fn pause(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Pacing that returns immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacer for NoDelay {
    fn pause(&mut self, _duration: Duration) {}
}

/// Logical clock - records simulated time without waiting
#[derive(Debug, Clone, Default)]
pub struct LogicalClock {
    elapsed: Duration,
    pauses: Vec<Duration>,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total simulated time spent paused
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Every pause taken, in order
    pub fn pauses(&self) -> &[Duration] {
        &self.pauses
    }
}

impl Pacer for LogicalClock {
    fn pause(&mut self, duration: Duration) {
        self.elapsed += duration;
        self.pauses.push(duration);
    }
}

/// Retransmission backoff policy
///
/// Formula: `delay = min(base_ms * multiplier^attempt, max_delay_ms)`.
/// A multiplier of 1 gives the fixed pacing Stop-and-Wait uses by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base_ms: u64,
    pub multiplier: u64,
    pub max_delay_ms: u64,
}

impl Backoff {
    /// Same delay before every retransmission
    pub fn fixed(delay_ms: u64) -> Self {
        Self {
            base_ms: delay_ms,
            multiplier: 1,
            max_delay_ms: delay_ms,
        }
    }

    /// Truncated exponential backoff capped at `max_delay_ms`
    pub fn exponential(base_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            base_ms,
            multiplier: crate::BACKOFF_MULTIPLIER,
            max_delay_ms,
        }
    }

    /// Delay in milliseconds after failed attempt number `attempt` (0-based)
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        let backoff = self
            .base_ms
            .saturating_mul(self.multiplier.saturating_pow(attempt));
        backoff.min(self.max_delay_ms)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.delay_ms(attempt))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::fixed(crate::RETRANSMIT_DELAY_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let backoff = Backoff::exponential(100, 5000);
        assert_eq!(backoff.delay_ms(0), 100);
        assert_eq!(backoff.delay_ms(1), 200);
        assert_eq!(backoff.delay_ms(2), 400);
        assert_eq!(backoff.delay_ms(3), 800);
        assert_eq!(backoff.delay_ms(10), 5000); // Capped
    }

    #[test]
    fn test_fixed_backoff() {
        let backoff = Backoff::default();
        for attempt in [0, 1, 5, 1000] {
            assert_eq!(backoff.delay_ms(attempt), crate::RETRANSMIT_DELAY_MS);
        }
    }

    #[test]
    fn test_backoff_saturates() {
        let backoff = Backoff::exponential(u64::MAX / 2, u64::MAX);
        assert_eq!(backoff.delay_ms(u32::MAX), u64::MAX);
    }

    #[test]
    fn test_logical_clock_accumulates() {
        let mut clock = LogicalClock::new();
        clock.pause(Duration::from_millis(500));
        clock.pause(Duration::from_millis(1000));

        assert_eq!(clock.elapsed(), Duration::from_millis(1500));
        assert_eq!(clock.pauses().len(), 2);
    }

    #[test]
    fn test_pacer_through_mut_ref() {
        fn pause_once<P: Pacer>(mut pacer: P) {
            pacer.pause(Duration::from_millis(7));
        }

        let mut clock = LogicalClock::new();
        pause_once(&mut clock);
        assert_eq!(clock.elapsed(), Duration::from_millis(7));
    }
}
