//! Exponential backoff between delivery attempts.

use std::time::Duration;

/// Exponential backoff with jitter.
///
/// The n-th delay is `min(base * factor^n, max)`, scaled by a factor in
/// `[1 - jitter, 1 + jitter]`.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    factor: f64,
    jitter: f64,
    attempt: u32,
}

impl Backoff {
    pub const fn new(base: Duration, max: Duration, factor: f64, jitter: f64) -> Self {
        Self {
            base,
            max,
            factor,
            jitter,
            attempt: 0,
        }
    }

    /// Doubling backoff from `base`, capped at 30 seconds, ±10% jitter.
    pub fn from_base(base: Duration) -> Self {
        Self::new(base, Duration::from_secs(30), 2.0, 0.1)
    }

    /// Next delay; advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let exp = i32::try_from(self.attempt).unwrap_or(i32::MAX);
        let delay = self.base.mul_f64(self.factor.powi(exp)).min(self.max);
        let jitter_factor = 1.0 - self.jitter + self.pseudo_random() * 2.0 * self.jitter;
        self.attempt = self.attempt.saturating_add(1);
        delay.mul_f64(jitter_factor)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    // LCG step on the attempt number; uniformity is not needed for jitter.
    fn pseudo_random(&self) -> f64 {
        let hash = self
            .attempt
            .wrapping_mul(1_103_515_245)
            .wrapping_add(12_345);
        f64::from(hash % 100) / 100.0
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_base(Duration::from_millis(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn within(d: Duration, expected_ms: u64, jitter: f64) -> bool {
        let lo = Duration::from_millis(expected_ms).mul_f64(1.0 - jitter);
        let hi = Duration::from_millis(expected_ms).mul_f64(1.0 + jitter);
        d >= lo && d <= hi
    }

    #[test]
    fn test_delays_grow() {
        let mut b = Backoff::default();
        assert!(within(b.next_delay(), 100, 0.1));
        assert!(within(b.next_delay(), 200, 0.1));
        assert!(within(b.next_delay(), 400, 0.1));
        assert_eq!(b.attempt(), 3);
    }

    #[test]
    fn test_capped_at_max() {
        let mut b = Backoff::new(Duration::from_secs(1), Duration::from_secs(5), 2.0, 0.0);
        for _ in 0..10 {
            b.next_delay();
        }
        assert_eq!(b.next_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_reset() {
        let mut b = Backoff::new(Duration::from_millis(10), Duration::from_secs(1), 2.0, 0.0);
        b.next_delay();
        b.next_delay();
        b.reset();
        assert_eq!(b.attempt(), 0);
        assert_eq!(b.next_delay(), Duration::from_millis(10));
    }

    #[test]
    fn test_no_jitter_is_exact() {
        let mut b = Backoff::new(Duration::from_millis(50), Duration::from_secs(1), 3.0, 0.0);
        assert_eq!(b.next_delay(), Duration::from_millis(50));
        assert_eq!(b.next_delay(), Duration::from_millis(150));
    }
}
