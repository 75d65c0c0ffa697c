use std::time::Duration;

/// Exponential reconnect backoff.
///
/// `delay(1)` is the base delay; every further attempt multiplies it by
/// `multiplier` until `max_delay` caps it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            multiplier: 2.0,
            max_delay: Duration::from_millis(60_000),
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (1-based). Attempt 0 is treated
    /// like attempt 1.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base_ms = self.base_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;
        let ms = base_ms * self.multiplier.max(1.0).powi(exponent);
        // powi overflows to inf for large exponents; min() handles that.
        Duration::from_millis(ms.min(max_ms) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_retry_uses_base_delay() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay(1), Duration::from_millis(1000));
    }

    #[test]
    fn test_sequence_is_exponential() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay(2), Duration::from_millis(2000));
        assert_eq!(backoff.delay(3), Duration::from_millis(4000));
        assert_eq!(backoff.delay(4), Duration::from_millis(8000));
    }

    #[test]
    fn test_capped_at_max_delay() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay(7), Duration::from_millis(60_000));
        assert_eq!(backoff.delay(1_000), Duration::from_millis(60_000));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_millis(60_000));
    }

    #[test]
    fn test_non_decreasing() {
        let backoff = Backoff {
            base_delay: Duration::from_millis(250),
            multiplier: 1.5,
            max_delay: Duration::from_secs(10),
        };
        let mut last = Duration::ZERO;
        for attempt in 1..64 {
            let d = backoff.delay(attempt);
            assert!(d >= last, "delay({attempt}) went backwards");
            assert!(d <= backoff.max_delay);
            last = d;
        }
    }

    #[test]
    fn test_attempt_zero_matches_first_retry() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay(0), backoff.delay(1));
    }
}
