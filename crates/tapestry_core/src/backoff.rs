//! Backoff policy for retries.
//!
//! The first retry waits `base`; each following wait is the previous one
//! multiplied by `factor`, capped at `max`.

use crate::error::{RunError, RunResult};
use std::fmt;
use std::time::Duration;

/// Delay growth between retry attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Delay before the first retry
    base: Duration,
    /// Multiplier applied after each failed attempt
    factor: f64,
    /// Upper bound for any single delay
    max: Duration,
}

impl Backoff {
    /// Immediate retry: zero delay, factor 1
    pub const NONE: Self = Self {
        base: Duration::ZERO,
        factor: 1.0,
        max: Duration::ZERO,
    };

    /// Create a backoff policy
    ///
    /// # Errors
    ///
    /// Returns error if `factor` is negative or not finite
    pub fn new(base: Duration, factor: f64, max: Duration) -> RunResult<Self> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(RunError::invalid_config(
                "backoff.factor",
                format!("must be a finite non-negative number, got {}", factor),
            ));
        }
        Ok(Self { base, factor, max })
    }

    /// Constant delay between attempts
    #[must_use]
    pub const fn fixed(delay: Duration) -> Self {
        Self {
            base: delay,
            factor: 1.0,
            max: delay,
        }
    }

    /// Delay before the first retry
    #[must_use]
    pub const fn base(&self) -> Duration {
        self.base
    }

    /// Growth factor
    #[must_use]
    pub const fn factor(&self) -> f64 {
        self.factor
    }

    /// Delay cap
    #[must_use]
    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Delay that follows `current`: `min(current * factor, max)`
    #[must_use]
    pub fn next(&self, current: Duration) -> Duration {
        let scaled = current.as_secs_f64() * self.factor;
        if scaled >= self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(scaled)
        }
    }

    /// Endless sequence of waits: `base`, then `next` of the previous wait
    pub fn waits(&self) -> impl Iterator<Item = Duration> {
        let backoff = *self;
        std::iter::successors(Some(self.base), move |current| Some(backoff.next(*current)))
    }

    /// The first `retries` waits this policy produces
    #[must_use]
    pub fn schedule(&self, retries: usize) -> Vec<Duration> {
        self.waits().take(retries).collect()
    }

    /// Summary of a `retries`-long schedule listing at most `limit` waits
    ///
    /// Listing stops as soon as the delay settles, so the cost does not
    /// depend on `retries`.
    #[must_use]
    pub fn preview(&self, retries: usize, limit: usize) -> SchedulePreview {
        let mut listed = Vec::new();
        let mut settled = false;
        let mut current = self.base;
        while listed.len() < retries.min(limit) {
            listed.push(current);
            let next = self.next(current);
            if next == current {
                settled = true;
                break;
            }
            current = next;
        }
        SchedulePreview {
            remaining: retries - listed.len(),
            listed,
            settled,
        }
    }
}

/// Leading waits of a retry schedule plus what follows them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePreview {
    /// Waits in order, up to the point where the delay settles
    pub listed: Vec<Duration>,
    /// Waits after the listed ones
    pub remaining: usize,
    /// The remaining waits all equal the last listed one
    pub settled: bool,
}

impl fmt::Display for SchedulePreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, wait) in self.listed.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}ms", wait.as_millis())?;
        }
        match self.listed.last() {
            Some(last) if self.remaining > 0 && self.settled => {
                write!(f, ", then {}x {}ms", self.remaining, last.as_millis())
            }
            Some(_) if self.remaining > 0 => write!(f, ", ... {} more", self.remaining),
            _ => Ok(()),
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_default_is_immediate() {
        let backoff = Backoff::default();
        assert_eq!(backoff.base(), Duration::ZERO);
        assert_eq!(backoff.factor(), 1.0);
        assert_eq!(backoff.schedule(3), vec![Duration::ZERO; 3]);
    }

    #[test]
    fn test_exponential_schedule_caps() {
        let backoff = Backoff::new(ms(50), 2.0, ms(200)).unwrap();
        assert_eq!(backoff.schedule(4), vec![ms(50), ms(100), ms(200), ms(200)]);
    }

    #[test]
    fn test_fixed_schedule() {
        let backoff = Backoff::fixed(ms(10));
        assert_eq!(backoff.schedule(3), vec![ms(10), ms(10), ms(10)]);
    }

    #[test]
    fn test_invalid_factor() {
        assert!(Backoff::new(ms(1), -1.0, ms(10)).is_err());
        assert!(Backoff::new(ms(1), f64::NAN, ms(10)).is_err());
        assert!(Backoff::new(ms(1), f64::INFINITY, ms(10)).is_err());
    }

    #[test]
    fn test_base_above_max_is_kept_for_first_retry() {
        // Only delays after the first are capped.
        let backoff = Backoff::new(ms(300), 2.0, ms(200)).unwrap();
        assert_eq!(backoff.schedule(2), vec![ms(300), ms(200)]);
    }

    #[test]
    fn test_preview_stops_when_delay_settles() {
        let backoff = Backoff::new(ms(50), 2.0, ms(200)).unwrap();
        let preview = backoff.preview(u32::MAX as usize, 16);
        assert_eq!(preview.listed, vec![ms(50), ms(100), ms(200)]);
        assert!(preview.settled);
        assert_eq!(preview.remaining, u32::MAX as usize - 3);
        assert_eq!(
            preview.to_string(),
            format!("50ms, 100ms, 200ms, then {}x 200ms", u32::MAX as usize - 3)
        );
    }

    #[test]
    fn test_preview_immediate_retries() {
        let preview = Backoff::NONE.preview(usize::MAX, 16);
        assert_eq!(preview.listed, vec![Duration::ZERO]);
        assert_eq!(preview.remaining, usize::MAX - 1);
    }

    #[test]
    fn test_preview_truncates_long_growth() {
        let backoff = Backoff::new(ms(1), 1.5, Duration::MAX).unwrap();
        let preview = backoff.preview(1_000, 4);
        assert_eq!(preview.listed.len(), 4);
        assert!(!preview.settled);
        assert!(preview.to_string().ends_with(", ... 996 more"));
    }

    #[test]
    fn test_preview_short_schedule() {
        let backoff = Backoff::new(ms(50), 2.0, ms(200)).unwrap();
        let preview = backoff.preview(2, 16);
        assert_eq!(preview.to_string(), "50ms, 100ms");
        assert_eq!(backoff.preview(0, 16).to_string(), "");
    }

    proptest::proptest! {
        #[test]
        fn prop_next_never_exceeds_max(
            base_ms in 0u64..10_000,
            factor in 0.0f64..10.0,
            max_ms in 0u64..10_000,
        ) {
            let backoff = Backoff::new(ms(base_ms), factor, ms(max_ms)).unwrap();
            for delay in backoff.schedule(8).into_iter().skip(1) {
                proptest::prop_assert!(delay <= ms(max_ms));
            }
        }
    }
}
