//! Per-identifier window counter.

use std::time::{Duration, Instant};

use crate::error::{LimiterError, Result};

/// Request count for one identifier within its current window.
///
/// The count is only ever incremented while the window is active; once
/// `window_end` has passed the entry is replaced rather than incremented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// Attempts observed in this window, admitted and rejected alike
    count: u64,
    /// When the current window expires
    window_end: Instant,
}

impl Entry {
    /// Start a new window at `now` with the first attempt already counted.
    ///
    /// Fails if the window end is not representable as an `Instant`.
    pub fn open(now: Instant, window: Duration) -> Result<Self> {
        let window_end = now.checked_add(window).ok_or_else(|| {
            LimiterError::InvalidPolicy(format!("window {:?} overflows the clock", window))
        })?;
        Ok(Self {
            count: 1,
            window_end,
        })
    }

    /// Whether the window is still running at `now`.
    pub fn is_active(&self, now: Instant) -> bool {
        now < self.window_end
    }

    /// Whether a sweep at `now` may remove this entry.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.window_end < now
    }

    /// Record one more attempt and return the new count.
    pub fn increment(&mut self) -> u64 {
        self.count = self.count.saturating_add(1);
        self.count
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn window_end(&self) -> Instant {
        self.window_end
    }

    /// Time left in the window, zero once it has ended.
    pub fn reset_in(&self, now: Instant) -> Duration {
        self.window_end.saturating_duration_since(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_counts_first_attempt() {
        let now = Instant::now();
        let entry = Entry::open(now, Duration::from_secs(60)).unwrap();

        assert_eq!(entry.count(), 1);
        assert_eq!(entry.window_end(), now + Duration::from_secs(60));
        assert_eq!(entry.reset_in(now), Duration::from_secs(60));
    }

    #[test]
    fn test_window_boundary() {
        let now = Instant::now();
        let entry = Entry::open(now, Duration::from_secs(10)).unwrap();
        let end = now + Duration::from_secs(10);

        assert!(entry.is_active(end - Duration::from_millis(1)));
        // At exactly window_end the window is over but not yet sweepable.
        assert!(!entry.is_active(end));
        assert!(!entry.is_expired(end));
        assert!(entry.is_expired(end + Duration::from_millis(1)));
    }

    #[test]
    fn test_increment() {
        let mut entry = Entry::open(Instant::now(), Duration::from_secs(1)).unwrap();
        assert_eq!(entry.increment(), 2);
        assert_eq!(entry.increment(), 3);
        assert_eq!(entry.count(), 3);
    }

    #[test]
    fn test_reset_in_saturates() {
        let now = Instant::now();
        let entry = Entry::open(now, Duration::from_secs(1)).unwrap();
        assert_eq!(entry.reset_in(now + Duration::from_secs(5)), Duration::ZERO);
    }

    #[test]
    fn test_open_rejects_unrepresentable_window_end() {
        let result = Entry::open(Instant::now(), Duration::MAX);
        assert!(matches!(result, Err(LimiterError::InvalidPolicy(_))));
    }
}
