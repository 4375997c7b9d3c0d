//! Time sources for the limiter.
//!
//! The store never reads the system clock directly; it asks a [`Clock`].
//! `MockClock` (test builds and the `test-helpers` feature) lets tests move
//! time forward without sleeping.

use std::fmt::Debug;
use std::time::Instant;

#[cfg(any(test, feature = "test-helpers"))]
use parking_lot::Mutex;
#[cfg(any(test, feature = "test-helpers"))]
use std::sync::Arc;
#[cfg(any(test, feature = "test-helpers"))]
use std::time::Duration;

/// Source of the current instant.
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// System clock implementation using `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-stepped time source for exercising window rollover and expiry.
///
/// Every clone reads and moves the same instant.
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<Instant>>,
}

#[cfg(any(test, feature = "test-helpers"))]
impl MockClock {
    pub fn new(start: Instant) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Move time forward by `step`.
    pub fn advance(&self, step: Duration) {
        *self.current.lock() += step;
    }

    /// Jump straight to `instant`, which may be earlier than the current time.
    pub fn set(&self, instant: Instant) {
        *self.current.lock() = instant;
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Default for MockClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }
}
