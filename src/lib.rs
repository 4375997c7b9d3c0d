//! Ember Limiter - in-memory request limiting
//!
//! This crate throttles actions per client identifier using fixed windows.
//! Counters live in a single process; a background sweep reclaims entries
//! whose window has expired. Nothing is persisted across restarts.

pub mod config;
pub mod error;
pub mod ratelimit;

pub use error::{LimiterError, Result};
pub use ratelimit::{
    Clock, Decision, LimiterStore, Policy, PolicySet, RateLimitHeaders, RateLimiterBackend,
    SweepHandle, SystemClock,
};
#[cfg(any(test, feature = "test-helpers"))]
pub use ratelimit::MockClock;
