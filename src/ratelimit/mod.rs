//! Rate limiting logic and state management.

mod backend;
mod clock;
mod decision;
mod entry;
mod policy;
mod store;
mod sweeper;

pub use backend::RateLimiterBackend;
pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-helpers"))]
pub use clock::MockClock;
pub use decision::{
    Decision, RateLimitHeaders, HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET,
    HEADER_RETRY_AFTER,
};
pub use entry::Entry;
pub use policy::{
    preset_rules, Policy, PolicyRule, PolicySet, TimeUnit, API, LOGIN, MAX_WINDOW, REGISTRATION,
};
pub use store::LimiterStore;
pub use sweeper::{SweepHandle, DEFAULT_SWEEP_INTERVAL};
