//! Rate limiter trait consumed by request handlers.

use super::decision::Decision;
use super::policy::Policy;
use crate::error::Result;

/// Trait for rate limiter implementations.
///
/// Handlers hold a `dyn RateLimiterBackend` so they can be exercised against
/// an isolated store in tests.
pub trait RateLimiterBackend: Send + Sync {
    /// Count one attempt for `identifier` under `policy` and decide on it.
    fn check(&self, identifier: &str, policy: &Policy) -> Result<Decision>;

    /// Forget everything recorded for `identifier`.
    fn reset(&self, identifier: &str) -> bool;
}
