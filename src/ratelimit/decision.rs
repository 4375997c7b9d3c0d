//! Check outcomes and their transport projection.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the action may proceed
    pub allowed: bool,
    /// Admissions left in the current window, never negative
    pub remaining: u64,
    /// Time until the current window ends
    pub reset_in: Duration,
    /// The policy ceiling this decision was made against
    pub limit: u64,
}

impl Decision {
    pub fn is_denied(&self) -> bool {
        !self.allowed
    }

    /// Metadata for attaching to a response.
    pub fn headers(&self) -> RateLimitHeaders {
        RateLimitHeaders::from(self)
    }
}

pub const HEADER_LIMIT: &str = "X-RateLimit-Limit";
pub const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
pub const HEADER_RESET: &str = "X-RateLimit-Reset";
pub const HEADER_RETRY_AFTER: &str = "Retry-After";

/// Named values derived from a [`Decision`].
///
/// `reset_secs` rounds up, so a client that waits that long always lands in
/// a fresh window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitHeaders {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    pub reset_secs: u64,
}

impl RateLimitHeaders {
    /// Header name/value pairs. `Retry-After` is only present on denials.
    pub fn header_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            (HEADER_LIMIT, self.limit.to_string()),
            (HEADER_REMAINING, self.remaining.to_string()),
            (HEADER_RESET, self.reset_secs.to_string()),
        ];
        if !self.allowed {
            pairs.push((HEADER_RETRY_AFTER, self.reset_secs.to_string()));
        }
        pairs
    }
}

impl From<&Decision> for RateLimitHeaders {
    fn from(decision: &Decision) -> Self {
        Self {
            allowed: decision.allowed,
            limit: decision.limit,
            remaining: decision.remaining,
            reset_secs: ceil_secs(decision.reset_in),
        }
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(allowed: bool, remaining: u64, reset_in: Duration) -> Decision {
        Decision {
            allowed,
            remaining,
            reset_in,
            limit: 5,
        }
    }

    #[test]
    fn test_reset_rounds_up() {
        let headers = decision(true, 3, Duration::from_millis(12_001)).headers();
        assert_eq!(headers.reset_secs, 13);

        let headers = decision(true, 3, Duration::from_secs(60)).headers();
        assert_eq!(headers.reset_secs, 60);

        let headers = decision(true, 3, Duration::ZERO).headers();
        assert_eq!(headers.reset_secs, 0);
    }

    #[test]
    fn test_reset_saturates_at_max_duration() {
        let headers = decision(false, 0, Duration::MAX).headers();
        assert_eq!(headers.reset_secs, u64::MAX);
    }

    #[test]
    fn test_allowed_pairs_omit_retry_after() {
        let pairs = decision(true, 4, Duration::from_secs(60))
            .headers()
            .header_pairs();

        assert_eq!(
            pairs,
            vec![
                (HEADER_LIMIT, "5".to_string()),
                (HEADER_REMAINING, "4".to_string()),
                (HEADER_RESET, "60".to_string()),
            ]
        );
    }

    #[test]
    fn test_denied_pairs_include_retry_after() {
        let denied = decision(false, 0, Duration::from_millis(29_500));
        assert!(denied.is_denied());

        let pairs = denied.headers().header_pairs();
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[3], (HEADER_RETRY_AFTER, "30".to_string()));
    }

    #[test]
    fn test_headers_serialize() {
        let headers = decision(false, 0, Duration::from_secs(7)).headers();
        let json = serde_json::to_value(headers).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "allowed": false,
                "limit": 5,
                "remaining": 0,
                "reset_secs": 7
            })
        );
    }
}
