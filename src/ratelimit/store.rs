//! The limiter store: per-identifier fixed-window counters.

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

use super::backend::RateLimiterBackend;
use super::clock::{Clock, SystemClock};
use super::decision::Decision;
use super::entry::Entry;
use super::policy::Policy;
use crate::error::{LimiterError, Result};

/// Process-wide mapping from identifier to its window counter.
///
/// Counters are sharded, so checks for different identifiers rarely contend.
/// A check holds its identifier's shard lock for the whole read-modify-write,
/// which serialises concurrent checks on the same identifier.
#[derive(Debug)]
pub struct LimiterStore {
    /// Window counters indexed by identifier
    entries: DashMap<String, Entry>,
    /// Source of "now" for `check` and `sweep_expired`
    clock: Arc<dyn Clock>,
}

/// What a check did to the entry, reported once the shard lock is released.
enum Outcome {
    Opened,
    Counted(u64),
}

impl LimiterStore {
    /// Create an empty store reading the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    /// Create an empty store with an injected time source.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// The store's time source.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Count one attempt for `identifier` and decide whether it may proceed.
    pub fn check(&self, identifier: &str, policy: &Policy) -> Result<Decision> {
        self.check_at(identifier, policy, self.clock.now())
    }

    /// [`check`](Self::check) at an explicit instant.
    ///
    /// Within a window every call counts, including rejected ones, so once an
    /// identifier is over its limit it stays denied until the window ends.
    pub fn check_at(&self, identifier: &str, policy: &Policy, now: Instant) -> Result<Decision> {
        if identifier.trim().is_empty() {
            return Err(LimiterError::EmptyIdentifier);
        }

        let limit = policy.max_requests();
        let fresh = Entry::open(now, policy.window())?;

        let (outcome, reset_in) = match self.entries.entry(identifier.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.is_active(now) {
                    let count = entry.increment();
                    (Outcome::Counted(count), entry.reset_in(now))
                } else {
                    *entry = fresh;
                    (Outcome::Opened, policy.window())
                }
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(fresh);
                (Outcome::Opened, policy.window())
            }
        };

        let decision = match outcome {
            Outcome::Opened => {
                debug!(
                    identifier = %identifier,
                    limit = limit,
                    window = ?policy.window(),
                    "Opened new rate limit window"
                );
                Decision {
                    allowed: true,
                    remaining: limit - 1,
                    reset_in,
                    limit,
                }
            }
            Outcome::Counted(count) if count > limit => {
                debug!(
                    identifier = %identifier,
                    count = count,
                    limit = limit,
                    "Rate limit exceeded"
                );
                Decision {
                    allowed: false,
                    remaining: 0,
                    reset_in,
                    limit,
                }
            }
            Outcome::Counted(count) => Decision {
                allowed: true,
                remaining: limit.saturating_sub(count),
                reset_in,
                limit,
            },
        };

        trace!(
            identifier = %identifier,
            allowed = decision.allowed,
            remaining = decision.remaining,
            "Checked rate limit"
        );

        Ok(decision)
    }

    /// Remove every entry whose window ended before `now`.
    ///
    /// Returns the number of entries removed. Entries whose window is still
    /// running are never touched.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            if entry.is_expired(now) {
                removed += 1;
                false
            } else {
                true
            }
        });

        debug!(removed = removed, remaining = self.entries.len(), "Swept expired entries");
        removed
    }

    /// [`sweep`](Self::sweep) at the clock's current time.
    pub fn sweep_expired(&self) -> usize {
        self.sweep(self.clock.now())
    }

    /// Forget `identifier`. Returns whether it had an entry.
    pub fn reset(&self, identifier: &str) -> bool {
        self.entries.remove(identifier).is_some()
    }

    /// Current count for `identifier`, if it has an entry.
    ///
    /// The entry may belong to a window that has already ended.
    pub fn count_for(&self, identifier: &str) -> Option<u64> {
        self.entries.get(identifier).map(|e| e.count())
    }

    /// Copy of the entry for `identifier`.
    pub fn entry_snapshot(&self, identifier: &str) -> Option<Entry> {
        self.entries.get(identifier).map(|e| *e)
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Get the number of tracked identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LimiterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterBackend for LimiterStore {
    fn check(&self, identifier: &str, policy: &Policy) -> Result<Decision> {
        LimiterStore::check(self, identifier, policy)
    }

    fn reset(&self, identifier: &str) -> bool {
        LimiterStore::reset(self, identifier)
    }
}
