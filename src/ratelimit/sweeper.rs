//! Background reclamation of expired entries.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::store::LimiterStore;
use crate::error::{LimiterError, Result};

/// Default time between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Handle to a running sweep task.
///
/// Dropping the handle also stops the task; [`stop`](Self::stop) additionally
/// waits for it to finish.
#[derive(Debug)]
pub struct SweepHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SweepHandle {
    /// Stop scheduling sweeps and wait for the task to exit.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Sweep task ended abnormally");
            }
        }
    }

    /// Whether the task has exited, either by shutdown or because the store is gone.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

impl LimiterStore {
    /// Spawn a task that sweeps this store every `period`.
    ///
    /// The task only holds a weak reference, so it also exits once the last
    /// `Arc` to the store is dropped. Must be called within a tokio runtime.
    pub fn start_sweeper(self: &Arc<Self>, period: Duration) -> Result<SweepHandle> {
        if period.is_zero() {
            return Err(LimiterError::Config(
                "sweep interval must be greater than 0".to_string(),
            ));
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(Arc::downgrade(self), period, shutdown_rx));

        info!(interval = ?period, "Started rate limit sweeper");

        Ok(SweepHandle {
            shutdown,
            task: Some(task),
        })
    }
}

async fn run(store: Weak<LimiterStore>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            // Shutdown wins over a tick that is due at the same time.
            biased;

            changed = shutdown.changed() => {
                // A closed channel means the handle is gone.
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let Some(store) = store.upgrade() else {
                    debug!("Store dropped, sweeper exiting");
                    break;
                };
                store.sweep_expired();
            }
        }
    }

    info!("Rate limit sweeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::MockClock;
    use crate::ratelimit::policy::Policy;

    fn expired_store() -> (Arc<LimiterStore>, MockClock, Policy) {
        let clock = MockClock::default();
        let store = Arc::new(LimiterStore::with_clock(Arc::new(clock.clone())));
        let policy = Policy::new(5, Duration::from_secs(10)).unwrap();
        (store, clock, policy)
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let store = Arc::new(LimiterStore::new());
        let result = store.start_sweeper(Duration::ZERO);
        assert!(matches!(result, Err(LimiterError::Config(_))));
    }

    /// Move paused tokio time past `span` and let the sweep task run.
    async fn elapse(span: Duration) {
        tokio::time::advance(span).await;
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_expired_entries() {
        let (store, clock, policy) = expired_store();

        store.check("stale", &policy).unwrap();
        clock.advance(Duration::from_secs(11));
        store.check("fresh", &policy).unwrap();

        let handle = store.start_sweeper(Duration::from_secs(300)).unwrap();

        // Nothing runs before the first full interval.
        elapse(Duration::from_secs(299)).await;
        assert_eq!(store.len(), 2);

        elapse(Duration::from_secs(1)).await;
        assert_eq!(store.count_for("stale"), None);
        assert_eq!(store.count_for("fresh"), Some(1));

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_keeps_sweeping_each_interval() {
        let (store, clock, policy) = expired_store();
        let handle = store.start_sweeper(Duration::from_secs(60)).unwrap();

        for round in 0..3 {
            let id = format!("client-{}", round);
            store.check(&id, &policy).unwrap();
            clock.advance(Duration::from_secs(11));

            elapse(Duration::from_secs(60)).await;
            assert!(store.is_empty(), "round {} left entries behind", round);
        }

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_sweeping() {
        let (store, clock, policy) = expired_store();

        let handle = store.start_sweeper(Duration::from_secs(60)).unwrap();
        handle.stop().await;

        store.check("stale", &policy).unwrap();
        clock.advance(Duration::from_secs(11));
        elapse(Duration::from_secs(600)).await;

        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_task() {
        let (store, clock, policy) = expired_store();

        let handle = store.start_sweeper(Duration::from_secs(60)).unwrap();
        drop(handle);

        store.check("stale", &policy).unwrap();
        clock.advance(Duration::from_secs(11));
        elapse(Duration::from_secs(600)).await;

        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_exits_when_store_dropped() {
        let (store, _clock, _policy) = expired_store();

        let handle = store.start_sweeper(Duration::from_secs(60)).unwrap();
        drop(store);

        elapse(Duration::from_secs(60)).await;
        assert!(handle.is_finished());
    }
}
