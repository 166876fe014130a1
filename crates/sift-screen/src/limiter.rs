//! Per-tier rolling-window rate limiting for oracle calls.
//!
//! Each tier admits at most `max_calls` calls in any `window`. A caller that
//! would exceed the budget waits until the oldest call in the window ages
//! out. Every wait is reported to a [`RateLimitObserver`], so operators can
//! see throttling instead of a silently slow run.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use sift_config::{TierBudget, validate_rate_limits};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::ScreeningError;

/// Emitted whenever a call had to wait for budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitWait {
    pub tier: String,
    pub waited: Duration,
    pub budget: TierBudget,
}

pub trait RateLimitObserver: Send + Sync {
    fn on_wait(&self, event: &RateLimitWait);
}

/// Default observer: logs each wait at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RateLimitObserver for TracingObserver {
    fn on_wait(&self, event: &RateLimitWait) {
        tracing::info!(
            tier = %event.tier,
            waited_ms = u64::try_from(event.waited.as_millis()).unwrap_or(u64::MAX),
            max_calls = event.budget.max_calls,
            window_secs = event.budget.window_secs,
            "rate limit: waited for budget"
        );
    }
}

/// Cumulative throttling counters for one tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierStats {
    pub calls: u64,
    pub waits: u64,
    pub waited_ms: u64,
}

struct TierState {
    budget: TierBudget,
    admitted: Mutex<VecDeque<Instant>>,
    calls: AtomicU64,
    waits: AtomicU64,
    waited_ms: AtomicU64,
}

pub struct RateLimiter {
    tiers: HashMap<String, TierState>,
    observer: Arc<dyn RateLimitObserver>,
}

impl RateLimiter {
    /// # Errors
    ///
    /// Returns `ScreeningError::Config` if any tier has a zero call budget or
    /// a zero-length window.
    pub fn new(budgets: &BTreeMap<String, TierBudget>) -> Result<Self, ScreeningError> {
        validate_rate_limits(budgets)?;
        let tiers = budgets
            .iter()
            .map(|(name, budget)| {
                (
                    name.clone(),
                    TierState {
                        budget: *budget,
                        admitted: Mutex::new(VecDeque::new()),
                        calls: AtomicU64::new(0),
                        waits: AtomicU64::new(0),
                        waited_ms: AtomicU64::new(0),
                    },
                )
            })
            .collect();
        Ok(Self { tiers, observer: Arc::new(TracingObserver) })
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RateLimitObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn has_tier(&self, tier: &str) -> bool {
        self.tiers.contains_key(tier)
    }

    /// Wait until `tier` has budget, then record a call. Returns the time spent waiting.
    ///
    /// # Errors
    ///
    /// Returns `ScreeningError::UnknownTier` if `tier` has no configured budget.
    pub async fn acquire(&self, tier: &str) -> Result<Duration, ScreeningError> {
        let state = self
            .tiers
            .get(tier)
            .ok_or_else(|| ScreeningError::UnknownTier(tier.to_string()))?;
        let window = state.budget.window();
        let started = Instant::now();

        loop {
            let wake_at = {
                let mut admitted = state.admitted.lock().await;
                let now = Instant::now();
                while admitted.front().is_some_and(|t| now.duration_since(*t) >= window) {
                    admitted.pop_front();
                }
                if admitted.len() < state.budget.max_calls as usize {
                    admitted.push_back(now);
                    None
                } else {
                    admitted.front().map(|oldest| *oldest + window)
                }
            };

            match wake_at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => break,
            }
        }

        let waited = started.elapsed();
        state.calls.fetch_add(1, Ordering::Relaxed);
        if !waited.is_zero() {
            state.waits.fetch_add(1, Ordering::Relaxed);
            state.waited_ms.fetch_add(
                u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                Ordering::Relaxed,
            );
            self.observer.on_wait(&RateLimitWait {
                tier: tier.to_string(),
                waited,
                budget: state.budget,
            });
        }
        Ok(waited)
    }

    #[must_use]
    pub fn stats(&self, tier: &str) -> Option<TierStats> {
        self.tiers.get(tier).map(|s| TierStats {
            calls: s.calls.load(Ordering::Relaxed),
            waits: s.waits.load(Ordering::Relaxed),
            waited_ms: s.waited_ms.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Recorder(StdMutex<Vec<RateLimitWait>>);

    impl RateLimitObserver for Recorder {
        fn on_wait(&self, event: &RateLimitWait) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    fn limiter(max_calls: u32, window_secs: u64) -> (RateLimiter, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let budgets = BTreeMap::from([("fast".to_string(), TierBudget { max_calls, window_secs })]);
        let limiter = RateLimiter::new(&budgets).unwrap().with_observer(recorder.clone());
        (limiter, recorder)
    }

    #[tokio::test(start_paused = true)]
    async fn calls_within_budget_do_not_wait() {
        let (limiter, recorder) = limiter(3, 60);
        for _ in 0..3 {
            assert_eq!(limiter.acquire("fast").await.unwrap(), Duration::ZERO);
        }
        assert!(recorder.0.lock().unwrap().is_empty());
        assert_eq!(limiter.stats("fast").unwrap().calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exceeding_budget_waits_for_the_window_and_reports_it() {
        let (limiter, recorder) = limiter(2, 10);
        limiter.acquire("fast").await.unwrap();
        limiter.acquire("fast").await.unwrap();

        let waited = limiter.acquire("fast").await.unwrap();
        assert!(waited >= Duration::from_secs(10));

        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tier, "fast");
        assert!(events[0].waited >= Duration::from_secs(10));

        let stats = limiter.stats("fast").unwrap();
        assert_eq!(stats.calls, 3);
        assert_eq!(stats.waits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn budget_recovers_after_the_window() {
        let (limiter, recorder) = limiter(1, 5);
        limiter.acquire("fast").await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(limiter.acquire("fast").await.unwrap(), Duration::ZERO);
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_tier_is_an_error() {
        let (limiter, _) = limiter(1, 5);
        assert!(matches!(
            limiter.acquire("premium").await,
            Err(ScreeningError::UnknownTier(t)) if t == "premium"
        ));
        assert!(limiter.stats("premium").is_none());
    }

    #[rstest]
    #[case::no_calls(0, 60)]
    #[case::no_window(5, 0)]
    fn zero_budgets_are_rejected(#[case] max_calls: u32, #[case] window_secs: u64) {
        let budgets = BTreeMap::from([("fast".to_string(), TierBudget { max_calls, window_secs })]);
        assert!(matches!(RateLimiter::new(&budgets), Err(ScreeningError::Config(_))));
    }
}
