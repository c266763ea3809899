// Control plane: admission control and circuit breakers
//
// Provides concurrency limiting and rate limiting for the HTTP API, and
// per-venue circuit breakers with sliding-window failure tracking.
//
// Numan Thabit 2025 Nov

use crate::config::BreakerPolicy;
use crate::venues::VenueId;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{AcquireError, Mutex, Semaphore};
use tracing::{debug, info};

#[derive(Clone)]
pub struct AdmissionControl {
    max_inflight: Arc<Semaphore>,
    // allow up to rate_per_sec within a 1s sliding window
    inner: Arc<Mutex<RateLimiter>>,
}

struct RateLimiter {
    rate_per_sec: u32,
    timestamps: VecDeque<Instant>,
    window: Duration,
}

impl AdmissionControl {
    pub fn new(max_inflight: usize, rate_per_sec: Option<u32>) -> Self {
        let rl = RateLimiter {
            rate_per_sec: rate_per_sec.unwrap_or(200).max(1),
            timestamps: VecDeque::with_capacity(256),
            window: Duration::from_secs(1),
        };
        Self {
            max_inflight: Arc::new(Semaphore::new(max_inflight.max(1))),
            inner: Arc::new(Mutex::new(rl)),
        }
    }

    /// Acquire an admission permit respecting max inflight and rate limit.
    pub async fn acquire(&self) -> Result<AdmissionPermit, AcquireError> {
        loop {
            let mut guard = self.inner.lock().await;
            let now = Instant::now();
            while let Some(front) = guard.timestamps.front() {
                if now.duration_since(*front) > guard.window {
                    guard.timestamps.pop_front();
                } else {
                    break;
                }
            }
            if (guard.timestamps.len() as u32) < guard.rate_per_sec {
                guard.timestamps.push_back(now);
                break;
            }
            drop(guard);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let permit = self.max_inflight.clone().acquire_owned().await?;
        Ok(AdmissionPermit { _permit: permit })
    }

    pub fn available(&self) -> usize {
        self.max_inflight.available_permits()
    }
}

pub struct AdmissionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

/// One breaker per venue. An open breaker short-circuits quotes to that venue.
#[derive(Clone)]
pub struct CircuitBreakers {
    policy: BreakerPolicy,
    inner: Arc<Mutex<HashMap<VenueId, Breaker>>>,
}

struct Breaker {
    window: VecDeque<bool>, // true=failure, false=success
    open_until: Option<Instant>,
}

impl Breaker {
    fn new(policy: &BreakerPolicy) -> Self {
        Self {
            window: VecDeque::with_capacity(policy.max_window),
            open_until: None,
        }
    }
}

impl CircuitBreakers {
    pub fn new(policy: BreakerPolicy) -> Self {
        Self {
            policy,
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn is_open(&self, venue: &VenueId) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(b) = inner.get_mut(venue) else {
            return false;
        };
        if let Some(until) = b.open_until {
            if Instant::now() < until {
                return true;
            }
            // half-open: the next outcome decides
            b.open_until = None;
            b.window.clear();
            info!(venue = %venue, "circuit closed after cooldown");
        }
        false
    }

    pub async fn record_success(&self, venue: &VenueId) {
        self.record(venue, false).await;
    }

    pub async fn record_failure(&self, venue: &VenueId) {
        self.record(venue, true).await;
    }

    async fn record(&self, venue: &VenueId, failure: bool) {
        let mut inner = self.inner.lock().await;
        let b = inner
            .entry(venue.clone())
            .or_insert_with(|| Breaker::new(&self.policy));
        if b.window.len() >= self.policy.max_window.max(1) {
            b.window.pop_front();
        }
        b.window.push_back(failure);

        let samples = b.window.len();
        if samples >= self.policy.min_samples {
            let fails = b.window.iter().filter(|x| **x).count();
            let rate = fails as f32 / samples as f32;
            if rate >= self.policy.failure_threshold && b.open_until.is_none() {
                b.open_until =
                    Some(Instant::now() + Duration::from_secs(self.policy.cooldown_secs));
                debug!(venue = %venue, rate = rate, samples = samples, "circuit opened");
            }
        }
    }

    /// Venues whose breaker is currently open.
    pub async fn open_venues(&self) -> Vec<VenueId> {
        let now = Instant::now();
        let inner = self.inner.lock().await;
        let mut open: Vec<VenueId> = inner
            .iter()
            .filter(|(_, b)| b.open_until.is_some_and(|until| now < until))
            .map(|(id, _)| id.clone())
            .collect();
        open.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(cooldown_secs: u64) -> BreakerPolicy {
        BreakerPolicy {
            max_window: 10,
            min_samples: 4,
            failure_threshold: 0.5,
            cooldown_secs,
        }
    }

    #[tokio::test]
    async fn opens_after_failure_rate_crosses_threshold() {
        let breakers = CircuitBreakers::new(policy(60));
        let venue = VenueId::new("flaky");
        for _ in 0..3 {
            breakers.record_failure(&venue).await;
        }
        assert!(!breakers.is_open(&venue).await);
        breakers.record_success(&venue).await;
        assert!(breakers.is_open(&venue).await);
        assert_eq!(breakers.open_venues().await, vec![venue.clone()]);

        let other = VenueId::new("steady");
        assert!(!breakers.is_open(&other).await);
    }

    #[tokio::test]
    async fn closes_after_cooldown() {
        let breakers = CircuitBreakers::new(policy(0));
        let venue = VenueId::new("flaky");
        for _ in 0..4 {
            breakers.record_failure(&venue).await;
        }
        assert!(!breakers.is_open(&venue).await);
        breakers.record_success(&venue).await;
        assert!(!breakers.is_open(&venue).await);
    }

    #[tokio::test]
    async fn admission_hands_out_permits() {
        let admission = AdmissionControl::new(2, Some(100));
        let first = admission.acquire().await.unwrap();
        let _second = admission.acquire().await.unwrap();
        assert_eq!(admission.available(), 0);
        drop(first);
        assert_eq!(admission.available(), 1);
    }
}
