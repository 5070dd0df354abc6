//! Per-host politeness gate: no two requests to one origin start within
//! `polite_delay` of each other.
//!
//! Grounded on the shape of the teacher's `domain_limiter::DomainLimiter`
//! (per-host `DashMap` of synchronization primitives), adapted to guard a
//! last-request timestamp with a minimum-delay wait instead of a semaphore
//! permit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;

pub struct PolitenessGate {
    last_request: DashMap<String, Arc<Mutex<Instant>>>,
    min_delay: Duration,
}

impl PolitenessGate {
    #[must_use]
    pub fn new(min_delay: Duration) -> Self {
        Self {
            last_request: DashMap::new(),
            min_delay,
        }
    }

    /// Block until `min_delay` has elapsed since the last request to
    /// `origin` began, then record this request's start time.
    pub async fn wait_turn(&self, origin: &str) {
        let slot = self
            .last_request
            .entry(origin.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Instant::now() - self.min_delay)))
            .clone();

        let mut last = slot.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.min_delay {
            tokio::time::sleep(self.min_delay - elapsed).await;
        }
        *last = Instant::now();
    }
}
