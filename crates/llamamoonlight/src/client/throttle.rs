//! Per-domain request spacing

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::config::MAX_DOMAIN_INTERVAL_MS;

/// Keeps consecutive requests to one domain at least `min_interval` apart
///
/// Slots are reserved under the lock, so concurrent callers queue up behind
/// each other instead of all firing once the interval elapses.
#[derive(Debug)]
pub struct DomainThrottle {
    min_interval: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl DomainThrottle {
    /// Throttle spacing requests per domain by `min_interval`; zero disables it
    ///
    /// Intervals above one day are clamped to one day.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval: min_interval.min(Duration::from_millis(MAX_DOMAIN_INTERVAL_MS)),
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Configured spacing
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Domains with a reservation still in the future
    pub async fn tracked_domains(&self) -> usize {
        self.next_slot.lock().await.len()
    }

    /// Wait until a request to `domain` may be sent
    pub async fn wait(&self, domain: &str) {
        if self.min_interval.is_zero() {
            return;
        }

        let slot = {
            let mut slots = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = slots
                .get(domain)
                .copied()
                .filter(|t| *t > now)
                .unwrap_or(now);
            // drop reservations that have already passed
            slots.retain(|_, t| *t > now);
            let next = slot.checked_add(self.min_interval).unwrap_or(slot);
            slots.insert(domain.to_string(), next);
            slot
        };

        let now = Instant::now();
        if slot > now {
            debug!("Throttling {} for {:?}", domain, slot - now);
            tokio::time::sleep_until(slot).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_interval_never_waits() {
        let throttle = DomainThrottle::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..10 {
            throttle.wait("example.com").await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_spacing_per_domain() {
        let throttle = DomainThrottle::new(Duration::from_millis(60));
        let start = Instant::now();
        throttle.wait("a.example.com").await;
        throttle.wait("b.example.com").await;
        assert!(start.elapsed() < Duration::from_millis(60));

        throttle.wait("a.example.com").await;
        throttle.wait("a.example.com").await;
        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn test_expired_slots_are_pruned() {
        let throttle = DomainThrottle::new(Duration::from_millis(20));
        for domain in ["a.example.com", "b.example.com", "c.example.com"] {
            throttle.wait(domain).await;
        }
        assert_eq!(throttle.tracked_domains().await, 3);

        tokio::time::sleep(Duration::from_millis(40)).await;
        throttle.wait("d.example.com").await;
        assert_eq!(throttle.tracked_domains().await, 1);
    }

    #[tokio::test]
    async fn test_huge_interval_is_clamped() {
        let throttle = DomainThrottle::new(Duration::MAX);
        assert_eq!(
            throttle.min_interval(),
            Duration::from_millis(MAX_DOMAIN_INTERVAL_MS)
        );
        // first request to a domain never waits
        throttle.wait("example.com").await;
        assert_eq!(throttle.tracked_domains().await, 1);
    }
}
