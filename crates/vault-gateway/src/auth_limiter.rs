use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone)]
pub struct AuthLimiterConfig {
    pub max_failures: u32,
    pub window: Duration,
    pub block_duration: Duration,
}

impl Default for AuthLimiterConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            window: Duration::from_secs(60),
            block_duration: Duration::from_secs(300),
        }
    }
}

struct Entry {
    failures: Vec<Instant>,
    blocked_until: Option<Instant>,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            failures: Vec::new(),
            blocked_until: None,
        }
    }
}

/// Per-(client IP, collection) brute-force limiter, structured like a sharded
/// rate-limit map but tracking failure timestamps in a sliding window rather
/// than a token bucket, since the thing being throttled is repeated wrong
/// credentials, not request volume.
pub struct AuthLimiter {
    config: AuthLimiterConfig,
    entries: DashMap<(IpAddr, String), Entry>,
}

impl AuthLimiter {
    pub fn new(config: AuthLimiterConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
        }
    }

    /// Returns `Some(remaining)` if the caller is currently blocked.
    pub fn check_blocked(&self, ip: IpAddr, collection: &str) -> Option<Duration> {
        let key = (ip, collection.to_string());
        let entry = self.entries.get(&key)?;
        let blocked_until = entry.blocked_until?;
        let now = Instant::now();
        if now < blocked_until {
            Some(blocked_until - now)
        } else {
            None
        }
    }

    /// Records a failed verification; returns the remaining block duration if
    /// this failure just tripped the limiter.
    pub fn record_failure(&self, ip: IpAddr, collection: &str) -> Option<Duration> {
        let key = (ip, collection.to_string());
        let mut entry = self.entries.entry(key).or_default();
        let now = Instant::now();
        entry.failures.retain(|&t| now.duration_since(t) < self.config.window);
        entry.failures.push(now);
        if entry.failures.len() as u32 >= self.config.max_failures {
            let until = now + self.config.block_duration;
            entry.blocked_until = Some(until);
            return Some(self.config.block_duration);
        }
        None
    }

    pub fn record_success(&self, ip: IpAddr, collection: &str) {
        self.entries.remove(&(ip, collection.to_string()));
    }

    /// Drops entries with no recent failures and no active block, so the map
    /// doesn't grow unbounded under a scanning attacker rotating source IPs.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| {
            let blocked = entry.blocked_until.map(|b| now < b).unwrap_or(false);
            let recent_failure = entry
                .failures
                .last()
                .map(|&t| now.duration_since(t) < self.config.window)
                .unwrap_or(false);
            blocked || recent_failure
        });
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

/// Periodically sweeps stale entries out of the limiter. Mirrors the
/// teacher's rate-limit cleanup task.
pub async fn cleanup_task(limiter: std::sync::Arc<AuthLimiter>, interval: Duration, shutdown: tokio_util::sync::CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => limiter.cleanup(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_threshold_failures() {
        let limiter = AuthLimiter::new(AuthLimiterConfig {
            max_failures: 3,
            window: Duration::from_secs(60),
            block_duration: Duration::from_secs(300),
        });
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        assert!(limiter.record_failure(ip, "alpha").is_none());
        assert!(limiter.record_failure(ip, "alpha").is_none());
        assert!(limiter.record_failure(ip, "alpha").is_some());
        assert!(limiter.check_blocked(ip, "alpha").is_some());
    }

    #[test]
    fn success_clears_failure_history() {
        let limiter = AuthLimiter::new(AuthLimiterConfig::default());
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        limiter.record_failure(ip, "alpha");
        limiter.record_success(ip, "alpha");
        assert!(limiter.check_blocked(ip, "alpha").is_none());
        assert_eq!(limiter.entry_count(), 0);
    }

    #[test]
    fn distinct_collections_are_independent() {
        let limiter = AuthLimiter::new(AuthLimiterConfig {
            max_failures: 1,
            window: Duration::from_secs(60),
            block_duration: Duration::from_secs(300),
        });
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        limiter.record_failure(ip, "alpha");
        assert!(limiter.check_blocked(ip, "alpha").is_some());
        assert!(limiter.check_blocked(ip, "beta").is_none());
    }
}
