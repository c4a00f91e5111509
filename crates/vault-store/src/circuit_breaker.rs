use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use vault_types::VaultError;

/// The three states of the breaker, in the usual CLOSED → OPEN → HALF_OPEN cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub cooldown: Duration,
    pub enabled: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            cooldown: Duration::from_secs(30),
            enabled: true,
        }
    }
}

struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
}

/// Failure-isolating wrapper around the object store's mutating calls.
///
/// One instance guards the whole store (there is exactly one object store in
/// this system, unlike the per-RPC-subsystem breaker this is grounded on), so
/// state lives behind a single mutex rather than a map.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
    half_open_successes: AtomicU32,
    total_requests: AtomicU64,
    total_failures: AtomicU64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CircuitStats {
    pub state: CircuitState,
    pub failure_count: u32,
    pub total_requests: u64,
    pub total_failures: u64,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                opened_at: None,
            }),
            half_open_successes: AtomicU32::new(0),
            total_requests: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
        }
    }

    /// Checks whether a call may proceed, lazily transitioning OPEN → HALF_OPEN
    /// once the cooldown has elapsed. Returns the remaining cooldown if the
    /// call must be rejected.
    fn admit(&self) -> Result<(), Duration> {
        if !self.config.enabled {
            return Ok(());
        }
        let mut guard = self.state.lock();
        match guard.state {
            CircuitState::Closed => Ok(()),
            CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let opened_at = guard.opened_at.unwrap_or_else(Instant::now);
                let elapsed = opened_at.elapsed();
                if elapsed >= self.config.cooldown {
                    guard.state = CircuitState::HalfOpen;
                    self.half_open_successes.store(0, Ordering::SeqCst);
                    Ok(())
                } else {
                    Err(self.config.cooldown - elapsed)
                }
            }
        }
    }

    fn record_success(&self) {
        if !self.config.enabled {
            return;
        }
        let mut guard = self.state.lock();
        match guard.state {
            CircuitState::Closed => {
                guard.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                let successes = self.half_open_successes.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.config.success_threshold {
                    guard.state = CircuitState::Closed;
                    guard.failure_count = 0;
                    guard.opened_at = None;
                }
            }
            CircuitState::Open => {}
        }
    }

    fn record_failure(&self) {
        self.total_failures.fetch_add(1, Ordering::Relaxed);
        if !self.config.enabled {
            return;
        }
        let mut guard = self.state.lock();
        match guard.state {
            CircuitState::Closed => {
                guard.failure_count += 1;
                if guard.failure_count >= self.config.failure_threshold {
                    guard.state = CircuitState::Open;
                    guard.opened_at = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                guard.state = CircuitState::Open;
                guard.opened_at = Some(Instant::now());
                guard.failure_count = self.config.failure_threshold;
            }
            CircuitState::Open => {}
        }
    }

    /// Run `f` through the breaker: rejects fast while open, otherwise records
    /// the outcome. A rejection is a distinct error, never counted as a store failure.
    pub async fn call<F, Fut, T>(&self, f: F) -> Result<T, VaultError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, VaultError>>,
    {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if let Err(time_remaining) = self.admit() {
            return Err(VaultError::CircuitOpen { time_remaining });
        }
        match f().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(err)
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state.lock().state
    }

    pub fn stats(&self) -> CircuitStats {
        let guard = self.state.lock();
        CircuitStats {
            state: guard.state,
            failure_count: guard.failure_count,
            total_requests: self.total_requests.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        let mut guard = self.state.lock();
        guard.state = CircuitState::Closed;
        guard.failure_count = 0;
        guard.opened_at = None;
        self.half_open_successes.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failure_threshold: u32, success_threshold: u32, cooldown: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold,
            success_threshold,
            cooldown,
            enabled: true,
        })
    }

    async fn ok() -> Result<(), VaultError> {
        Ok(())
    }
    async fn fail() -> Result<(), VaultError> {
        Err(VaultError::StoreFailure("boom".into()))
    }

    #[tokio::test]
    async fn trips_after_threshold_failures() {
        let cb = breaker(3, 2, Duration::from_millis(50));
        for _ in 0..3 {
            let _ = cb.call(fail).await;
        }
        assert_eq!(cb.state(), CircuitState::Open);
        let result = cb.call(ok).await;
        assert!(matches!(result, Err(VaultError::CircuitOpen { .. })));
    }

    #[tokio::test]
    async fn half_opens_after_cooldown_and_closes_after_successes() {
        let cb = breaker(2, 2, Duration::from_millis(20));
        let _ = cb.call(fail).await;
        let _ = cb.call(fail).await;
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(30)).await;
        cb.call(ok).await.unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.call(ok).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_reopens_immediately() {
        let cb = breaker(1, 2, Duration::from_millis(10));
        let _ = cb.call(fail).await;
        tokio::time::sleep(Duration::from_millis(15)).await;
        let _ = cb.call(fail).await;
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn disabled_breaker_never_rejects() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            enabled: false,
            ..CircuitBreakerConfig::default()
        });
        for _ in 0..50 {
            let _ = cb.call(fail).await;
        }
        assert!(cb.call(ok).await.is_ok());
    }

    #[tokio::test]
    async fn reset_restores_closed_state() {
        let cb = breaker(1, 1, Duration::from_secs(30));
        let _ = cb.call(fail).await;
        assert_eq!(cb.state(), CircuitState::Open);
        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
