//! Provider health tracking
//!
//! Process-wide rolling rate windows and circuit breakers, one entry per
//! provider id, created lazily on first use. All access to a provider's
//! counters goes through a single mutex.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Length of the rolling request window
pub const RATE_WINDOW: Duration = Duration::from_secs(60);
/// Share of the per-minute limit the orchestrator will use
pub const RATE_UTILIZATION: f64 = 0.9;
/// Circuit cooldown after a rate-limit failure
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(120);
/// Circuit cooldown after repeated ordinary failures
pub const FAILURE_COOLDOWN: Duration = Duration::from_secs(60);
/// Consecutive failures that open the circuit
pub const FAILURE_THRESHOLD: u32 = 5;
/// Longest wait the second pass will sleep out
pub const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(15);
/// Slack added to a wait-out sleep
pub const WAIT_BUFFER: Duration = Duration::from_secs(1);

/// Health counters for one provider
#[derive(Debug, Clone)]
pub struct ProviderHealth {
    pub request_count: u32,
    pub window_started: Instant,
    pub consecutive_failures: u32,
    pub circuit_open_until: Option<Instant>,
}

impl ProviderHealth {
    fn new(now: Instant) -> Self {
        Self {
            request_count: 0,
            window_started: now,
            consecutive_failures: 0,
            circuit_open_until: None,
        }
    }

    fn circuit_open(&self, now: Instant) -> bool {
        matches!(self.circuit_open_until, Some(until) if now < until)
    }

    fn roll_window(&mut self, now: Instant) {
        if now.duration_since(self.window_started) >= RATE_WINDOW {
            self.request_count = 0;
            self.window_started = now;
        }
    }
}

/// Effective request budget per window
pub fn window_budget(requests_per_minute: u32) -> u32 {
    (requests_per_minute as f64 * RATE_UTILIZATION).floor() as u32
}

/// Shared registry of provider health
#[derive(Debug, Clone, Default)]
pub struct ProviderHealthRegistry {
    inner: Arc<Mutex<HashMap<String, ProviderHealth>>>,
}

impl ProviderHealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a call to the provider may be made now
    ///
    /// False while the circuit is open. Otherwise resets the window once it
    /// has elapsed and allows calls while under the window budget.
    pub async fn can_use(&self, provider_id: &str, requests_per_minute: u32) -> bool {
        let now = Instant::now();
        let mut map = self.inner.lock().await;
        let health = map
            .entry(provider_id.to_string())
            .or_insert_with(|| ProviderHealth::new(now));

        if health.circuit_open(now) {
            return false;
        }
        health.roll_window(now);
        health.request_count < window_budget(requests_per_minute)
    }

    /// Time until the provider becomes usable again
    ///
    /// The longer of the open circuit and, when the window budget is spent,
    /// the remainder of the current window.
    pub async fn remaining_wait(&self, provider_id: &str, requests_per_minute: u32) -> Duration {
        let now = Instant::now();
        let map = self.inner.lock().await;
        let Some(health) = map.get(provider_id) else {
            return Duration::ZERO;
        };

        let circuit = health
            .circuit_open_until
            .map(|until| until.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO);

        let window_end = health.window_started + RATE_WINDOW;
        let window = if now < window_end && health.request_count >= window_budget(requests_per_minute) {
            window_end - now
        } else {
            Duration::ZERO
        };

        circuit.max(window)
    }

    /// Count one call attempt against the current window
    pub async fn record_attempt(&self, provider_id: &str) {
        let now = Instant::now();
        let mut map = self.inner.lock().await;
        let health = map
            .entry(provider_id.to_string())
            .or_insert_with(|| ProviderHealth::new(now));
        health.roll_window(now);
        health.request_count += 1;
    }

    /// Reset failure tracking after a successful call
    pub async fn record_success(&self, provider_id: &str) {
        let now = Instant::now();
        let mut map = self.inner.lock().await;
        let health = map
            .entry(provider_id.to_string())
            .or_insert_with(|| ProviderHealth::new(now));
        health.consecutive_failures = 0;
        health.circuit_open_until = None;
    }

    /// Record a failed call, opening the circuit when warranted
    pub async fn record_failure(&self, provider_id: &str, rate_limited: bool) {
        let now = Instant::now();
        let mut map = self.inner.lock().await;
        let health = map
            .entry(provider_id.to_string())
            .or_insert_with(|| ProviderHealth::new(now));
        health.consecutive_failures += 1;

        if rate_limited {
            health.circuit_open_until = Some(now + RATE_LIMIT_COOLDOWN);
            tracing::warn!(
                provider = provider_id,
                cooldown_secs = RATE_LIMIT_COOLDOWN.as_secs(),
                "Provider rate limited, circuit opened"
            );
        } else if health.consecutive_failures >= FAILURE_THRESHOLD {
            health.circuit_open_until = Some(now + FAILURE_COOLDOWN);
            tracing::warn!(
                provider = provider_id,
                failures = health.consecutive_failures,
                cooldown_secs = FAILURE_COOLDOWN.as_secs(),
                "Provider failing repeatedly, circuit opened"
            );
        }
    }

    /// Snapshot of one provider's counters
    pub async fn snapshot(&self, provider_id: &str) -> Option<ProviderHealth> {
        self.inner.lock().await.get(provider_id).cloned()
    }
}
