//! Per-provider circuit breaker
//!
//! Explicit tagged state per provider: `Closed` counts consecutive
//! failures, `Open` holds a cooldown deadline. Closed transitions to Open
//! once the failure counter reaches the threshold; Open lapses back to
//! Closed automatically when the deadline passes; any success in Closed
//! resets the counter.
//!
//! This is the backpressure mechanism for chronically failing providers:
//! it never retries within a request, it removes a misbehaving provider
//! from consideration on subsequent requests until the cooldown lapses.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::info;

/// Circuit breaker tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long an open circuit excludes the provider.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum CircuitState {
    Closed { failures: u32 },
    Open { until: Instant },
}

/// Process-wide circuit state, shared across concurrent requests.
///
/// The mutex guards only O(1) map operations and is never held across an
/// await point.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    states: Mutex<HashMap<String, CircuitState>>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// True while the provider is cooling down. An expired cooldown lapses
    /// back to Closed with a reset counter.
    pub fn should_skip(&self, provider_id: &str) -> bool {
        let mut states = match self.states.lock() {
            Ok(states) => states,
            Err(poisoned) => poisoned.into_inner(),
        };
        match states.get(provider_id) {
            Some(CircuitState::Open { until }) if *until > Instant::now() => true,
            Some(CircuitState::Open { .. }) => {
                info!(provider = provider_id, "circuit cooldown lapsed, closing");
                states.insert(
                    provider_id.to_string(),
                    CircuitState::Closed { failures: 0 },
                );
                false
            }
            _ => false,
        }
    }

    /// Record the outcome of one provider call.
    pub fn record_outcome(&self, provider_id: &str, success: bool) {
        let mut states = match self.states.lock() {
            Ok(states) => states,
            Err(poisoned) => poisoned.into_inner(),
        };
        if success {
            states.insert(
                provider_id.to_string(),
                CircuitState::Closed { failures: 0 },
            );
            return;
        }

        let failures = match states.get(provider_id) {
            Some(CircuitState::Closed { failures }) => failures + 1,
            // A failure recorded while open keeps the circuit open.
            Some(CircuitState::Open { .. }) => self.config.failure_threshold,
            None => 1,
        };
        let state = if failures >= self.config.failure_threshold {
            info!(
                provider = provider_id,
                failures, "circuit opened, provider cooling down"
            );
            CircuitState::Open {
                until: Instant::now() + self.config.cooldown,
            }
        } else {
            CircuitState::Closed { failures }
        };
        states.insert(provider_id.to_string(), state);
    }
}
