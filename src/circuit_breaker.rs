//! Per-upstream circuit breaker shared by the remote estimators
//!
//! Each upstream (an LLM provider, the text classifier) gets its own entry,
//! keyed by name. After `failure_threshold` consecutive failures the entry
//! opens and rejects calls until `reset_timeout` has passed; the next call is
//! then let through as a trial (half-open) and its outcome closes or
//! re-opens the circuit.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
struct Entry {
    state: BreakerState,
    consecutive_failures: usize,
    opened_at: Option<Instant>,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            state: BreakerState::Closed,
            consecutive_failures: 0,
            opened_at: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: usize,
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

pub struct CircuitBreaker {
    entries: Mutex<HashMap<String, Entry>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            config,
        }
    }

    // A panic while holding the lock leaves plain counters behind, which are
    // still usable.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether a call to `upstream` may proceed. An open circuit whose reset
    /// timeout has elapsed moves to half-open and allows the call.
    pub fn allow(&self, upstream: &str) -> bool {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(upstream) else {
            return true;
        };

        match entry.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let cooled_down = entry
                    .opened_at
                    .map_or(true, |at| at.elapsed() >= self.config.reset_timeout);
                if cooled_down {
                    entry.state = BreakerState::HalfOpen;
                }
                cooled_down
            }
        }
    }

    pub fn record_success(&self, upstream: &str) {
        self.entries().remove(upstream);
    }

    pub fn record_failure(&self, upstream: &str) {
        let mut entries = self.entries();
        let entry = entries.entry(upstream.to_string()).or_default();
        entry.consecutive_failures += 1;

        let trip = entry.state == BreakerState::HalfOpen
            || entry.consecutive_failures >= self.config.failure_threshold;
        if trip {
            if entry.state != BreakerState::Open {
                warn!(
                    "Circuit opened for {} after {} consecutive failures",
                    upstream, entry.consecutive_failures
                );
            }
            entry.state = BreakerState::Open;
            entry.opened_at = Some(Instant::now());
        }
    }

    pub fn state(&self, upstream: &str) -> BreakerState {
        self.entries()
            .get(upstream)
            .map_or(BreakerState::Closed, |e| e.state)
    }

    pub fn consecutive_failures(&self, upstream: &str) -> usize {
        self.entries()
            .get(upstream)
            .map_or(0, |e| e.consecutive_failures)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: usize, reset: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            reset_timeout: reset,
        })
    }

    #[test]
    fn test_closed_by_default() {
        let breaker = CircuitBreaker::default();
        assert!(breaker.allow("groq"));
        assert_eq!(breaker.state("groq"), BreakerState::Closed);
    }

    #[test]
    fn test_opens_after_threshold() {
        let breaker = breaker(3, Duration::from_secs(30));
        breaker.record_failure("groq");
        breaker.record_failure("groq");
        assert!(breaker.allow("groq"));
        breaker.record_failure("groq");
        assert!(!breaker.allow("groq"));
        assert_eq!(breaker.state("groq"), BreakerState::Open);
        // Other upstreams are unaffected
        assert!(breaker.allow("grok"));
    }

    #[test]
    fn test_success_resets() {
        let breaker = breaker(3, Duration::from_secs(30));
        breaker.record_failure("groq");
        breaker.record_failure("groq");
        breaker.record_success("groq");
        assert_eq!(breaker.consecutive_failures("groq"), 0);
        assert_eq!(breaker.state("groq"), BreakerState::Closed);
    }

    #[test]
    fn test_half_open_trial() {
        let breaker = breaker(2, Duration::from_millis(50));
        breaker.record_failure("groq");
        breaker.record_failure("groq");
        assert!(!breaker.allow("groq"));

        std::thread::sleep(Duration::from_millis(80));
        assert!(breaker.allow("groq"));
        assert_eq!(breaker.state("groq"), BreakerState::HalfOpen);

        // A failed trial re-opens immediately
        breaker.record_failure("groq");
        assert_eq!(breaker.state("groq"), BreakerState::Open);
        assert!(!breaker.allow("groq"));
    }
}
