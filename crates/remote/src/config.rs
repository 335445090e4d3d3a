//! Gate and dispatch configuration.
//!
//! All values are supplied explicitly at the call boundary; the gate
//! and dispatcher never read ambient process state themselves.
//! [`HealthConfig::from_env`] exists for binaries that wire the
//! configuration from environment variables.

use std::time::Duration;

/// What the gate does when no health URL can be resolved at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnresolvablePolicy {
    /// Treat the absence of a checkable endpoint as "nothing to block
    /// on" and let the gate succeed silently.
    #[default]
    AssumeHealthy,
    /// Treat it as a misconfiguration and fail the gate.
    Reject,
}

/// Configuration for one gate evaluation (and the dispatch it guards).
///
/// Immutable for the duration of a single evaluation.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Maximum total time the gate may spend polling.
    pub wait_budget: Duration,
    /// Fixed delay between unready polls. No backoff, no jitter.
    pub poll_interval: Duration,
    /// Upper bound on any single HTTP request issued by this layer.
    pub request_timeout: Duration,
    /// Fallback health URL used when derivation from the target URL
    /// fails (malformed target).
    pub default_health_url: Option<String>,
    /// Behavior when neither derivation nor the fallback yields a URL.
    pub unresolvable: UnresolvablePolicy,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            wait_budget: Duration::from_millis(120_000),
            poll_interval: Duration::from_millis(3_000),
            request_timeout: Duration::from_millis(120_000),
            default_health_url: None,
            unresolvable: UnresolvablePolicy::default(),
        }
    }
}

impl HealthConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default  |
    /// |-------------------------------|----------|
    /// | `WAYPOINT_WAIT_BUDGET_MS`     | `120000` |
    /// | `WAYPOINT_POLL_INTERVAL_MS`   | `3000`   |
    /// | `WAYPOINT_REQUEST_TIMEOUT_MS` | `120000` |
    /// | `WAYPOINT_DEFAULT_HEALTH_URL` | unset    |
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let ms = |name: &str, fallback: Duration| {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };

        Self {
            wait_budget: ms("WAYPOINT_WAIT_BUDGET_MS", defaults.wait_budget),
            poll_interval: ms("WAYPOINT_POLL_INTERVAL_MS", defaults.poll_interval),
            request_timeout: ms("WAYPOINT_REQUEST_TIMEOUT_MS", defaults.request_timeout),
            default_health_url: std::env::var("WAYPOINT_DEFAULT_HEALTH_URL").ok(),
            unresolvable: UnresolvablePolicy::default(),
        }
    }

    /// Timeout applied to one health poll: the configured request
    /// timeout, capped at twice the poll interval so a slow probe can
    /// never consume more than two intervals of budget.
    pub fn per_poll_timeout(&self) -> Duration {
        self.request_timeout.min(self.poll_interval * 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = HealthConfig::default();
        assert_eq!(config.wait_budget, Duration::from_millis(120_000));
        assert_eq!(config.poll_interval, Duration::from_millis(3_000));
        assert_eq!(config.request_timeout, Duration::from_millis(120_000));
        assert!(config.default_health_url.is_none());
        assert_eq!(config.unresolvable, UnresolvablePolicy::AssumeHealthy);
    }

    #[test]
    fn per_poll_timeout_caps_at_twice_the_interval() {
        let config = HealthConfig::default();
        assert_eq!(config.per_poll_timeout(), Duration::from_millis(6_000));
    }

    #[test]
    fn per_poll_timeout_uses_request_timeout_when_smaller() {
        let config = HealthConfig {
            request_timeout: Duration::from_millis(1_000),
            ..Default::default()
        };
        assert_eq!(config.per_poll_timeout(), Duration::from_millis(1_000));
    }
}
