//! Bounded health polling for a cold-starting service.
//!
//! [`await_healthy`] blocks until the service's health endpoint returns
//! HTTP 200 with a JSON body whose `status` field equals `"ok"`
//! (case-insensitive), or the wait budget is exhausted. Polling is
//! fixed-interval; a transient network error or bad response within the
//! budget is "not ready yet", never an error.

use std::time::Instant;

use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use serde_json::Value;

use crate::config::{HealthConfig, UnresolvablePolicy};

/// Path segment appended to the target URL when deriving a health URL.
const HEALTH_SEGMENT: &str = "health";

/// Errors from a gate evaluation.
#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    /// No successful poll before the wait budget elapsed.
    #[error("service did not become healthy within {elapsed_ms}ms (health url: {health_url})")]
    Timeout {
        /// Total time spent polling before giving up.
        elapsed_ms: u64,
        /// The health URL that never reported ready.
        health_url: String,
    },

    /// No health URL could be resolved and the configured policy is
    /// [`UnresolvablePolicy::Reject`].
    #[error("no health URL could be resolved for the target")]
    NoHealthUrl,
}

/// Resolve the health URL for a gate evaluation.
///
/// Resolution order:
/// 1. the explicit health URL, if given;
/// 2. derived from the target URL by ensuring its path ends with `/`
///    and appending the fixed `health` segment;
/// 3. the configured default health URL, if the target is malformed.
///
/// Returns `None` when none of the three apply.
pub fn resolve_health_url(
    target_url: &str,
    explicit_health_url: Option<&str>,
    config: &HealthConfig,
) -> Option<String> {
    if let Some(explicit) = explicit_health_url {
        return Some(explicit.to_string());
    }

    if let Some(derived) = derive_health_url(target_url) {
        return Some(derived);
    }

    config.default_health_url.clone()
}

/// Derive `<target>/health` from the target URL, or `None` if the
/// target does not parse as a URL.
fn derive_health_url(target_url: &str) -> Option<String> {
    let mut url = Url::parse(target_url).ok()?;

    let path = url.path().to_string();
    if !path.ends_with('/') {
        url.set_path(&format!("{path}/"));
    }

    url.join(HEALTH_SEGMENT).ok().map(|u| u.to_string())
}

/// Poll the health endpoint until ready or the wait budget elapses.
///
/// The per-request timeout is [`HealthConfig::per_poll_timeout`]. Every
/// unready poll is followed by exactly one poll-interval sleep, so the
/// worst case is about `ceil(wait_budget / poll_interval)` polls.
pub async fn await_healthy(
    target_url: &str,
    headers: &HeaderMap,
    explicit_health_url: Option<&str>,
    config: &HealthConfig,
) -> Result<(), HealthError> {
    let Some(health_url) = resolve_health_url(target_url, explicit_health_url, config) else {
        return match config.unresolvable {
            UnresolvablePolicy::AssumeHealthy => {
                tracing::warn!(
                    target = target_url,
                    "No health URL resolvable, skipping readiness gate",
                );
                Ok(())
            }
            UnresolvablePolicy::Reject => Err(HealthError::NoHealthUrl),
        };
    };

    let client = reqwest::Client::new();
    let per_poll_timeout = config.per_poll_timeout();
    let start = Instant::now();
    let mut attempt = 0u32;

    while start.elapsed() < config.wait_budget {
        attempt += 1;

        if probe(&client, &health_url, headers, per_poll_timeout).await {
            tracing::info!(
                url = %health_url,
                attempt,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Service reported healthy",
            );
            return Ok(());
        }

        tracing::debug!(url = %health_url, attempt, "Service not ready yet");
        tokio::time::sleep(config.poll_interval).await;
    }

    let elapsed_ms = start.elapsed().as_millis() as u64;
    tracing::warn!(url = %health_url, attempt, elapsed_ms, "Readiness gate timed out");
    Err(HealthError::Timeout {
        elapsed_ms,
        health_url,
    })
}

/// Issue one health poll. Any failure mode -- network error, non-200
/// status, non-JSON body, missing or wrong `status` field -- is simply
/// "not ready".
async fn probe(
    client: &reqwest::Client,
    health_url: &str,
    headers: &HeaderMap,
    timeout: std::time::Duration,
) -> bool {
    let response = match client
        .get(health_url)
        .headers(headers.clone())
        .timeout(timeout)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(url = %health_url, error = %e, "Health probe failed");
            return false;
        }
    };

    if response.status() != StatusCode::OK {
        return false;
    }

    let body: Value = match response.json().await {
        Ok(body) => body,
        Err(_) => return false,
    };

    body.get("status")
        .and_then(Value::as_str)
        .is_some_and(|status| status.eq_ignore_ascii_case("ok"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
