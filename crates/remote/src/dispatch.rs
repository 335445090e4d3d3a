//! Readiness-gated payload dispatch.
//!
//! Reads a file, base64-encodes it into a `{"file_bytes": ...}` JSON
//! body, and POSTs it to the target exactly once. The POST is never
//! issued before [`await_healthy`](crate::health::await_healthy)
//! succeeds, and is never retried on failure.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::HeaderMap;

use crate::config::HealthConfig;
use crate::health::{self, HealthError};

/// Errors from a dispatch attempt.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The payload file could not be read.
    #[error("failed to read payload file: {0}")]
    Io(#[from] std::io::Error),

    /// The readiness gate failed, so no POST was issued.
    #[error("service never became ready: {0}")]
    NotReady(#[from] HealthError),

    /// The POST itself failed at the transport level (network error,
    /// timeout, etc.).
    #[error("dispatch request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote returned a non-2xx status.
    #[error("remote rejected dispatch ({status}): {body}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Remote-provided diagnostic body, verbatim.
        body: String,
    },
}

/// Dispatch the file at `file_path` to `target_url`, gated on the
/// target's readiness.
///
/// On success returns the response body verbatim. Every failure mode is
/// surfaced to the caller; nothing is retried here -- the only bounded
/// internal retry is the readiness poll loop.
pub async fn dispatch(
    file_path: &str,
    target_url: &str,
    headers: &HeaderMap,
    explicit_health_url: Option<&str>,
    config: &HealthConfig,
) -> Result<String, DispatchError> {
    let bytes = tokio::fs::read(file_path).await?;
    let encoded = STANDARD.encode(&bytes);

    tracing::debug!(
        file = file_path,
        raw_bytes = bytes.len(),
        "Encoded dispatch payload",
    );

    health::await_healthy(target_url, headers, explicit_health_url, config).await?;

    let payload = serde_json::json!({ "file_bytes": encoded });

    let response = reqwest::Client::new()
        .post(target_url)
        .headers(headers.clone())
        .timeout(config.request_timeout)
        .json(&payload)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        tracing::warn!(url = %target_url, status = status.as_u16(), "Dispatch rejected");
        return Err(DispatchError::Remote {
            status: status.as_u16(),
            body,
        });
    }

    let body = response.text().await?;
    tracing::info!(url = %target_url, status = status.as_u16(), "Dispatch succeeded");
    Ok(body)
}
