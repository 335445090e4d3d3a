//! Spawn + capture + classify logic for one invocation.
//!
//! The external program receives `[script_path, ...args]`, runs to
//! completion (or to the optional timeout), and is judged solely on its
//! final accumulated stdout and exit code. Intermediate stream contents
//! never influence classification.

use std::process::Stdio;
use std::time::Instant;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::args::ScriptArgs;

/// Maximum stdout or stderr size captured per stream (10 MiB).
///
/// Output beyond this limit is truncated to prevent memory exhaustion
/// from runaway programs.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Tunables for one invocation.
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    /// Maximum wall-clock time before the process is killed.
    /// `None` lets the process run to its natural exit.
    pub timeout: Option<std::time::Duration>,
    /// Additional environment variables set for the child process.
    pub env_vars: Vec<(String, String)>,
    /// Working directory for the child process (inherited if `None`).
    pub working_directory: Option<String>,
}

/// Errors from a subprocess invocation.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The process could not be started at all (executable missing,
    /// permission denied, etc.). Never retried.
    #[error("failed to start process: {0}")]
    Start(#[from] std::io::Error),

    /// The accumulated stdout did not parse as a single JSON document.
    #[error("stdout is not valid JSON: {message} (exit code {exit_code}, stderr: {stderr})")]
    Parse {
        /// The JSON parser's failure reason.
        message: String,
        /// Captured stderr, for diagnostics.
        stderr: String,
        /// Process exit code (`-1` if killed by signal).
        exit_code: i32,
    },

    /// The process exited non-zero and its JSON output carried no
    /// `"error"` key.
    #[error("process exited with code {exit_code}: {stderr}")]
    ExitCode {
        /// Process exit code.
        exit_code: i32,
        /// Captured stderr, for diagnostics.
        stderr: String,
    },

    /// The process exceeded the configured timeout and was killed.
    #[error("process timed out after {elapsed_ms}ms")]
    Timeout {
        /// Elapsed wall-clock time before the process was killed.
        elapsed_ms: u64,
    },
}

/// Run `executable [script_path, ...args]` and classify the outcome.
///
/// The full stdout buffer is parsed as one JSON document regardless of
/// exit code:
///
/// - parse failure → [`InvokeError::Parse`], whatever the exit code;
/// - parse success + exit 0 → `Ok(value)`;
/// - parse success + non-zero exit + object containing an `"error"`
///   key → `Ok(value)` — the child is allowed to report a structured
///   domain error as its normal output contract;
/// - parse success + non-zero exit otherwise → [`InvokeError::ExitCode`].
pub async fn invoke(
    executable: &str,
    script_path: &str,
    args: impl Into<ScriptArgs>,
    options: InvokeOptions,
) -> Result<Value, InvokeError> {
    let args = args.into().normalize();

    let mut cmd = Command::new(executable);
    cmd.arg(script_path)
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (key, value) in &options.env_vars {
        cmd.env(key, value);
    }

    if let Some(dir) = &options.working_directory {
        cmd.current_dir(dir);
    }

    let start = Instant::now();

    let mut child = cmd.spawn().map_err(InvokeError::Start)?;

    tracing::debug!(
        executable,
        script = script_path,
        arg_count = args.len(),
        "Spawned invocation process",
    );

    // Read stdout/stderr in spawned tasks so `child.wait()` (which
    // borrows `&mut child`) can run concurrently with the drain.
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
    let stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

    let status = match options.timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(wait_result) => wait_result.map_err(InvokeError::Start)?,
            Err(_elapsed) => {
                // `child` is dropped here, which kills the process
                // because kill_on_drop is set.
                return Err(InvokeError::Timeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                });
            }
        },
        None => child.wait().await.map_err(InvokeError::Start)?,
    };

    let stdout_bytes = stdout_task.await.unwrap_or_default();
    let stderr_bytes = stderr_task.await.unwrap_or_default();
    let stdout = String::from_utf8_lossy(&stdout_bytes).into_owned();
    let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();

    // Signals are diagnostics only; classification sees exit code -1.
    if status.code().is_none() {
        tracing::warn!(
            executable,
            script = script_path,
            status = %status,
            "Process terminated by signal",
        );
    }
    let exit_code = status.code().unwrap_or(-1);

    tracing::debug!(
        exit_code,
        stdout_len = stdout.len(),
        stderr_len = stderr.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Invocation process exited",
    );

    classify(exit_code, &stdout, stderr)
}

/// Classify the final accumulated output of an exited process.
fn classify(exit_code: i32, stdout: &str, stderr: String) -> Result<Value, InvokeError> {
    let value: Value = match serde_json::from_str(stdout.trim()) {
        Ok(value) => value,
        Err(e) => {
            return Err(InvokeError::Parse {
                message: e.to_string(),
                stderr,
                exit_code,
            });
        }
    };

    if exit_code == 0 {
        return Ok(value);
    }

    // A non-zero exit paired with a well-formed error object is a valid
    // outcome: the child reported a structured domain error.
    if value
        .as_object()
        .is_some_and(|map| map.contains_key("error"))
    {
        return Ok(value);
    }

    Err(InvokeError::ExitCode { exit_code, stderr })
}

/// Read an entire output stream into a byte buffer, capped at
/// [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
    }
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
