//! `waypoint` -- one-shot CLI for the invocation and dispatch layers.
//!
//! Runs exactly one operation and exits: either invoke a local script
//! expected to print a JSON document, or dispatch a file to a remote
//! worker service behind the readiness gate.
//!
//! ```text
//! waypoint invoke <script> [args...]
//! waypoint dispatch <file>
//! ```
//!
//! # Environment variables
//!
//! | Variable                      | Required     | Default   | Description                              |
//! |-------------------------------|--------------|-----------|------------------------------------------|
//! | `WAYPOINT_TARGET_URL`         | for dispatch | --        | Endpoint receiving the payload POST      |
//! | `WAYPOINT_HEALTH_URL`         | no           | derived   | Explicit health endpoint                 |
//! | `WAYPOINT_API_TOKEN`          | no           | --        | Bearer token for the Authorization header|
//! | `WAYPOINT_EXECUTABLE`         | no           | `python3` | Interpreter for `invoke`                 |
//! | `WAYPOINT_INVOKE_TIMEOUT_MS`  | no           | unlimited | Kill the invoked process after this long |
//! | `WAYPOINT_WAIT_BUDGET_MS`     | no           | `120000`  | Total readiness-polling budget           |
//! | `WAYPOINT_POLL_INTERVAL_MS`   | no           | `3000`    | Delay between health polls               |
//! | `WAYPOINT_REQUEST_TIMEOUT_MS` | no           | `120000`  | Per-request HTTP timeout ceiling         |

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use waypoint_invoker::{invoke, InvokeOptions};
use waypoint_remote::{dispatch, HealthConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("invoke") => run_invoke(args.collect()).await,
        Some("dispatch") => run_dispatch(args.collect()).await,
        _ => {
            eprintln!("usage: waypoint <invoke|dispatch> ...");
            eprintln!("  waypoint invoke <script> [args...]");
            eprintln!("  waypoint dispatch <file>");
            std::process::exit(2);
        }
    }
}

/// Invoke a local script and print its JSON result.
async fn run_invoke(argv: Vec<String>) {
    let Some((script, rest)) = argv.split_first() else {
        eprintln!("usage: waypoint invoke <script> [args...]");
        std::process::exit(2);
    };

    let executable =
        std::env::var("WAYPOINT_EXECUTABLE").unwrap_or_else(|_| "python3".to_string());

    let timeout = std::env::var("WAYPOINT_INVOKE_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis);

    let options = InvokeOptions {
        timeout,
        ..Default::default()
    };

    tracing::info!(executable = %executable, script = %script, "Invoking script");

    match invoke(&executable, script, rest.to_vec(), options).await {
        Ok(value) => println!("{value}"),
        Err(e) => {
            tracing::error!(error = %e, "Invocation failed");
            std::process::exit(1);
        }
    }
}

/// Dispatch a file to the remote worker and print the response body.
async fn run_dispatch(argv: Vec<String>) {
    let [file_path] = argv.as_slice() else {
        eprintln!("usage: waypoint dispatch <file>");
        std::process::exit(2);
    };

    let target_url = std::env::var("WAYPOINT_TARGET_URL").unwrap_or_else(|_| {
        tracing::error!("WAYPOINT_TARGET_URL environment variable is required");
        std::process::exit(1);
    });

    let health_url = std::env::var("WAYPOINT_HEALTH_URL").ok();
    let config = HealthConfig::from_env();
    let headers = build_headers();

    tracing::info!(file = %file_path, url = %target_url, "Dispatching payload");

    match dispatch(file_path, &target_url, &headers, health_url.as_deref(), &config).await {
        Ok(body) => println!("{body}"),
        Err(e) => {
            tracing::error!(error = %e, "Dispatch failed");
            std::process::exit(1);
        }
    }
}

/// Default dispatch headers: a bearer Authorization header when
/// `WAYPOINT_API_TOKEN` is set.
fn build_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Ok(token) = std::env::var("WAYPOINT_API_TOKEN") {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => {
                tracing::error!("WAYPOINT_API_TOKEN contains invalid header characters");
                std::process::exit(1);
            }
        }
    }

    headers
}
