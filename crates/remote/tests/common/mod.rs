//! Shared helpers for the remote integration tests.
//!
//! The cold-starting worker service is stood in for by a real axum app
//! bound to a loopback ephemeral port.

use axum::Router;

/// Serve `app` on `127.0.0.1:0` and return its base URL.
///
/// The server task is detached; it lives for the rest of the test
/// process, which is fine for one-shot integration tests.
pub async fn spawn_app(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test app");
    });

    format!("http://{addr}")
}
