//! Readiness-gated dispatch to a remote worker service.
//!
//! The target service may be cold-starting, so a payload is only sent
//! after a bounded health-polling gate reports it ready. Two pieces:
//!
//! - [`health::await_healthy`] -- poll a health endpoint on a fixed
//!   interval until it reports healthy or the wait budget runs out.
//! - [`dispatch::dispatch`] -- base64-encode a file and POST it to the
//!   target exactly once, strictly after the gate succeeds.

pub mod config;
pub mod dispatch;
pub mod health;

pub use config::{HealthConfig, UnresolvablePolicy};
pub use dispatch::{dispatch, DispatchError};
pub use health::{await_healthy, HealthError};
