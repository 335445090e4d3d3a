//! Subprocess invocation with typed JSON outcomes.
//!
//! Spawns an external program that is expected to print a single JSON
//! document to stdout, captures both output streams, and classifies the
//! exit into a well-defined result: a non-zero exit paired with a JSON
//! object carrying an `"error"` key is a valid domain outcome, not a
//! transport failure.

pub mod args;
pub mod invoke;

pub use args::ScriptArgs;
pub use invoke::{invoke, InvokeError, InvokeOptions};
