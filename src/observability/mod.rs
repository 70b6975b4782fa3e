//! Structured logging setup.
//!
//! Console logging in pretty, compact or JSON format, filtered by level with
//! `RUST_LOG` taking precedence over the configuration.

mod tracing_init;

pub use tracing_init::*;
