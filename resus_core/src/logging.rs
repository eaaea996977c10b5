//! Tracing setup for the `resq` binary.
//!
//! Everything of clinical interest goes to the event log, not here;
//! tracing output is diagnostic only, so it stays out of the way of the
//! interactive prompt by default.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing at the default `warn` level.
///
/// Diagnostics share the terminal with the session prompt, so anything
/// below `warn` is opt-in via `RUST_LOG`.
pub fn init() {
    init_with_level("warn")
}

/// Initialize tracing with the given default level, overridable through
/// the `RUST_LOG` environment variable.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false))
        .init();
}
