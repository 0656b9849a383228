//! Tracing subscriber configuration for the gateway.
//!
//! Log levels follow these conventions:
//! - ERROR: Unrecoverable failures, protocol violations
//! - WARN: Recoverable errors, unexpected but handled conditions
//! - INFO: High-level protocol events (device registered, schema accepted)
//! - DEBUG: Per-PDU processing, cloud call outcomes
//! - TRACE: Wire-level data

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins when set; otherwise the level from the `[logging]`
/// config section applies.
fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the tracing subscriber with the configured default level.
pub fn init(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .init();
}

/// Initialize the tracing subscriber with JSON output, for deployments
/// that ship logs to a collector. Selected via `RUST_LOG_FORMAT=json`.
pub fn init_json(default_level: &str) {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter(default_level))
        .init();
}

/// Initialize the tracing subscriber for tests. Tolerates repeated calls
/// and routes output through the test capture writer.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("debug"))
        .with_test_writer()
        .try_init();
}
