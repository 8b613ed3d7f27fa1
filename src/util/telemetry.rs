//! Telemetry helpers for structured logging.
//!
//! The primitives only emit `tracing` events (pool start-up, worker exits,
//! shutdown). Nothing is printed unless the host installs a subscriber; these
//! helpers install a default `fmt` subscriber for binaries and tests.

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "prometheus_primitives=info";

/// Install a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_DIRECTIVE`]. Does nothing if a subscriber is already set.
pub fn init_tracing() {
    init_tracing_with_default(DEFAULT_DIRECTIVE);
}

/// Install a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `directive` when the variable is unset or invalid.
pub fn init_tracing_with_default(directive: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}
