//! Tracing setup for the runtime binary.
//!
//! Subsystem crates only emit `tracing` events with their `[mn-NN]` prefixes;
//! this module owns the single subscriber that renders them.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// The filter comes from `MN_LOG` (same syntax as `RUST_LOG`) and defaults
/// to `info`. Calling this twice is a no-op so tests can race to install it.
pub fn init() {
    let filter = EnvFilter::try_from_env("MN_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}
