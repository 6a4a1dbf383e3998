//! Log stream setup
//!
//! Conversion runs are long and concurrent; every warning carries its item
//! or unit id and the emitting thread so interleaved output stays
//! attributable.

use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber. `RUST_LOG` overrides the default
/// directive. Safe to call more than once; later calls are ignored.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(true)
        .with_target(false)
        .try_init();
}
