//! Logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize logging with env filter support.
///
/// Reads the `VKSCOOP_LOG` environment variable for filter directives
/// (e.g. `debug` or `vkscoop_capture=trace`), defaulting to `info`.
/// The host process may already carry a subscriber, so init failure is
/// ignored.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env("VKSCOOP_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .ok();
}
