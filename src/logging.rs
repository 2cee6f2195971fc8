//! Structured logging initialization.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::Result;

/// Initializes the global `tracing` subscriber at the given default level.
///
/// Safe to call more than once; a second call is a no-op because
/// `try_init` only fails when a subscriber is already installed, and that
/// case is not an error for this crate's callers.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
    Ok(())
}
