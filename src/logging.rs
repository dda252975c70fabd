//! Logging setup shared by the demo binary and test harnesses.

use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber.
///
/// `debug` flips the default level from INFO to DEBUG; `RUST_LOG` still
/// overrides either. Safe to call more than once.
pub fn init(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
