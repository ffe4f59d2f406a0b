//! Logging setup. Diagnostics go to stderr so command output on
//! stdout stays clean for scripting.

use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber. `RUST_LOG` takes precedence over
/// the configured level when set.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
