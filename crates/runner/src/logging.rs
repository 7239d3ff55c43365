#![forbid(unsafe_code)]

use tracing_subscriber::EnvFilter;

/// Installs the process-wide subscriber. Filter comes from `RUST_LOG` (default `info`).
///
/// Logs go to stderr so stdout stays clean for machine-readable output. Safe to call
/// more than once; later calls are no-ops.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
