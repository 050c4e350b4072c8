//! Logging setup using tracing.
//!
//! Logs go to stderr so `--json` output on stdout stays machine readable.
//! RUST_LOG overrides the default filter.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "blackbox=debug"
    } else {
        "blackbox=info"
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(verbose: bool) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}
