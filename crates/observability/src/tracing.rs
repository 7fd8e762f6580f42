//! Subscriber installation.

use tracing_subscriber::EnvFilter;

/// Default directives when `RUST_LOG` is unset: the souq crates at debug,
/// everything else at info.
const DEFAULT_DIRECTIVES: &str = "info,souq=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install the process-wide subscriber: JSON lines on stdout, filtered via
/// `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .json()
        .with_current_span(true)
        .try_init();
}

/// Human-readable variant for tests: compact single-line output that respects
/// `cargo test`'s output capture.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .compact()
        .with_test_writer()
        .try_init();
}
