// ==========================================
// Logging setup
// ==========================================
// tracing + tracing-subscriber, level from RUST_LOG
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// Set to `json` for one JSON object per log line
pub const LOG_FORMAT_ENV: &str = "REGISTRY_INGEST_LOG_FORMAT";

/// Initializes the global subscriber
///
/// # Environment
/// - RUST_LOG: filter directives (default: `default_level`)
///   e.g. RUST_LOG=debug or RUST_LOG=registry_ingest=trace,perf=info
/// - REGISTRY_INGEST_LOG_FORMAT=json: JSON output
///
/// # Example
/// ```no_run
/// use registry_ingest::logging;
/// logging::init("info");
/// ```
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Test subscriber: debug level, captured by the test harness
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
