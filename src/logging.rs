//! Logging setup: an env var selects the level, wired into a compact,
//! ANSI, chrono-timestamped `tracing-subscriber` layer.

use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

const LOG_LEVEL_ENV: &str = "MTA_QUEUE_LOG";

/// Installs the global `tracing` subscriber. Safe to call once at process
/// start; a second call is a no-op (errors from
/// `tracing::subscriber::set_global_default` are ignored — logging should
/// never be the reason the process fails to start).
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(true)
        .with_timer(ChronoLocal::rfc_3339())
        .with_target(false)
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
