//! Centralized tracing initialization.
//!
//! Transport nodes embedding this library share one tracing setup. The
//! subscriber is thread-local so it never conflicts with a host framework's
//! own global subscriber.

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with a thread-local subscriber.
///
/// Respects `RUST_LOG` (defaults to "info") and emits compact output
/// without target/file/line metadata.
///
/// # Returns
/// A `DefaultGuard` that keeps the subscriber active; keep it in scope for
/// the duration of the program.
pub fn init_tracing() -> DefaultGuard {
    use tracing_subscriber::layer::SubscriberExt;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(fmt_layer);

    tracing::subscriber::set_default(subscriber)
}
