//! Tracing subscriber initialization.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with `EnvFilter`.
///
/// Defaults to info level for this crate if `RUST_LOG` is not set. Safe to
/// call more than once (later calls are no-ops), so tests can call it
/// unconditionally.
pub fn init() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "clementine_admin=info".into());

    // Use JSON format when deployed for structured log parsing, text locally
    let is_deployed = std::env::var("CLEMENTINE_ENV").is_ok_and(|v| v == "production");
    let json_layer = is_deployed.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_deployed).then(tracing_subscriber::fmt::layer);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init();
}
