use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Installs a JSON-structured `tracing` subscriber scoped by `RUST_LOG`
/// (defaulting to `info` for this daemon's own crates), so every daemon logs
/// the same shape regardless of which one is running.
pub fn init(script_stem: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("{script_stem}=info,udp_daemon=info,warn")));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json().with_target(true))
        .init();
}
