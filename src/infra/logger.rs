// src/infra/logger.rs — Structured logging with tracing
//
// stdout carries the JSON-RPC transport, so every log line goes to stderr.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `VELLE_LOG` wins over `RUST_LOG`; `level`
/// is the fallback directive when neither is set.
pub fn init_logging(level: &str) {
    let filter = std::env::var("VELLE_LOG")
        .ok()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
