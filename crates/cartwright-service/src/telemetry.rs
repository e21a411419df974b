//! Tracing subscriber setup.
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - every repository statement
//! - `RUST_LOG=cartwright_service=debug,sqlx=warn` - engine detail only
//! - Otherwise the configured `[logging] filter` (default `info`)

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Returns false if a global subscriber was already installed, so tests and
/// binaries can call it unconditionally.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
