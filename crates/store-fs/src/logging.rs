//! Tracing subscriber bootstrap for binaries and tests that use the store.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a compact fmt subscriber filtered by `RUST_LOG`.
///
/// Falls back to `default_directive` (for example `"store_fs=debug"`) when
/// `RUST_LOG` is unset. Fails if a global subscriber is already installed.
pub fn init(default_directive: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .compact();

    let filter_layer =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_directive))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
