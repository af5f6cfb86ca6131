//! Tracing setup for the binary.
//!
//! Events go to stderr through a `fmt` layer; the filter comes from `FILECAT_LOG`.

use std::env;
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding the tracing filter, e.g. `FILECAT_LOG=filecat=debug`.
pub const LOG_ENV: &str = "FILECAT_LOG";

/// Builds the filter: `FILECAT_LOG` if set, otherwise `debug` when verbose and `info` if not.
pub fn build_filter(verbose: bool) -> EnvFilter {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = env::var(LOG_ENV).unwrap_or_else(|_| default_filter.to_string());
    EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Installs the global subscriber, logging to stderr so reports on stdout stay clean.
///
/// Calling it twice is harmless; the second call leaves the first subscriber in place.
pub fn init_logger(verbose: bool) {
    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(build_filter(verbose))
        .try_init();

    if installed.is_ok() {
        debug!("Tracing configured for stderr.");
    }
}
