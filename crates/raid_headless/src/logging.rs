//! Log filter setup for the runner binary.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Build the log filter.
///
/// `directives` (normally `RUST_LOG`) win when they parse. Otherwise the
/// filter is DEBUG with `verbose` and INFO without.
pub fn log_filter(verbose: bool, directives: Option<&str>) -> EnvFilter {
    let fallback = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::default().add_directive(fallback.into()))
}
