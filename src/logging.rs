//! Diagnostics setup.
//!
//! Diagnostics go to stderr so they never mix with tailed output on stdout.
//! The level comes from `--verbose` only; the environment is not consulted.

use tracing::Level;

/// Install the global `tracing` subscriber. Calling it twice is harmless.
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level_for(verbose))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn level_for(verbose: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else {
        Level::WARN
    }
}
