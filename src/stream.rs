//! Tail session entry point: resolve the target, pick the notifier, and
//! stream new lines to stdout until interrupted.
//!
//! `ptail logs/app-*.log --filter=ERROR --i` follows the newest matching
//! file and prints only lines containing "error" in any case.

use std::io::{self, Write};
use std::sync::atomic::AtomicBool;

use tracing::debug;

use crate::config::TailConfig;
use crate::error::TailError;
use crate::filter::{FilterSpec, LineMatcher};
use crate::locator::{self, WatchTarget};
use crate::notifier::{ColorNotifier, PlainNotifier, StatusNotifier};
use crate::signal::spawn_shutdown_listener;
use crate::sink::{LineSink, WriterSink};
use crate::watcher::{run_loop, TailEngine};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run a tail session with the given configuration.
///
/// Returns `Ok(())` on clean shutdown (SIGINT/SIGTERM).
///
/// # Errors
///
/// - [`TailError::Pattern`] before anything is watched, if the regex is bad.
/// - [`TailError::Sink`] when stdout goes away (check
///   [`TailError::is_broken_pipe`]).
pub async fn run_stream(config: &TailConfig) -> Result<(), TailError> {
    let matcher = config.filter.compile()?;
    let target = locator::resolve_target(&config.targets)?;

    print_filter_banner(&config.filter, &mut io::stderr());
    debug!(
        path = %target.path().display(),
        resolution = ?target.resolution(),
        colors = config.colors,
        "starting session"
    );

    let shutdown = spawn_shutdown_listener();
    let sink = WriterSink::new(io::stdout());

    if config.colors {
        let notifier = ColorNotifier::new(io::stdout());
        follow(config, &target, matcher, notifier, sink, &shutdown).await
    } else {
        let notifier = PlainNotifier::new(io::stdout());
        follow(config, &target, matcher, notifier, sink, &shutdown).await
    }
}

/// Build the engine for one notifier/sink pair and drive it.
pub async fn follow<N, S>(
    config: &TailConfig,
    target: &WatchTarget,
    matcher: LineMatcher,
    notifier: N,
    sink: S,
    shutdown: &AtomicBool,
) -> Result<(), TailError>
where
    N: StatusNotifier,
    S: LineSink,
{
    let mut engine = TailEngine::new(target.path().to_path_buf(), matcher, notifier, sink)
        .with_chunk_size(config.chunk_size);

    engine.announce(target.resolution());
    run_loop(&mut engine, config.poll_interval, shutdown).await
}

/// Tell the user which filter is active, regardless of the log level.
fn print_filter_banner<W: Write>(spec: &FilterSpec, out: &mut W) {
    if let Some(desc) = spec.display() {
        let _ = writeln!(out, "{}", desc);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
