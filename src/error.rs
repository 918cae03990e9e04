//! Error taxonomy for the tail engine and its outer layers.
//!
//! Only a few of these ever reach `main`: a bad filter pattern at startup
//! and a broken output sink. Read failures inside a tick are swallowed by
//! the watcher and only show up in the diagnostics log.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while setting up or running a tail session.
#[derive(Debug, Error)]
pub enum TailError {
    /// The `--filter-regex` pattern does not compile. Fatal at startup.
    #[error("invalid filter pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// No file name or pattern was supplied.
    #[error("no folder, file name or file pattern given")]
    MissingTarget,

    /// An I/O failure while polling the watch target. Transient: the
    /// watcher logs it and retries on the next tick.
    #[error("could not read {}: {source}", .path.display())]
    TransientRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing emitted lines to the output failed.
    #[error("could not write output: {0}")]
    Sink(#[source] io::Error),

    /// Process-level I/O failure (current directory, runtime setup).
    #[error(transparent)]
    Runtime(#[from] io::Error),
}

impl TailError {
    /// `true` when the output consumer went away (e.g. `ptail log | head`).
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, TailError::Sink(e) if e.kind() == io::ErrorKind::BrokenPipe)
    }

    /// Process exit status for an error that ended the session.
    pub fn exit_code(&self) -> i32 {
        match self {
            _ if self.is_broken_pipe() => 0,
            TailError::Pattern { .. } => 2,
            _ => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
