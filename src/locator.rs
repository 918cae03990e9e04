//! Watch target resolution.
//!
//! The user names either a folder, a file, or a file pattern with `*` and
//! `?` wildcards in its last component. The locator scans the containing
//! directory once and picks the most recently modified regular file that
//! matches. If nothing matches, the literal path is watched provisionally
//! until a file with that name appears. Only the first input counts.
//!
//! Resolution happens once per session. A newer match that shows up later
//! is never picked up.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::error::TailError;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// How a watch target was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// An existing file matched the input.
    Located,
    /// Nothing matched; the literal input is watched until it is created.
    Provisional,
}

/// The single absolute path polled for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    path: PathBuf,
    resolution: Resolution,
}

impl WatchTarget {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn is_provisional(&self) -> bool {
        self.resolution == Resolution::Provisional
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve the command-line inputs to one watch target.
///
/// Only the first input is considered; any further ones are ignored. If it
/// locates a file, that file is watched. Otherwise the first input itself
/// is watched provisionally, made absolute against the current directory.
///
/// # Errors
///
/// [`TailError::MissingTarget`] when `inputs` is empty, or
/// [`TailError::Runtime`] if the current directory cannot be determined.
pub fn resolve_target(inputs: &[String]) -> Result<WatchTarget, TailError> {
    let (first, ignored) = inputs.split_first().ok_or(TailError::MissingTarget)?;
    if !ignored.is_empty() {
        debug!(?ignored, "extra inputs ignored");
    }

    if let Some(path) = find_newest_match(Path::new(first)) {
        debug!(input = %first, path = %path.display(), "located watch target");
        return Ok(WatchTarget {
            path: absolute(&path)?,
            resolution: Resolution::Located,
        });
    }

    debug!(input = %first, "no match, waiting for creation");
    Ok(WatchTarget {
        path: absolute(Path::new(first))?,
        resolution: Resolution::Provisional,
    })
}

/// Return the most recently modified regular file matching `input`.
///
/// - If `input` is an existing directory, every file in it is a candidate.
/// - Otherwise the final component is a wildcard pattern evaluated inside
///   the parent directory (the current directory if there is none).
///
/// Returns `None` when the directory does not exist or nothing matches.
/// Among files with the same modification time the lexicographically
/// smallest name wins; files whose time cannot be read count as oldest.
pub fn find_newest_match(input: &Path) -> Option<PathBuf> {
    let (dir, pattern) = if input.is_dir() {
        (input.to_path_buf(), "*".to_string())
    } else {
        let dir = match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.is_dir() {
            return None;
        }
        let pattern = input.file_name()?.to_string_lossy().into_owned();
        (dir, pattern)
    };

    let matcher = wildcard_regex(&pattern).ok()?;

    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "could not list directory");
            return None;
        }
    };

    let mut candidates: Vec<(SystemTime, String, PathBuf)> = Vec::new();
    for entry_result in entries {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping directory entry");
                continue;
            }
        };

        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !matcher.is_match(&name) {
            continue;
        }
        candidates.push((file_modified_time(&path), name, path));
    }

    // Newest first, then by name.
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    candidates.into_iter().next().map(|(_, _, path)| path)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Compile a `*`/`?` wildcard into an anchored regex. Everything else is
/// literal.
fn wildcard_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    for c in pattern.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');

    RegexBuilder::new(&source)
        .case_insensitive(cfg!(windows))
        .build()
}

/// Get the modification time of a file, falling back to UNIX_EPOCH on error.
fn file_modified_time(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(UNIX_EPOCH)
}

/// Make `path` absolute without resolving symlinks, so a rotated symlink
/// keeps pointing the session at whatever the link names.
fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
