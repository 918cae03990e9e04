//! Line filter for tailed text.
//!
//! Text arrives in arbitrary pieces: a read can stop in the middle of a
//! line, and the rest of that line shows up on a later tick. [`LineFilter`]
//! keeps the unterminated fragment as carry-over and only hands a line to
//! the predicate once its terminator has been seen.
//!
//! The predicate itself is described by a [`FilterSpec`]:
//!
//! 1. **Substring** (`--filter`): the text is regex-escaped and must occur
//!    anywhere in the line.
//! 2. **Regex** (`--filter-regex`): the pattern is used as-is and must match
//!    anywhere in the line.
//!
//! Both honor case-insensitivity (`--i`) and inversion (`--v`). An empty
//! pattern accepts every line.

use std::io;

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::error::TailError;
use crate::sink::LineSink;

const TERMINATORS: [char; 2] = ['\r', '\n'];

/// Largest unterminated fragment kept between writes (10 MiB). A longer
/// fragment is discarded so a file without line breaks cannot grow memory
/// without bound.
pub const MAX_CARRY_OVER: usize = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// FilterSpec
// ---------------------------------------------------------------------------

/// Immutable description of which lines to keep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    /// Substring or regex; empty disables filtering.
    pub pattern: String,
    /// When true, `pattern` is a regular expression.
    pub is_regex: bool,
    pub case_insensitive: bool,
    /// When true, keep the lines that do *not* match.
    pub invert: bool,
}

impl FilterSpec {
    /// Returns `true` if the spec filters anything at all.
    pub fn is_active(&self) -> bool {
        !self.pattern.is_empty()
    }

    /// Compile the spec into a predicate.
    ///
    /// # Errors
    ///
    /// Returns [`TailError::Pattern`] when a regex pattern is invalid.
    /// Substring patterns are escaped first and always compile.
    pub fn compile(&self) -> Result<LineMatcher, TailError> {
        if !self.is_active() {
            return Ok(LineMatcher::accept_all());
        }

        let source = if self.is_regex {
            self.pattern.clone()
        } else {
            regex::escape(&self.pattern)
        };

        let regex = RegexBuilder::new(&source)
            .case_insensitive(self.case_insensitive)
            .build()
            .map_err(|source| TailError::Pattern {
                pattern: self.pattern.clone(),
                source,
            })?;

        Ok(LineMatcher {
            regex: Some(regex),
            invert: self.invert,
        })
    }

    /// Format the active filter for the startup banner.
    ///
    /// Returns `None` if no filter is active, otherwise e.g.
    /// `[filter: "ERROR"]` or `[filter: regex "^warn", ignore case, inverted]`.
    pub fn display(&self) -> Option<String> {
        if !self.is_active() {
            return None;
        }

        let mut parts: Vec<String> = Vec::new();
        if self.is_regex {
            parts.push(format!("regex {:?}", self.pattern));
        } else {
            parts.push(format!("{:?}", self.pattern));
        }
        if self.case_insensitive {
            parts.push("ignore case".to_string());
        }
        if self.invert {
            parts.push("inverted".to_string());
        }

        Some(format!("[filter: {}]", parts.join(", ")))
    }
}

// ---------------------------------------------------------------------------
// LineMatcher
// ---------------------------------------------------------------------------

/// Compiled predicate over a single line of text.
#[derive(Debug, Clone)]
pub struct LineMatcher {
    regex: Option<Regex>,
    invert: bool,
}

impl LineMatcher {
    /// A matcher that keeps every line.
    pub fn accept_all() -> Self {
        Self {
            regex: None,
            invert: false,
        }
    }

    /// `(pattern found in line) XOR invert`; always `true` without a pattern.
    ///
    /// A match anywhere in the line is the same as `^.*pattern.*$`, and the
    /// inverted case is the negation of that, i.e. `^(?!.*pattern).*$`.
    pub fn accepts(&self, line: &str) -> bool {
        match &self.regex {
            None => true,
            Some(regex) => regex.is_match(line) != self.invert,
        }
    }
}

// ---------------------------------------------------------------------------
// LineFilter
// ---------------------------------------------------------------------------

/// Splits streamed text into lines and forwards the accepted ones.
#[derive(Debug)]
pub struct LineFilter {
    matcher: LineMatcher,
    carry_over: String,
    max_carry_over: usize,
}

impl LineFilter {
    pub fn new(matcher: LineMatcher) -> Self {
        Self {
            matcher,
            carry_over: String::new(),
            max_carry_over: MAX_CARRY_OVER,
        }
    }

    /// Override the carry-over cap.
    pub fn with_max_carry_over(mut self, max: usize) -> Self {
        self.max_carry_over = max;
        self
    }

    /// Feed a piece of text. Every line completed by `chunk` is tested and,
    /// if accepted, emitted to `sink`. Returns the number of emitted lines.
    ///
    /// Runs of `\r`/`\n` count as one terminator, so no empty lines are
    /// produced. Text after the last terminator is kept for the next call,
    /// unless it exceeds the carry-over cap, in which case it is dropped.
    pub fn write<S>(&mut self, chunk: &str, sink: &mut S) -> io::Result<usize>
    where
        S: LineSink + ?Sized,
    {
        // The carry-over never holds a terminator, so only the new text
        // needs searching.
        let searched_from = self.carry_over.len();
        self.carry_over.push_str(chunk);

        let found = self.carry_over[searched_from..].rfind(TERMINATORS);
        let Some(last) = found.map(|i| i + searched_from) else {
            self.enforce_cap();
            return Ok(0);
        };

        // Both terminators are one byte wide.
        let rest = self.carry_over.split_off(last + 1);
        let complete = std::mem::replace(&mut self.carry_over, rest);

        let mut emitted = 0;
        for line in complete.split(TERMINATORS).filter(|l| !l.is_empty()) {
            if self.matcher.accepts(line) {
                sink.emit(line)?;
                emitted += 1;
            }
        }
        self.enforce_cap();
        Ok(emitted)
    }

    fn enforce_cap(&mut self) {
        if self.carry_over.len() > self.max_carry_over {
            warn!(
                bytes = self.carry_over.len(),
                limit = self.max_carry_over,
                "discarding oversized unterminated line"
            );
            self.carry_over.clear();
        }
    }

    /// The unterminated fragment waiting for the rest of its line.
    pub fn carry_over(&self) -> &str {
        &self.carry_over
    }

    /// Forget the carry-over, e.g. after the file was truncated.
    pub fn reset(&mut self) {
        self.carry_over.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
