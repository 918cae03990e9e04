//! Poll-based tail engine.
//!
//! The engine polls one path on a fixed interval. Each tick compares the
//! file's length with the recorded byte offset:
//!
//! | on disk            | status     | offset              |
//! |--------------------|------------|---------------------|
//! | absent             | `NotExist` | unchanged           |
//! | length == offset   | `Idle`     | unchanged           |
//! | length <  offset   | `Shrunk`   | reset to 0          |
//! | length >  offset   | `Idle`     | advanced past reads |
//!
//! New bytes are read in bounded chunks, decoded, and pushed through the
//! [`LineFilter`] into the sink. The file is opened and closed within the
//! tick, so no descriptor is held between ticks and log rotation is never
//! blocked. The file is identified by path only: a replaced file looks the
//! same as a truncated one.
//!
//! Read failures are transient. The tick is abandoned, the status becomes
//! `Unknown`, and the next tick starts over from a fresh length check.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::decode::Utf8Decoder;
use crate::error::TailError;
use crate::filter::{LineFilter, LineMatcher};
use crate::locator::Resolution;
use crate::notifier::StatusNotifier;
use crate::sink::LineSink;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Bytes read per chunk. Caps memory when a large delta arrives at once.
pub const DEFAULT_CHUNK_SIZE: usize = 512 * 1024;

/// Delay between two ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// File state
// ---------------------------------------------------------------------------

/// Outcome of the most recent tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileStatus {
    /// Nothing known yet, or the last tick failed.
    #[default]
    Unknown,
    /// The watched path does not exist.
    NotExist,
    /// The file got shorter than the offset; reading restarts at 0.
    Shrunk,
    /// Everything up to the current length has been forwarded.
    Idle,
}

/// Status plus byte offset, mutated only by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileState {
    pub status: FileStatus,
    pub offset: u64,
}

// ---------------------------------------------------------------------------
// File access
// ---------------------------------------------------------------------------

/// Opens the watched file for one tick's read.
pub trait FileOpener {
    type Reader: Read + Seek;

    fn open(&mut self, path: &Path) -> io::Result<Self::Reader>;
}

/// Opens the file on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskOpener;

impl FileOpener for DiskOpener {
    type Reader = File;

    fn open(&mut self, path: &Path) -> io::Result<File> {
        File::open(path)
    }
}

// ---------------------------------------------------------------------------
// TailEngine
// ---------------------------------------------------------------------------

/// Single-file tail state machine.
///
/// Generic over the notifier and the sink so the color/no-color choice is
/// made once, at construction.
#[derive(Debug)]
pub struct TailEngine<N, S, O = DiskOpener> {
    target: PathBuf,
    state: FileState,
    decoder: Utf8Decoder,
    filter: LineFilter,
    notifier: N,
    sink: S,
    opener: O,
    chunk_size: usize,
}

impl<N: StatusNotifier, S: LineSink> TailEngine<N, S> {
    pub fn new(target: PathBuf, matcher: LineMatcher, notifier: N, sink: S) -> Self {
        Self {
            target,
            state: FileState::default(),
            decoder: Utf8Decoder::new(),
            filter: LineFilter::new(matcher),
            notifier,
            sink,
            opener: DiskOpener,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl<N: StatusNotifier, S: LineSink, O: FileOpener> TailEngine<N, S, O> {
    /// Override the read chunk size (at least one byte).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Replace how the file is opened for reading.
    pub fn with_opener<P: FileOpener>(self, opener: P) -> TailEngine<N, S, P> {
        TailEngine {
            target: self.target,
            state: self.state,
            decoder: self.decoder,
            filter: self.filter,
            notifier: self.notifier,
            sink: self.sink,
            opener,
            chunk_size: self.chunk_size,
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn state(&self) -> FileState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// The unterminated fragment held by the line filter.
    pub fn pending_line(&self) -> &str {
        self.filter.carry_over()
    }

    /// Announce the session through the notifier.
    pub fn announce(&mut self, resolution: Resolution) {
        self.notifier
            .on_start(&self.target, resolution == Resolution::Provisional);
    }

    /// Cancellation cleanup.
    pub fn finish(&mut self) {
        self.notifier.on_done();
    }

    /// Run one poll cycle and return the resulting status.
    ///
    /// The notifier is called only when the status changed since the
    /// previous tick and the new status is `NotExist` or `Shrunk`.
    ///
    /// # Errors
    ///
    /// Only [`TailError::Sink`]: the output went away. Read failures are
    /// handled here and turn the status into `Unknown`.
    pub fn tick(&mut self) -> Result<FileStatus, TailError> {
        let previous = self.state.status;

        let status = match self.advance() {
            Ok(status) => status,
            Err(err @ TailError::Sink(_)) => return Err(err),
            Err(err) => {
                warn!(error = %err, offset = self.state.offset, "tick abandoned");
                FileStatus::Unknown
            }
        };
        self.state.status = status;

        if status != previous {
            debug!(?previous, ?status, offset = self.state.offset, "status changed");
            match status {
                FileStatus::NotExist => self.notifier.on_missing(&self.target),
                FileStatus::Shrunk => self.notifier.on_restart(&self.target),
                FileStatus::Unknown | FileStatus::Idle => {}
            }
        }

        Ok(status)
    }

    /// Compare length and offset, reading the growth if there is any.
    fn advance(&mut self) -> Result<FileStatus, TailError> {
        let len = match std::fs::metadata(&self.target) {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => return Ok(FileStatus::NotExist),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(FileStatus::NotExist),
            Err(e) => return Err(self.read_error(e)),
        };

        match len.cmp(&self.state.offset) {
            std::cmp::Ordering::Equal => Ok(FileStatus::Idle),
            std::cmp::Ordering::Less => {
                debug!(len, offset = self.state.offset, "file shrank, restarting");
                self.state.offset = 0;
                self.decoder.reset();
                self.filter.reset();
                Ok(FileStatus::Shrunk)
            }
            std::cmp::Ordering::Greater => {
                self.forward(len)?;
                Ok(FileStatus::Idle)
            }
        }
    }

    /// Forward bytes `[offset, len)` through the decoder and filter.
    ///
    /// The offset advances after every chunk, so a failure part way through
    /// never causes already-forwarded bytes to be sent again. The file handle
    /// is dropped on every return path.
    fn forward(&mut self, len: u64) -> Result<(), TailError> {
        let start = self.state.offset;
        let mut file = self
            .opener
            .open(&self.target)
            .map_err(|e| self.read_error(e))?;
        file.seek(SeekFrom::Start(start))
            .map_err(|e| self.read_error(e))?;

        let mut remaining = len - start;
        let capacity = usize::try_from(remaining)
            .unwrap_or(usize::MAX)
            .min(self.chunk_size);
        let mut buf = vec![0u8; capacity];
        let mut emitted = 0;

        while remaining > 0 {
            let want = usize::try_from(remaining)
                .unwrap_or(usize::MAX)
                .min(buf.len());
            let n = match file.read(&mut buf[..want]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.read_error(e)),
            };

            let text = self.decoder.decode(&buf[..n]);
            emitted += self
                .filter
                .write(&text, &mut self.sink)
                .map_err(TailError::Sink)?;

            self.state.offset += n as u64;
            remaining -= n as u64;
        }

        self.sink.flush().map_err(TailError::Sink)?;

        trace!(
            from = start,
            to = self.state.offset,
            len,
            emitted,
            "forwarded growth"
        );
        Ok(())
    }

    fn read_error(&self, source: io::Error) -> TailError {
        TailError::TransientRead {
            path: self.target.clone(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Poll loop
// ---------------------------------------------------------------------------

/// Drive `engine` until `shutdown` is set.
///
/// Each iteration runs one full tick, then samples `shutdown`, then sleeps
/// for `interval`. Cancellation is therefore only observed between ticks.
/// The notifier gets its cleanup call on every exit, including a sink error.
///
/// # Errors
///
/// Returns the sink error that ended the session, if any.
pub async fn run_loop<N, S, O>(
    engine: &mut TailEngine<N, S, O>,
    interval: Duration,
    shutdown: &AtomicBool,
) -> Result<(), TailError>
where
    N: StatusNotifier,
    S: LineSink,
    O: FileOpener,
{
    loop {
        if let Err(err) = engine.tick() {
            debug!(error = %err, "session ended by output failure");
            engine.finish();
            return Err(err);
        }

        if shutdown.load(Ordering::SeqCst) {
            debug!("shutdown requested");
            engine.finish();
            return Ok(());
        }

        tokio::time::sleep(interval).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::TempDir;

    use crate::filter::{FilterSpec, MAX_CARRY_OVER};

    // -- Helpers ------------------------------------------------------------

    /// Notifier that records the calls it receives.
    #[derive(Debug, Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl StatusNotifier for Recorder {
        fn on_start(&mut self, _path: &Path, provisional: bool) {
            self.events.push(format!("start provisional={}", provisional));
        }
        fn on_missing(&mut self, _path: &Path) {
            self.events.push("missing".to_string());
        }
        fn on_restart(&mut self, _path: &Path) {
            self.events.push("restart".to_string());
        }
        fn on_done(&mut self) {
            self.events.push("done".to_string());
        }
    }

    type TestEngine = TailEngine<Recorder, Vec<String>>;

    fn engine_for(path: &Path) -> TestEngine {
        TailEngine::new(
            path.to_path_buf(),
            LineMatcher::accept_all(),
            Recorder::default(),
            Vec::new(),
        )
    }

    fn append(path: &Path, content: &[u8]) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(content).unwrap();
    }

    fn events(engine: &TestEngine) -> Vec<&str> {
        engine.notifier().events.iter().map(String::as_str).collect()
    }

    // -- State table ----------------------------------------------------------

    #[rstest]
    #[case::equal(10, 10, FileStatus::Idle, 10, 0)]
    #[case::shrunk(10, 5, FileStatus::Shrunk, 0, 0)]
    #[case::grew(4, 10, FileStatus::Idle, 10, 6)]
    #[case::grew_from_zero(0, 10, FileStatus::Idle, 10, 10)]
    fn test_offset_vs_length(
        #[case] offset: u64,
        #[case] len: usize,
        #[case] expected_status: FileStatus,
        #[case] expected_offset: u64,
        #[case] expected_bytes: usize,
    ) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("t.log");
        std::fs::write(&path, vec![b'x'; len]).unwrap();

        let mut engine = engine_for(&path);
        engine.state.offset = offset;
        engine.state.status = FileStatus::Idle;

        assert_eq!(engine.tick().unwrap(), expected_status);
        assert_eq!(engine.state().offset, expected_offset);
        // no terminator in the file, so forwarded bytes sit in the carry-over
        assert_eq!(engine.pending_line().len(), expected_bytes);
        assert!(engine.sink().is_empty());
    }

    // -- Growth ---------------------------------------------------------------

    #[test]
    fn test_growth_forwarded_exactly_once() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("grow.log");
        append(&path, b"one\n");

        let mut engine = engine_for(&path);
        assert_eq!(engine.tick().unwrap(), FileStatus::Idle);
        append(&path, b"two\nthree\n");
        assert_eq!(engine.tick().unwrap(), FileStatus::Idle);

        assert_eq!(engine.sink(), &vec!["one", "two", "three"]);
        assert_eq!(engine.state().offset, 14);
    }

    #[test]
    fn test_unchanged_file_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("same.log");
        append(&path, b"hello\n");

        let mut engine = engine_for(&path);
        assert_eq!(engine.tick().unwrap(), FileStatus::Idle);
        assert_eq!(engine.sink().len(), 1);

        assert_eq!(engine.tick().unwrap(), FileStatus::Idle);
        assert_eq!(engine.sink().len(), 1);
        assert_eq!(engine.state().offset, 6);
        assert!(events(&engine).is_empty());
    }

    #[test]
    fn test_partial_line_completed_on_later_tick() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("partial.log");
        append(&path, b"abc");

        let mut engine = engine_for(&path);
        engine.tick().unwrap();
        assert!(engine.sink().is_empty());
        assert_eq!(engine.pending_line(), "abc");
        assert_eq!(engine.state().offset, 3);

        append(&path, b"def\nghi");
        engine.tick().unwrap();
        assert_eq!(engine.sink(), &vec!["abcdef"]);
        assert_eq!(engine.pending_line(), "ghi");
    }

    #[test]
    fn test_large_delta_read_in_chunks() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("big.log");
        let mut content = Vec::new();
        for i in 0..100 {
            content.extend_from_slice(format!("line {:03}\n", i).as_bytes());
        }
        append(&path, &content);

        let mut engine = engine_for(&path).with_chunk_size(7);
        assert_eq!(engine.tick().unwrap(), FileStatus::Idle);

        assert_eq!(engine.sink().len(), 100);
        assert_eq!(engine.sink()[0], "line 000");
        assert_eq!(engine.sink()[99], "line 099");
        assert_eq!(engine.state().offset, content.len() as u64);
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tiny.log");
        append(&path, b"ab\n");

        let mut engine = engine_for(&path).with_chunk_size(0);
        engine.tick().unwrap();
        assert_eq!(engine.sink(), &vec!["ab"]);
    }

    /// A character split by the chunk boundary, and again by the tick
    /// boundary, comes out whole: the decoder holds back the incomplete
    /// bytes until the rest arrive.
    #[test]
    fn test_multibyte_character_split_across_chunks_and_ticks() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("utf8.log");
        // "é" = C3 A9, "🦀" = F0 9F A6 80
        append(&path, b"caf\xC3\xA9 \xF0\x9F");

        let mut engine = engine_for(&path).with_chunk_size(4);
        engine.tick().unwrap();
        assert_eq!(engine.pending_line(), "café ");
        // offset counts bytes consumed, including the held-back ones
        assert_eq!(engine.state().offset, 8);

        append(&path, b"\xA6\x80\n");
        engine.tick().unwrap();
        assert_eq!(engine.sink(), &vec!["café 🦀"]);
    }

    #[test]
    fn test_filter_applied_to_forwarded_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("filtered.log");
        append(&path, b"INFO ok\nerror: x\nOK\n");

        let matcher = FilterSpec {
            pattern: "ERROR".to_string(),
            is_regex: false,
            case_insensitive: true,
            invert: false,
        }
        .compile()
        .unwrap();
        let mut engine = TailEngine::new(path.clone(), matcher, Recorder::default(), Vec::new());
        engine.tick().unwrap();

        assert_eq!(engine.sink(), &vec!["error: x"]);
        assert_eq!(engine.state().offset, 20);
    }

    // -- Missing / created ----------------------------------------------------

    #[test]
    fn test_missing_then_created() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("later.log");

        let mut engine = engine_for(&path);
        assert_eq!(engine.tick().unwrap(), FileStatus::NotExist);
        assert_eq!(engine.tick().unwrap(), FileStatus::NotExist);
        assert_eq!(events(&engine), vec!["missing"]);

        append(&path, b"hello\n");
        assert_eq!(engine.tick().unwrap(), FileStatus::Idle);
        assert_eq!(engine.sink(), &vec!["hello"]);
        assert_eq!(events(&engine), vec!["missing"]);
    }

    #[test]
    fn test_deleted_file_keeps_offset() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gone.log");
        append(&path, b"12345\n");

        let mut engine = engine_for(&path);
        engine.tick().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(engine.tick().unwrap(), FileStatus::NotExist);
        assert_eq!(engine.state().offset, 6);
    }

    #[test]
    fn test_directory_at_path_counts_as_missing() {
        let tmp = TempDir::new().unwrap();
        let mut engine = engine_for(tmp.path());
        assert_eq!(engine.tick().unwrap(), FileStatus::NotExist);
    }

    // -- Shrink ---------------------------------------------------------------

    #[test]
    fn test_shrink_reported_once_then_reread() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("shrink.log");
        std::fs::write(&path, b"123456789\n").unwrap();

        let mut engine = engine_for(&path);
        engine.tick().unwrap();
        assert_eq!(engine.state().offset, 10);

        std::fs::write(&path, b"abcd\n").unwrap();
        assert_eq!(engine.tick().unwrap(), FileStatus::Shrunk);
        assert_eq!(engine.state().offset, 0);
        assert_eq!(events(&engine), vec!["restart"]);

        assert_eq!(engine.tick().unwrap(), FileStatus::Idle);
        assert_eq!(engine.sink(), &vec!["123456789", "abcd"]);
        assert_eq!(engine.state().offset, 5);
        assert_eq!(events(&engine), vec!["restart"]);
    }

    #[test]
    fn test_shrink_to_empty_goes_idle_without_reading() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.log");
        std::fs::write(&path, b"data\n").unwrap();

        let mut engine = engine_for(&path);
        engine.tick().unwrap();
        std::fs::write(&path, b"").unwrap();

        assert_eq!(engine.tick().unwrap(), FileStatus::Shrunk);
        assert_eq!(engine.tick().unwrap(), FileStatus::Idle);
        assert_eq!(engine.state().offset, 0);
    }

    #[test]
    fn test_shrink_discards_carry_over() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("carry.log");
        std::fs::write(&path, b"done\nhalf a li").unwrap();

        let mut engine = engine_for(&path);
        engine.tick().unwrap();
        assert_eq!(engine.pending_line(), "half a li");

        std::fs::write(&path, b"new\n").unwrap();
        engine.tick().unwrap();
        assert_eq!(engine.pending_line(), "");
        engine.tick().unwrap();
        assert_eq!(engine.sink(), &vec!["done", "new"]);
    }

    #[test]
    fn test_repeated_shrinks_notify_each_edge() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rotate.log");
        std::fs::write(&path, b"aaaaaa\n").unwrap();

        let mut engine = engine_for(&path);
        engine.tick().unwrap();
        std::fs::write(&path, b"bb\n").unwrap();
        engine.tick().unwrap(); // Shrunk
        engine.tick().unwrap(); // Idle, reads "bb"
        std::fs::write(&path, b"c\n").unwrap();
        engine.tick().unwrap(); // Shrunk again

        assert_eq!(events(&engine), vec!["restart", "restart"]);
    }

    // -- Transient errors -----------------------------------------------------

    #[cfg(unix)]
    #[test]
    fn test_stat_failure_is_transient() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plain.log");
        append(&file, b"x\n");
        // a path *through* a regular file fails with ENOTDIR, not NotFound
        let path = file.join("child.log");

        let mut engine = engine_for(&path);
        assert_eq!(engine.tick().unwrap(), FileStatus::Unknown);
        assert_eq!(engine.tick().unwrap(), FileStatus::Unknown);
        assert_eq!(engine.state().offset, 0);
        assert!(events(&engine).is_empty());
    }

    /// Opener whose reader fails once `budget` bytes have been read. Only
    /// the first opened reader is limited.
    struct FailingOpener {
        budget: Option<usize>,
    }

    struct LimitedReader {
        file: File,
        budget: Option<usize>,
    }

    impl Read for LimitedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.budget {
                Some(0) => Err(io::Error::new(io::ErrorKind::Other, "device went away")),
                Some(left) => {
                    let take = left.min(buf.len());
                    let n = self.file.read(&mut buf[..take])?;
                    self.budget = Some(left - n);
                    Ok(n)
                }
                None => self.file.read(buf),
            }
        }
    }

    impl Seek for LimitedReader {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.file.seek(pos)
        }
    }

    impl FileOpener for FailingOpener {
        type Reader = LimitedReader;

        fn open(&mut self, path: &Path) -> io::Result<LimitedReader> {
            Ok(LimitedReader {
                file: File::open(path)?,
                budget: self.budget.take(),
            })
        }
    }

    #[test]
    fn test_read_failure_mid_tick_keeps_forwarded_chunks() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("flaky.log");
        append(&path, b"aaa\nbbb\nccc\n");

        let mut engine = engine_for(&path)
            .with_chunk_size(4)
            .with_opener(FailingOpener { budget: Some(8) });

        assert_eq!(engine.tick().unwrap(), FileStatus::Unknown);
        assert_eq!(engine.state().offset, 8);
        assert_eq!(engine.sink(), &vec!["aaa", "bbb"]);
        assert!(engine.notifier().events.is_empty());

        // the retry picks up at the chunk boundary, nothing is sent twice
        assert_eq!(engine.tick().unwrap(), FileStatus::Idle);
        assert_eq!(engine.state().offset, 12);
        assert_eq!(engine.sink(), &vec!["aaa", "bbb", "ccc"]);
    }

    // -- Carry-over cap -------------------------------------------------------

    #[test]
    fn test_file_without_line_breaks_stays_bounded() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("noeol.log");
        let size = MAX_CARRY_OVER + 3 * DEFAULT_CHUNK_SIZE;
        std::fs::write(&path, vec![b'x'; size]).unwrap();

        let mut engine = engine_for(&path);
        assert_eq!(engine.tick().unwrap(), FileStatus::Idle);
        assert_eq!(engine.state().offset, size as u64);
        assert!(engine.pending_line().len() <= MAX_CARRY_OVER);
        assert!(engine.sink().is_empty());
    }

    // -- Sink errors ----------------------------------------------------------

    struct BrokenSink;

    impl LineSink for BrokenSink {
        fn emit(&mut self, _line: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_sink_failure_ends_session() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pipe.log");
        append(&path, b"line\n");

        let mut engine = TailEngine::new(
            path.clone(),
            LineMatcher::accept_all(),
            Recorder::default(),
            BrokenSink,
        );
        let err = engine.tick().unwrap_err();
        assert!(err.is_broken_pipe());
    }

    // -- Lifecycle ------------------------------------------------------------

    #[test]
    fn test_announce_and_finish_reach_notifier() {
        let tmp = TempDir::new().unwrap();
        let mut engine = engine_for(&tmp.path().join("x.log"));
        engine.announce(Resolution::Provisional);
        engine.finish();
        assert_eq!(events(&engine), vec!["start provisional=true", "done"]);
    }

    #[tokio::test]
    async fn test_run_loop_cleans_up_after_sink_failure() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("closed.log");
        append(&path, b"line\n");

        let mut engine = TailEngine::new(
            path.clone(),
            LineMatcher::accept_all(),
            Recorder::default(),
            BrokenSink,
        );
        let shutdown = AtomicBool::new(false);
        let err = run_loop(&mut engine, Duration::from_millis(1), &shutdown)
            .await
            .unwrap_err();

        assert!(err.is_broken_pipe());
        assert_eq!(engine.notifier().events, vec!["done"]);
    }

    #[tokio::test]
    async fn test_run_loop_stops_at_tick_boundary() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("loop.log");
        append(&path, b"only\n");

        let mut engine = engine_for(&path);
        let shutdown = AtomicBool::new(true);
        run_loop(&mut engine, Duration::from_millis(1), &shutdown)
            .await
            .unwrap();

        // one full tick ran before the flag was sampled
        assert_eq!(engine.sink(), &vec!["only"]);
        assert_eq!(events(&engine), vec!["done"]);
    }
}
