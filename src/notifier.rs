//! Status notifications for the tail session.
//!
//! The watcher reports only two status edges: the watched file went
//! missing, or it shrank and is being re-read from the start. How those
//! are shown is up to the [`StatusNotifier`] chosen once at startup:
//!
//! - [`ColorNotifier`] sets the terminal title and prints status lines in an
//!   accent color derived from the title text, so each tailed file gets its
//!   own recognizable color.
//! - [`PlainNotifier`] prints the same messages without escape sequences
//!   (`--nocolors`, or stdout is not a terminal).
//!
//! Write errors are ignored: notifications are informational and the
//! session must keep running without them.

use std::io::Write;
use std::path::Path;

use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::SetTitle;
use crossterm::QueueableCommand;

// ---------------------------------------------------------------------------
// StatusNotifier
// ---------------------------------------------------------------------------

/// Display hooks invoked synchronously by the tail engine.
pub trait StatusNotifier {
    /// The session is about to start polling `path`. `provisional` is true
    /// when nothing matched and the literal path is being waited for.
    fn on_start(&mut self, path: &Path, provisional: bool);

    /// The watched file does not exist (edge-triggered).
    fn on_missing(&mut self, path: &Path);

    /// The watched file shrank and will be read from the beginning
    /// (edge-triggered).
    fn on_restart(&mut self, path: &Path);

    /// The session was cancelled; restore any display state.
    fn on_done(&mut self);
}

fn title_for(path: &Path) -> String {
    format!("Tailing file {}", path.display())
}

fn provisional_message(path: &Path) -> String {
    format!(
        "No valid folder, file name or file pattern in the command line. Waiting for {} to be created.",
        path.display()
    )
}

fn missing_message(path: &Path) -> String {
    format!("Waiting for {} to be created.", path.display())
}

fn restart_message(path: &Path) -> String {
    format!("Restarting {}.", path.display())
}

const DONE_MESSAGE: &str = "Done.";

// ---------------------------------------------------------------------------
// PlainNotifier
// ---------------------------------------------------------------------------

/// Notifier that writes bare text.
#[derive(Debug)]
pub struct PlainNotifier<W: Write> {
    out: W,
}

impl<W: Write> PlainNotifier<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn status_line(&mut self, text: &str) {
        let _ = write!(self.out, "\n{}\n", text);
        let _ = self.out.flush();
    }
}

impl<W: Write> StatusNotifier for PlainNotifier<W> {
    fn on_start(&mut self, path: &Path, provisional: bool) {
        if provisional {
            let _ = writeln!(self.out, "{}", provisional_message(path));
        }
        let _ = writeln!(self.out, "{}", title_for(path));
        let _ = self.out.flush();
    }

    fn on_missing(&mut self, path: &Path) {
        self.status_line(&missing_message(path));
    }

    fn on_restart(&mut self, path: &Path) {
        self.status_line(&restart_message(path));
    }

    fn on_done(&mut self) {
        self.status_line(DONE_MESSAGE);
    }
}

// ---------------------------------------------------------------------------
// Accent colors
// ---------------------------------------------------------------------------

/// Background/foreground pair used for highlighted status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accent {
    pub background: Color,
    pub foreground: Color,
}

impl Accent {
    /// Derive a stable color from `text`.
    ///
    /// The UTF-16LE bytes of the text are summed into three buckets by
    /// `index % 3`; each sum mod 256 is one RGB component of the
    /// background. The foreground is black on bright backgrounds and white
    /// on dark ones.
    pub fn infer_from_text(text: &str) -> Self {
        let mut sums = [0u32; 3];
        let bytes = text.encode_utf16().flat_map(u16::to_le_bytes);
        for (i, byte) in bytes.enumerate() {
            sums[i % 3] = sums[i % 3].wrapping_add(u32::from(byte));
        }
        let [r, g, b] = sums.map(|s| (s % 256) as u8);
        Self::from_rgb(r, g, b)
    }

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let mean = (u16::from(r) + u16::from(g) + u16::from(b)) / 3;
        let f = if mean >= 128 { 0 } else { 255 };
        Self {
            background: Color::Rgb { r, g, b },
            foreground: Color::Rgb { r: f, g: f, b: f },
        }
    }
}

// ---------------------------------------------------------------------------
// ColorNotifier
// ---------------------------------------------------------------------------

/// Notifier that highlights status lines and sets the terminal title.
#[derive(Debug)]
pub struct ColorNotifier<W: Write> {
    out: W,
    accent: Option<Accent>,
}

impl<W: Write> ColorNotifier<W> {
    pub fn new(out: W) -> Self {
        Self { out, accent: None }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// The accent in use; `None` until [`StatusNotifier::on_start`].
    pub fn accent(&self) -> Option<Accent> {
        self.accent
    }

    fn highlighted(&mut self, text: &str) {
        let accent = self.accent.unwrap_or(Accent::from_rgb(255, 255, 255));
        let _ = self
            .out
            .queue(SetBackgroundColor(accent.background))
            .and_then(|o| o.queue(SetForegroundColor(accent.foreground)))
            .and_then(|o| o.queue(Print(text)))
            .and_then(|o| o.queue(ResetColor))
            .and_then(|o| o.queue(Print("\n")));
        let _ = self.out.flush();
    }

    fn status_line(&mut self, text: &str) {
        let _ = self.out.write_all(b"\n");
        self.highlighted(text);
    }
}

impl<W: Write> StatusNotifier for ColorNotifier<W> {
    fn on_start(&mut self, path: &Path, provisional: bool) {
        let title = title_for(path);
        self.accent = Some(Accent::infer_from_text(&title));
        let _ = self.out.queue(SetTitle(&title));
        if provisional {
            self.highlighted(&provisional_message(path));
        }
        self.highlighted(&title);
    }

    fn on_missing(&mut self, path: &Path) {
        self.status_line(&missing_message(path));
    }

    fn on_restart(&mut self, path: &Path) {
        self.status_line(&restart_message(path));
    }

    fn on_done(&mut self) {
        self.status_line(DONE_MESSAGE);
        let _ = self.out.queue(ResetColor);
        let _ = self.out.flush();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
