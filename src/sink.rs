//! Destinations for lines that pass the filter.

use std::io::{self, Write};

/// Receives complete, accepted lines (without terminators).
pub trait LineSink {
    fn emit(&mut self, line: &str) -> io::Result<()>;

    /// Called once per tick after all lines of that tick were emitted.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes each line followed by `\n` to an underlying writer.
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    out: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> LineSink for WriterSink<W> {
    fn emit(&mut self, line: &str) -> io::Result<()> {
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Collects lines in memory.
impl LineSink for Vec<String> {
    fn emit(&mut self, line: &str) -> io::Result<()> {
        self.push(line.to_string());
        Ok(())
    }
}
