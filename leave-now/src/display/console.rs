//! Text display that writes to any `io::Write`.

use std::io::Write;

use super::{DisplayDevice, DisplayError, LINES, Line};

/// Width of the 20x4 character LCD the board was designed for.
pub const DEFAULT_COLUMNS: usize = 20;

/// A display that prints its lines to a writer (stdout in the daemon).
///
/// Lines are buffered and the whole four-line frame is written once the
/// last line arrives, framed by a blank line so successive redraws read
/// like a stack of screens. Text is cut at `columns` characters, as a
/// fixed-width panel would.
pub struct ConsoleDisplay<W> {
    out: W,
    columns: usize,
    lines: [String; LINES as usize],
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W, columns: usize) -> Self {
        Self {
            out,
            columns,
            lines: Default::default(),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn flush_frame(&mut self) -> Result<(), DisplayError> {
        writeln!(self.out)?;
        for line in &self.lines {
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> DisplayDevice for ConsoleDisplay<W> {
    fn clear(&mut self) -> Result<(), DisplayError> {
        self.lines = Default::default();
        Ok(())
    }

    fn write_line(&mut self, text: &str, line: Line) -> Result<(), DisplayError> {
        let idx = usize::from(line.number() - 1);
        self.lines[idx] = text.chars().take(self.columns).collect();

        if line == Line::SOUTH {
            self.flush_frame()?;
        }
        Ok(())
    }
}
