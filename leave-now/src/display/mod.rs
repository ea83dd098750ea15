//! Character display abstraction.
//!
//! The board is a four line text surface. Devices only need to clear the
//! screen and write a string to a given line; there is no cursor control
//! and no partial-line update.

mod console;

pub use console::{ConsoleDisplay, DEFAULT_COLUMNS};

/// Number of lines on the display.
pub const LINES: u8 = 4;

/// Errors from a display device.
#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    /// Writing to the device failed
    #[error("display I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A display line number (1-based). Only the four named lines exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Line(u8);

impl Line {
    pub const CLOCK: Line = Line(1);
    pub const UPDATED: Line = Line(2);
    pub const NORTH: Line = Line(3);
    pub const SOUTH: Line = Line(4);

    /// All lines, top to bottom.
    pub const ALL: [Line; 4] = [Line::CLOCK, Line::UPDATED, Line::NORTH, Line::SOUTH];

    /// Returns the 1-based line number.
    pub fn number(&self) -> u8 {
        self.0
    }
}

/// A four line character display.
///
/// Implementors provide hardware-specific output for displays like an
/// HD44780 LCD, a terminal, or a recording device for tests.
pub trait DisplayDevice {
    /// Clears the whole display.
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Writes `text` on `line`, replacing whatever was there.
    fn write_line(&mut self, text: &str, line: Line) -> Result<(), DisplayError>;
}

impl<D: DisplayDevice + ?Sized> DisplayDevice for Box<D> {
    fn clear(&mut self) -> Result<(), DisplayError> {
        (**self).clear()
    }

    fn write_line(&mut self, text: &str, line: Line) -> Result<(), DisplayError> {
        (**self).write_line(text, line)
    }
}
