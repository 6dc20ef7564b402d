// SPDX-License-Identifier: MIT
//
// The terminal seam.
//
// Everything above this module (windows, the screen driver, menus) talks
// to the physical terminal only through the `Backend` trait. Two
// implementations exist:
//
//   TtyBackend (terminal.rs): the real thing. termios raw mode, ANSI
//   output, poll-based reads.
//
//   TestBackend (here): an in-memory terminal. It keeps the cells it was
//   sent, replays scripted input, and counts calls, so the whole stack can
//   be exercised without a tty.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use serde::Deserialize;

use crate::buffer::FrameBuffer;
use crate::cell::Cell;
use crate::color::ColorPair;

// ─── Size ────────────────────────────────────────────────────────────────────

/// Terminal dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

impl Size {
    #[inline]
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Whether either dimension is zero.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.cols == 0 || self.rows == 0
    }
}

// ─── Capabilities ────────────────────────────────────────────────────────────

/// What a terminal can do, as far as this library cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Number of distinct colors; 0 for a monochrome terminal.
    pub colors: u16,
    /// Number of color pair slots, pair 0 included.
    pub color_pairs: u16,
    /// Whether the cursor can be hidden or emphasized.
    pub cursor_visibility: bool,
    /// Whether function and cursor keys can be decoded.
    pub keypad: bool,
}

impl Capabilities {
    /// A terminal with no color support.
    pub const MONOCHROME: Self = Self {
        colors: 0,
        color_pairs: 0,
        cursor_visibility: true,
        keypad: true,
    };

    /// The eight standard colors with the classic 64 pair slots.
    pub const ANSI: Self = Self {
        colors: 8,
        color_pairs: 64,
        cursor_visibility: true,
        keypad: true,
    };

    #[inline]
    #[must_use]
    pub const fn has_colors(&self) -> bool {
        self.colors > 0 && self.color_pairs > 1
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::ANSI
    }
}

// ─── Cursor Visibility ───────────────────────────────────────────────────────

/// How the hardware cursor is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CursorVisibility {
    Hidden,
    #[default]
    Normal,
    /// A more conspicuous cursor (steady block).
    HighVisibility,
}

// ─── Backend ─────────────────────────────────────────────────────────────────

/// A physical terminal.
///
/// Methods mirror what a curses screen needs and nothing more. Errors are
/// plain `io::Error`; the session wraps them in [`Error::Driver`].
///
/// [`Error::Driver`]: crate::error::Error::Driver
pub trait Backend {
    /// Feature set, fixed for the life of the backend.
    fn capabilities(&self) -> Capabilities;

    /// Current size in cells.
    fn size(&self) -> io::Result<Size>;

    /// Enter managed mode: raw input, optional alternate screen.
    fn enter(&mut self, alternate_screen: bool) -> io::Result<()>;

    /// Restore the terminal to how `enter` found it. Idempotent.
    fn leave(&mut self) -> io::Result<()>;

    /// Line buffering off (`true`) or on (`false`).
    fn set_cbreak(&mut self, on: bool) -> io::Result<()>;

    fn set_cursor_visibility(&mut self, visibility: CursorVisibility) -> io::Result<()>;

    /// Application keypad mode on or off.
    fn set_keypad(&mut self, on: bool) -> io::Result<()>;

    /// Blank the whole physical screen.
    fn clear(&mut self) -> io::Result<()>;

    /// Draw one cell at `(x, y)` with already-resolved colors.
    fn put_cell(&mut self, x: u16, y: u16, cell: &Cell, colors: ColorPair) -> io::Result<()>;

    /// Park the hardware cursor.
    fn move_cursor(&mut self, x: u16, y: u16) -> io::Result<()>;

    /// Push pending output to the terminal.
    fn flush(&mut self) -> io::Result<()>;

    /// Read available input bytes into `buf`.
    ///
    /// `None` blocks until input arrives. `Some(d)` waits at most `d`;
    /// `Ok(0)` means the wait expired with nothing to read.
    fn read(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> io::Result<usize>;
}

impl<B: Backend + ?Sized> Backend for &mut B {
    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn size(&self) -> io::Result<Size> {
        (**self).size()
    }

    fn enter(&mut self, alternate_screen: bool) -> io::Result<()> {
        (**self).enter(alternate_screen)
    }

    fn leave(&mut self) -> io::Result<()> {
        (**self).leave()
    }

    fn set_cbreak(&mut self, on: bool) -> io::Result<()> {
        (**self).set_cbreak(on)
    }

    fn set_cursor_visibility(&mut self, visibility: CursorVisibility) -> io::Result<()> {
        (**self).set_cursor_visibility(visibility)
    }

    fn set_keypad(&mut self, on: bool) -> io::Result<()> {
        (**self).set_keypad(on)
    }

    fn clear(&mut self) -> io::Result<()> {
        (**self).clear()
    }

    fn put_cell(&mut self, x: u16, y: u16, cell: &Cell, colors: ColorPair) -> io::Result<()> {
        (**self).put_cell(x, y, cell, colors)
    }

    fn move_cursor(&mut self, x: u16, y: u16) -> io::Result<()> {
        (**self).move_cursor(x, y)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn read(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> io::Result<usize> {
        (**self).read(buf, timeout)
    }
}

// ─── TestBackend ─────────────────────────────────────────────────────────────

/// In-memory terminal for tests and headless use.
///
/// ```
/// use k_term::backend::{Backend, TestBackend};
/// use k_term::cell::Cell;
/// use k_term::color::ColorPair;
///
/// let mut term = TestBackend::new(10, 2);
/// term.put_cell(3, 1, &Cell::new('x'), ColorPair::DEFAULT).unwrap();
/// assert_eq!(term.row_text(1), "   x      ");
/// ```
#[derive(Debug)]
pub struct TestBackend {
    caps: Capabilities,
    size: Size,
    cells: FrameBuffer,
    colors: Vec<ColorPair>,
    cursor: (u16, u16),
    visibility: CursorVisibility,
    input: VecDeque<Vec<u8>>,
    entered: bool,
    alternate_screen: bool,
    cbreak: bool,
    keypad: bool,
    puts: usize,
    clears: usize,
    flushes: usize,
}

impl TestBackend {
    /// A `cols` x `rows` terminal with the eight ANSI colors.
    #[must_use]
    pub fn new(cols: u16, rows: u16) -> Self {
        let cells = usize::from(cols) * usize::from(rows);
        Self {
            caps: Capabilities::ANSI,
            size: Size::new(cols, rows),
            cells: FrameBuffer::new(cols, rows),
            colors: vec![ColorPair::DEFAULT; cells],
            cursor: (0, 0),
            visibility: CursorVisibility::Normal,
            input: VecDeque::new(),
            entered: false,
            alternate_screen: false,
            cbreak: false,
            keypad: false,
            puts: 0,
            clears: 0,
            flushes: 0,
        }
    }

    /// Replace the advertised capabilities.
    #[must_use]
    pub fn with_capabilities(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    /// Queue one chunk of input. Each chunk is returned by a single `read`,
    /// the way a burst of bytes arrives from a real tty.
    pub fn push_input(&mut self, bytes: impl Into<Vec<u8>>) {
        self.input.push_back(bytes.into());
    }

    /// Simulate a terminal resize. Content is kept where it overlaps.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.size = Size::new(cols, rows);
        self.cells.resize_preserving(cols, rows, Cell::BLANK);
        self.colors = vec![ColorPair::DEFAULT; usize::from(cols) * usize::from(rows)];
    }

    // ── Inspection ──────────────────────────────────────────────────────

    /// The cell last drawn at `(x, y)`.
    #[must_use]
    pub fn cell(&self, x: u16, y: u16) -> Option<Cell> {
        self.cells.get(x, y).copied()
    }

    /// The colors the cell at `(x, y)` was drawn with.
    #[must_use]
    pub fn colors_at(&self, x: u16, y: u16) -> Option<ColorPair> {
        if !self.cells.in_bounds(x, y) {
            return None;
        }
        let idx = usize::from(y) * usize::from(self.size.cols) + usize::from(x);
        self.colors.get(idx).copied()
    }

    /// Row `y` as text.
    #[must_use]
    pub fn row_text(&self, y: u16) -> String {
        self.cells.row_text(y)
    }

    /// Every row as text, for whole-screen assertions.
    #[must_use]
    pub fn screen_text(&self) -> Vec<String> {
        (0..self.size.rows).map(|y| self.row_text(y)).collect()
    }

    #[must_use]
    pub const fn cursor(&self) -> (u16, u16) {
        self.cursor
    }

    #[must_use]
    pub const fn cursor_visibility(&self) -> CursorVisibility {
        self.visibility
    }

    /// Whether the backend is in managed mode.
    #[must_use]
    pub const fn entered(&self) -> bool {
        self.entered
    }

    #[must_use]
    pub const fn alternate_screen(&self) -> bool {
        self.alternate_screen
    }

    #[must_use]
    pub const fn cbreak(&self) -> bool {
        self.cbreak
    }

    #[must_use]
    pub const fn keypad(&self) -> bool {
        self.keypad
    }

    /// Number of `put_cell` calls so far.
    #[must_use]
    pub const fn puts(&self) -> usize {
        self.puts
    }

    #[must_use]
    pub const fn clears(&self) -> usize {
        self.clears
    }

    #[must_use]
    pub const fn flushes(&self) -> usize {
        self.flushes
    }

    /// Zero the call counters.
    pub const fn reset_counters(&mut self) {
        self.puts = 0;
        self.clears = 0;
        self.flushes = 0;
    }
}

impl Backend for TestBackend {
    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn size(&self) -> io::Result<Size> {
        Ok(self.size)
    }

    fn enter(&mut self, alternate_screen: bool) -> io::Result<()> {
        self.entered = true;
        self.alternate_screen = alternate_screen;
        Ok(())
    }

    fn leave(&mut self) -> io::Result<()> {
        self.entered = false;
        self.alternate_screen = false;
        Ok(())
    }

    fn set_cbreak(&mut self, on: bool) -> io::Result<()> {
        self.cbreak = on;
        Ok(())
    }

    fn set_cursor_visibility(&mut self, visibility: CursorVisibility) -> io::Result<()> {
        if !self.caps.cursor_visibility {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "cursor visibility not supported",
            ));
        }
        self.visibility = visibility;
        Ok(())
    }

    fn set_keypad(&mut self, on: bool) -> io::Result<()> {
        if !self.caps.keypad {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "keypad not supported"));
        }
        self.keypad = on;
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        self.cells.fill(Cell::BLANK);
        self.colors.fill(ColorPair::DEFAULT);
        self.clears += 1;
        Ok(())
    }

    fn put_cell(&mut self, x: u16, y: u16, cell: &Cell, colors: ColorPair) -> io::Result<()> {
        if !self.cells.set(x, y, *cell) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cell ({x}, {y}) outside {}x{}", self.size.cols, self.size.rows),
            ));
        }
        let idx = usize::from(y) * usize::from(self.size.cols) + usize::from(x);
        if let Some(slot) = self.colors.get_mut(idx) {
            *slot = colors;
        }
        self.puts += 1;
        Ok(())
    }

    fn move_cursor(&mut self, x: u16, y: u16) -> io::Result<()> {
        self.cursor = (x, y);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> io::Result<usize> {
        let Some(mut chunk) = self.input.pop_front() else {
            return match timeout {
                Some(_) => Ok(0),
                // Blocking on a script that ran dry would hang forever.
                None => Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "scripted input exhausted",
                )),
            };
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.input.push_front(chunk.split_off(n));
        }
        Ok(n)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
