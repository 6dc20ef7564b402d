// SPDX-License-Identifier: MIT
//
// Output buffering and stateful cell rendering for the tty backend.
//
//   OutputBuffer: collects all escape bytes for an update in memory so the
//   whole frame leaves in one write() call.
//
//   CellWriter: remembers what the terminal was last told (cursor position,
//   attributes, colors) and skips sequences that would change nothing. Two
//   adjacent cells with the same style cost one character each.

use std::io::{self, Write};

use crate::ansi;
use crate::cell::{Attr, Cell};
use crate::color::{Color, ColorPair};

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// Byte buffer that accumulates terminal output until the next flush.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 8_192;

impl OutputBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append a codepoint as UTF-8. Invalid codepoints and C0 controls
    /// become `?` so a stray byte can never act as a terminal command.
    pub fn write_codepoint(&mut self, cp: u32) {
        match char::from_u32(cp) {
            Some(ch) if !ch.is_control() => {
                let mut enc = [0u8; 4];
                self.buf.extend_from_slice(ch.encode_utf8(&mut enc).as_bytes());
            }
            _ => self.buf.push(b'?'),
        }
    }

    /// Drop the contents, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write everything to `w`, flush `w`, and empty the buffer.
    ///
    /// # Errors
    ///
    /// Returns the writer's error; the buffer keeps its bytes in that case.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if !self.buf.is_empty() {
            w.write_all(&self.buf)?;
            w.flush()?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Real flushing goes through flush_to().
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── CellWriter ──────────────────────────────────────────────────────────────

/// Stateful cell renderer.
///
/// - **Cursor**: no CUP when the next cell is directly right of the last
///   one; the terminal advanced there on its own.
/// - **Attributes**: on change, SGR 0 then the new set. The reset also
///   clears colors, so color tracking is invalidated with it.
/// - **Colors**: re-emitted only when they differ from the last cell's.
#[allow(clippy::struct_field_names)]
pub struct CellWriter {
    last_x: i32,
    last_y: i32,
    last_attrs: Attr,
    last_fg: Option<Color>,
    last_bg: Option<Color>,
}

impl CellWriter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_x: -1,
            last_y: -1,
            last_attrs: Attr::empty(),
            last_fg: None,
            last_bg: None,
        }
    }

    /// Forget everything. Call after a screen clear or an SGR reset
    /// issued outside this writer.
    #[allow(clippy::missing_const_for_fn)]
    pub fn reset_state(&mut self) {
        *self = Self::new();
    }

    /// Forget only the cursor position, e.g. after an explicit cursor move.
    pub const fn invalidate_cursor(&mut self) {
        self.last_x = -1;
        self.last_y = -1;
    }

    /// Render one cell at `(x, y)` drawn with `colors`.
    pub fn render_cell(
        &mut self,
        out: &mut OutputBuffer,
        x: u16,
        y: u16,
        cell: &Cell,
        colors: ColorPair,
    ) {
        let xi = i32::from(x);
        let yi = i32::from(y);

        if yi != self.last_y || xi != self.last_x + 1 {
            ansi::cursor_to(out, x, y).ok();
        }

        self.apply_style(out, cell.attrs, colors);
        out.write_codepoint(cell.ch);

        self.last_x = xi;
        self.last_y = yi;
    }

    fn apply_style(&mut self, out: &mut OutputBuffer, attrs: Attr, colors: ColorPair) {
        if attrs != self.last_attrs {
            if !self.last_attrs.is_empty() {
                ansi::reset(out).ok();
                self.last_fg = None;
                self.last_bg = None;
            }
            self.last_attrs = attrs;
            ansi::attrs(out, attrs).ok();
        }

        if self.last_fg != Some(colors.fg) {
            ansi::fg(out, colors.fg).ok();
            self.last_fg = Some(colors.fg);
        }
        if self.last_bg != Some(colors.bg) {
            ansi::bg(out, colors.bg).ok();
            self.last_bg = Some(colors.bg);
        }
    }
}

impl Default for CellWriter {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
