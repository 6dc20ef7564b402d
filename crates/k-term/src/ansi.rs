// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. They hold
// no state and make no decisions about when to emit; that is the
// `CellWriter`'s job. This module only knows the byte-level encoding of
// the terminal commands the tty backend needs.
//
// Cursor positions are 0-indexed in our API and converted to the 1-indexed
// form ANSI uses.
use std::io::{self, Write};

use crate::cell::Attr;
use crate::color::Color;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` with CUP.
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2).
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Reset all SGR attributes and colors (SGR 0).
///
/// The `CellWriter` must forget its tracked style after this.
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

// ─── Colors ──────────────────────────────────────────────────────────────────

/// Set the foreground color: SGR 30-37, or 39 for the terminal default.
pub fn fg(w: &mut impl Write, color: Color) -> io::Result<()> {
    match color.index() {
        Some(n) => write!(w, "\x1b[{}m", 30 + u16::from(n)),
        None => w.write_all(b"\x1b[39m"),
    }
}

/// Set the background color: SGR 40-47, or 49 for the terminal default.
pub fn bg(w: &mut impl Write, color: Color) -> io::Result<()> {
    match color.index() {
        Some(n) => write!(w, "\x1b[{}m", 40 + u16::from(n)),
        None => w.write_all(b"\x1b[49m"),
    }
}

// ─── Text Attributes ─────────────────────────────────────────────────────────

/// Emit SGR codes for display attributes as one CSI sequence.
///
/// Codes are semicolon-separated: `\x1b[1;4m` for bold + underline.
/// STANDOUT renders as reverse video and is merged with REVERSE so `7`
/// appears at most once. ALTCHARSET, PROTECT, and the pair field have no
/// SGR encoding and are ignored. Writes nothing if no attribute applies.
pub fn attrs(w: &mut impl Write, attr: Attr) -> io::Result<()> {
    let mut codes: Vec<&[u8]> = Vec::with_capacity(7);
    if attr.contains(Attr::BOLD) {
        codes.push(b"1");
    }
    if attr.contains(Attr::DIM) {
        codes.push(b"2");
    }
    if attr.contains(Attr::ITALIC) {
        codes.push(b"3");
    }
    if attr.contains(Attr::UNDERLINE) {
        codes.push(b"4");
    }
    if attr.contains(Attr::BLINK) {
        codes.push(b"5");
    }
    if attr.intersects(Attr::REVERSE | Attr::STANDOUT) {
        codes.push(b"7");
    }
    if attr.contains(Attr::INVISIBLE) {
        codes.push(b"8");
    }
    if codes.is_empty() {
        return Ok(());
    }

    w.write_all(b"\x1b[")?;
    for (i, code) in codes.iter().enumerate() {
        if i > 0 {
            w.write_all(b";")?;
        }
        w.write_all(code)?;
    }
    w.write_all(b"m")
}

// ─── Synchronized Output ─────────────────────────────────────────────────────

/// Begin synchronized output (DEC private mode 2026).
///
/// Terminals that support it hold the frame until [`end_sync`]; others
/// ignore the sequence.
#[inline]
pub fn begin_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026h")
}

/// End synchronized output.
#[inline]
pub fn end_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026l")
}

// ─── Alternate Screen ───────────────────────────────────────────────────────

/// Enter the alternate screen buffer (DEC private mode 1049).
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

/// Leave the alternate screen and restore what was there before.
#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// ─── Keypad ─────────────────────────────────────────────────────────────────

/// Application keypad/cursor-key mode (DECCKM + DECKPAM).
///
/// Arrow keys then arrive as SS3 sequences (`\x1bOA`), which the input
/// parser decodes alongside the CSI forms.
#[inline]
pub fn keypad_on(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1h\x1b=")
}

/// Back to normal cursor-key mode.
#[inline]
pub fn keypad_off(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1l\x1b>")
}

// ─── Cursor Shape ───────────────────────────────────────────────────────────

/// Terminal cursor shape (DECSCUSR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    /// Terminal default (usually a blinking block).
    #[default]
    Default,
    BlinkBlock,
    SteadyBlock,
    BlinkUnderline,
    SteadyUnderline,
    BlinkBar,
    SteadyBar,
}

/// Set the cursor shape.
#[inline]
pub fn set_cursor_shape(w: &mut impl Write, shape: CursorShape) -> io::Result<()> {
    let n: u8 = match shape {
        CursorShape::Default => 0,
        CursorShape::BlinkBlock => 1,
        CursorShape::SteadyBlock => 2,
        CursorShape::BlinkUnderline => 3,
        CursorShape::SteadyUnderline => 4,
        CursorShape::BlinkBar => 5,
        CursorShape::SteadyBar => 6,
    };
    write!(w, "\x1b[{n} q")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
