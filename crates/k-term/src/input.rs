// SPDX-License-Identifier: MIT
//
// Key decoding.
//
// Turns raw terminal bytes into `Key`s. Two modes, chosen per window:
//
//   Keypad on: `Parser` decodes CSI and SS3 sequences into named keys
//   (arrows, Home/End, paging, Insert/Delete, F1..F20, BackTab), plus
//   control characters, Alt+key (ESC prefix), and UTF-8 text.
//
//   Keypad off: `raw_keys` delivers every byte as its own key. Escape
//   sequences arrive as their individual bytes.
//
// The parser doubles as the session's input queue: bytes are pushed as
// they are read and taken one key at a time, each in the mode of the
// window reading it. Escape sequences can span several reads, so an
// incomplete tail stays queued until more bytes arrive. A lone ESC
// is ambiguous (the Escape key, or the start of a sequence); the caller
// waits the escape delay and then calls `flush` to resolve it as Escape.
//
// Modifier parameters on CSI keys (`ESC [ 1 ; 5 A`) are accepted and
// dropped: the key is reported without them.

// ─── Key ────────────────────────────────────────────────────────────────────

/// A decoded keypress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character.
    Char(char),
    /// A raw byte with no printable meaning (keypad off, or a stray byte).
    Byte(u8),
    /// Ctrl plus a key, reported as the lowercase letter or the symbol
    /// (`@ \ ] ^ _`) the control code is derived from.
    Ctrl(char),
    /// Alt plus a printable character (ESC prefix).
    Alt(char),
    Enter,
    Tab,
    /// Shift+Tab.
    BackTab,
    Backspace,
    Escape,
    Delete,
    Insert,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// Function key F1..F20.
    F(u8),
}

impl Key {
    /// Whether this key came from an escape sequence rather than a
    /// single typed character.
    #[must_use]
    pub const fn is_special(self) -> bool {
        !matches!(
            self,
            Self::Char(_) | Self::Byte(_) | Self::Ctrl(_) | Self::Alt(_)
        )
    }

    /// The printable character this key carries, if any.
    #[must_use]
    pub const fn printable(self) -> Option<char> {
        match self {
            Self::Char(c) => Some(c),
            _ => None,
        }
    }
}

// ─── Raw Mode ───────────────────────────────────────────────────────────────

/// One key per byte: printable ASCII as [`Key::Char`], everything else
/// as [`Key::Byte`].
///
/// ```
/// use k_term::input::{raw_keys, Key};
///
/// assert_eq!(raw_keys(b"a\x1b"), vec![Key::Char('a'), Key::Byte(0x1b)]);
/// ```
#[must_use]
pub fn raw_keys(bytes: &[u8]) -> Vec<Key> {
    bytes.iter().map(|&b| raw_key(b)).collect()
}

const fn raw_key(b: u8) -> Key {
    match b {
        0x20..=0x7E => Key::Char(b as char),
        other => Key::Byte(other),
    }
}

// ─── Parser ─────────────────────────────────────────────────────────────────

/// Keypad-mode decoder.
///
/// ```
/// use k_term::input::{Key, Parser};
///
/// let mut p = Parser::new();
/// assert_eq!(p.advance(b"\x1b[A"), vec![Key::Up]);
///
/// // A sequence split across reads is held until it completes.
/// assert!(p.advance(b"\x1b[2").is_empty());
/// assert_eq!(p.advance(b"4~"), vec![Key::F(12)]);
/// ```
#[derive(Debug, Default)]
pub struct Parser {
    buf: Vec<u8>,
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(32),
        }
    }

    /// Feed bytes and return every key that is now complete.
    pub fn advance(&mut self, data: &[u8]) -> Vec<Key> {
        self.push(data);
        std::iter::from_fn(|| self.next_key()).collect()
    }

    /// Queue bytes without decoding them.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Decode the first complete key in the queue, leaving the rest
    /// queued. `None` when the queue is empty or holds only an incomplete
    /// sequence.
    pub fn next_key(&mut self) -> Option<Key> {
        loop {
            match try_parse(&self.buf) {
                Parsed::Key(key, consumed) => {
                    self.buf.drain(..consumed);
                    return Some(key);
                }
                Parsed::Incomplete | Parsed::Skip(0) => return None,
                Parsed::Skip(n) => {
                    self.buf.drain(..n.min(self.buf.len()));
                }
            }
        }
    }

    /// Take the first queued byte as a keypad-off key.
    pub fn next_raw_key(&mut self) -> Option<Key> {
        (!self.buf.is_empty()).then(|| raw_key(self.buf.remove(0)))
    }

    /// Whether an incomplete sequence is waiting for more bytes.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Resolve whatever is pending as literal keys: a lone ESC becomes
    /// [`Key::Escape`], the bytes after it decode on their own.
    pub fn flush(&mut self) -> Vec<Key> {
        std::iter::from_fn(|| self.flush_next()).collect()
    }

    /// Resolve the first pending key literally, as [`flush`](Self::flush)
    /// would, and leave the rest queued.
    pub fn flush_next(&mut self) -> Option<Key> {
        while let Some(&first) = self.buf.first() {
            if first == 0x1B {
                self.buf.remove(0);
                return Some(Key::Escape);
            }
            match try_parse(&self.buf) {
                Parsed::Key(key, n) => {
                    self.buf.drain(..n);
                    return Some(key);
                }
                // A truncated UTF-8 or CSI tail cannot complete any more.
                Parsed::Incomplete => {
                    self.buf.remove(0);
                    return Some(Key::Byte(first));
                }
                Parsed::Skip(n) => {
                    self.buf.drain(..n.clamp(1, self.buf.len()));
                }
            }
        }
        None
    }
}

// ─── Stateless Parsing ──────────────────────────────────────────────────────

enum Parsed {
    Key(Key, usize),
    Incomplete,
    Skip(usize),
}

fn try_parse(buf: &[u8]) -> Parsed {
    let Some(&first) = buf.first() else {
        return Parsed::Skip(0);
    };
    match first {
        0x1B => parse_escape(buf),
        b if b >= 0xC0 => parse_utf8(buf),
        b @ (0x80..=0xBF) => Parsed::Key(Key::Byte(b), 1),
        b => Parsed::Key(single_byte(b), 1),
    }
}

/// An ASCII byte on its own.
const fn single_byte(b: u8) -> Key {
    match b {
        0x00 => Key::Ctrl('@'),
        0x08 | 0x7F => Key::Backspace,
        0x09 => Key::Tab,
        0x0A | 0x0D => Key::Enter,
        0x1B => Key::Escape,
        0x01..=0x1A => Key::Ctrl((b + b'a' - 1) as char),
        0x1C..=0x1F => Key::Ctrl((b + b'@') as char),
        0x20..=0x7E => Key::Char(b as char),
        other => Key::Byte(other),
    }
}

// ── Escape ──────────────────────────────────────────────────────────────────

fn parse_escape(buf: &[u8]) -> Parsed {
    let Some(&second) = buf.get(1) else {
        return Parsed::Incomplete;
    };
    match second {
        b'[' => parse_csi(buf),
        b'O' => parse_ss3(buf),
        b @ 0x20..=0x7E => Parsed::Key(Key::Alt(char::from(b)), 2),
        // ESC followed by something unrelated: Escape, then re-parse.
        _ => Parsed::Key(Key::Escape, 1),
    }
}

// ── CSI ─────────────────────────────────────────────────────────────────────

fn parse_csi(buf: &[u8]) -> Parsed {
    // Parameter bytes are 0x30..=0x3F, intermediates 0x20..=0x2F, and the
    // final byte 0x40..=0x7E ends the sequence.
    let mut end = 2;
    loop {
        let Some(&b) = buf.get(end) else {
            return Parsed::Incomplete;
        };
        if (0x40..=0x7E).contains(&b) {
            break;
        }
        if !(0x20..=0x3F).contains(&b) {
            return Parsed::Skip(end + 1);
        }
        end += 1;
    }

    let final_byte = buf[end];
    let consumed = end + 1;

    if final_byte == b'~' {
        let first = first_param(&buf[2..end]);
        let key = match first {
            1 | 7 => Key::Home,
            2 => Key::Insert,
            3 => Key::Delete,
            4 | 8 => Key::End,
            5 => Key::PageUp,
            6 => Key::PageDown,
            11..=15 => Key::F(function_number(first - 10)),
            17..=21 => Key::F(function_number(first - 11)),
            23..=26 => Key::F(function_number(first - 12)),
            28 | 29 => Key::F(function_number(first - 13)),
            31..=34 => Key::F(function_number(first - 14)),
            _ => return Parsed::Skip(consumed),
        };
        return Parsed::Key(key, consumed);
    }

    match letter_key(final_byte) {
        Some(key) => Parsed::Key(key, consumed),
        None if final_byte == b'Z' => Parsed::Key(Key::BackTab, consumed),
        None => Parsed::Skip(consumed),
    }
}

// ── SS3 ─────────────────────────────────────────────────────────────────────

fn parse_ss3(buf: &[u8]) -> Parsed {
    let Some(&b) = buf.get(2) else {
        return Parsed::Incomplete;
    };
    letter_key(b).map_or(Parsed::Skip(3), |key| Parsed::Key(key, 3))
}

/// Final letters shared by CSI and SS3.
const fn letter_key(b: u8) -> Option<Key> {
    Some(match b {
        b'A' => Key::Up,
        b'B' => Key::Down,
        b'C' => Key::Right,
        b'D' => Key::Left,
        b'H' => Key::Home,
        b'F' => Key::End,
        b'P' => Key::F(1),
        b'Q' => Key::F(2),
        b'R' => Key::F(3),
        b'S' => Key::F(4),
        _ => return None,
    })
}

// ── UTF-8 ───────────────────────────────────────────────────────────────────

fn parse_utf8(buf: &[u8]) -> Parsed {
    let expected = utf8_char_len(buf[0]);
    if expected == 0 {
        return Parsed::Key(Key::Byte(buf[0]), 1);
    }
    if buf.len() < expected {
        return Parsed::Incomplete;
    }
    std::str::from_utf8(&buf[..expected])
        .ok()
        .and_then(|s| s.chars().next())
        .map_or(Parsed::Key(Key::Byte(buf[0]), 1), |ch| {
            Parsed::Key(Key::Char(ch), expected)
        })
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// The first `;`-separated numeric parameter, 0 if absent.
fn first_param(raw: &[u8]) -> u16 {
    raw.iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0u16, |acc, b| acc.saturating_mul(10).saturating_add(u16::from(b - b'0')))
}

#[allow(clippy::cast_possible_truncation)] // Callers pass 1..=20.
const fn function_number(n: u16) -> u8 {
    n as u8
}

const fn utf8_char_len(lead: u8) -> usize {
    match lead {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 0,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &[u8]) -> Vec<Key> {
        Parser::new().advance(data)
    }

    fn parse_one(data: &[u8]) -> Key {
        let keys = parse(data);
        assert_eq!(keys.len(), 1, "expected one key from {data:?}, got {keys:?}");
        keys[0]
    }

    // ── ASCII & Controls ────────────────────────────────────────────────

    #[test]
    fn printable_ascii() {
        assert_eq!(parse(b"ab ~"), vec![
            Key::Char('a'),
            Key::Char('b'),
            Key::Char(' '),
            Key::Char('~'),
        ]);
    }

    #[test]
    fn control_letters() {
        assert_eq!(parse_one(b"\x01"), Key::Ctrl('a'));
        assert_eq!(parse_one(b"\x03"), Key::Ctrl('c'));
        assert_eq!(parse_one(b"\x1a"), Key::Ctrl('z'));
        assert_eq!(parse_one(b"\x00"), Key::Ctrl('@'));
        assert_eq!(parse_one(b"\x1c"), Key::Ctrl('\\'));
    }

    #[test]
    fn enter_tab_backspace() {
        assert_eq!(parse_one(b"\r"), Key::Enter);
        assert_eq!(parse_one(b"\n"), Key::Enter);
        assert_eq!(parse_one(b"\t"), Key::Tab);
        assert_eq!(parse_one(b"\x7f"), Key::Backspace);
        assert_eq!(parse_one(b"\x08"), Key::Backspace);
    }

    // ── CSI ─────────────────────────────────────────────────────────────

    #[test]
    fn arrows() {
        assert_eq!(parse_one(b"\x1b[A"), Key::Up);
        assert_eq!(parse_one(b"\x1b[B"), Key::Down);
        assert_eq!(parse_one(b"\x1b[C"), Key::Right);
        assert_eq!(parse_one(b"\x1b[D"), Key::Left);
    }

    #[test]
    fn modified_arrow_reports_base_key() {
        assert_eq!(parse_one(b"\x1b[1;5C"), Key::Right);
    }

    #[test]
    fn editing_keys() {
        assert_eq!(parse_one(b"\x1b[H"), Key::Home);
        assert_eq!(parse_one(b"\x1b[F"), Key::End);
        assert_eq!(parse_one(b"\x1b[1~"), Key::Home);
        assert_eq!(parse_one(b"\x1b[2~"), Key::Insert);
        assert_eq!(parse_one(b"\x1b[3~"), Key::Delete);
        assert_eq!(parse_one(b"\x1b[4~"), Key::End);
        assert_eq!(parse_one(b"\x1b[5~"), Key::PageUp);
        assert_eq!(parse_one(b"\x1b[6~"), Key::PageDown);
    }

    #[test]
    fn function_keys() {
        assert_eq!(parse_one(b"\x1bOP"), Key::F(1));
        assert_eq!(parse_one(b"\x1b[S"), Key::F(4));
        assert_eq!(parse_one(b"\x1b[11~"), Key::F(1));
        assert_eq!(parse_one(b"\x1b[15~"), Key::F(5));
        assert_eq!(parse_one(b"\x1b[17~"), Key::F(6));
        assert_eq!(parse_one(b"\x1b[21~"), Key::F(10));
        assert_eq!(parse_one(b"\x1b[23~"), Key::F(11));
        assert_eq!(parse_one(b"\x1b[24~"), Key::F(12));
        assert_eq!(parse_one(b"\x1b[29~"), Key::F(16));
        assert_eq!(parse_one(b"\x1b[34~"), Key::F(20));
    }

    #[test]
    fn back_tab() {
        assert_eq!(parse_one(b"\x1b[Z"), Key::BackTab);
    }

    #[test]
    fn unknown_csi_is_skipped() {
        assert_eq!(parse(b"\x1b[99~x"), vec![Key::Char('x')]);
        assert_eq!(parse(b"\x1b[5nx"), vec![Key::Char('x')]);
    }

    // ── SS3 ─────────────────────────────────────────────────────────────

    #[test]
    fn application_cursor_keys() {
        assert_eq!(parse_one(b"\x1bOA"), Key::Up);
        assert_eq!(parse_one(b"\x1bOH"), Key::Home);
    }

    // ── Alt & Escape ────────────────────────────────────────────────────

    #[test]
    fn alt_char() {
        assert_eq!(parse_one(b"\x1bx"), Key::Alt('x'));
    }

    #[test]
    fn lone_escape_waits_for_flush() {
        let mut p = Parser::new();
        assert!(p.advance(b"\x1b").is_empty());
        assert!(p.has_pending());
        assert_eq!(p.flush(), vec![Key::Escape]);
        assert!(!p.has_pending());
    }

    #[test]
    fn double_escape_emits_escape_then_waits() {
        let mut p = Parser::new();
        assert_eq!(p.advance(b"\x1b\x1b"), vec![Key::Escape]);
        assert_eq!(p.flush(), vec![Key::Escape]);
    }

    #[test]
    fn flush_incomplete_csi() {
        let mut p = Parser::new();
        assert!(p.advance(b"\x1b[1").is_empty());
        assert_eq!(p.flush(), vec![Key::Escape, Key::Char('['), Key::Char('1')]);
    }

    // ── Split Reads ─────────────────────────────────────────────────────

    #[test]
    fn sequence_split_across_reads() {
        let mut p = Parser::new();
        assert!(p.advance(b"\x1b").is_empty());
        assert!(p.advance(b"[").is_empty());
        assert_eq!(p.advance(b"B"), vec![Key::Down]);
    }

    #[test]
    fn utf8_split_across_reads() {
        let bytes = "é".as_bytes();
        let mut p = Parser::new();
        assert!(p.advance(&bytes[..1]).is_empty());
        assert_eq!(p.advance(&bytes[1..]), vec![Key::Char('é')]);
    }

    // ── UTF-8 ───────────────────────────────────────────────────────────

    #[test]
    fn utf8_characters() {
        assert_eq!(parse("中🔥".as_bytes()), vec![Key::Char('中'), Key::Char('🔥')]);
    }

    #[test]
    fn stray_continuation_byte() {
        assert_eq!(parse(b"\x80a"), vec![Key::Byte(0x80), Key::Char('a')]);
    }

    // ── Raw Mode ────────────────────────────────────────────────────────

    #[test]
    fn queued_bytes_decode_one_key_at_a_time() {
        let mut p = Parser::new();
        p.push(b"\x1b[Aq\x1b[");
        assert_eq!(p.next_key(), Some(Key::Up));
        assert_eq!(p.next_raw_key(), Some(Key::Char('q')));
        assert_eq!(p.next_key(), None);
        assert!(p.has_pending());
        assert_eq!(p.flush_next(), Some(Key::Escape));
        assert_eq!(p.next_key(), Some(Key::Char('[')));
        assert!(!p.has_pending());
    }

    #[test]
    fn raw_mode_delivers_every_byte() {
        assert_eq!(raw_keys(b"\x1b[A"), vec![
            Key::Byte(0x1b),
            Key::Char('['),
            Key::Char('A'),
        ]);
        assert_eq!(raw_keys(b"\r\x7f"), vec![Key::Byte(b'\r'), Key::Byte(0x7f)]);
    }

    // ── Key ─────────────────────────────────────────────────────────────

    #[test]
    fn special_keys() {
        assert!(Key::Up.is_special());
        assert!(Key::F(3).is_special());
        assert!(!Key::Char('a').is_special());
        assert!(!Key::Ctrl('c').is_special());
        assert_eq!(Key::Char('q').printable(), Some('q'));
        assert_eq!(Key::Enter.printable(), None);
    }
}
