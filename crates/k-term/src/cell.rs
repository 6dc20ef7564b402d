// SPDX-License-Identifier: MIT
//
// Cell: the atomic unit of terminal rendering.
//
// Every character position in a window or on the screen is a Cell. It
// holds a codepoint, a set of text attributes, and the number of the color
// pair it is drawn with. Colors themselves live in the `ColorRegistry`;
// a cell only carries the pair id, so re-registering a pair recolors every
// cell that uses it on the next update.
//
// Attribute words follow the curses layout: the low byte is unused by
// attributes, bits 8..16 embed a color pair number, and the display flags
// sit above that. This lets callers build one value with bitwise OR,
// `Attr::BOLD | Attr::color_pair(3)`, and hand it to any write call.

// ─── Text Attributes ─────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Display attributes plus an embedded color pair field.
    ///
    /// ```
    /// use k_term::cell::Attr;
    ///
    /// let style = Attr::BOLD | Attr::UNDERLINE | Attr::color_pair(2);
    /// assert!(style.contains(Attr::BOLD));
    /// assert_eq!(style.pair(), 2);
    /// assert_eq!(style.without_pair(), Attr::BOLD | Attr::UNDERLINE);
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u32 {
        /// Mask of the embedded color pair number (bits 8..16).
        const COLOR      = 0xFF << 8;
        /// Best highlighting mode of the terminal (rendered as reverse).
        const STANDOUT   = 1 << 16;
        const UNDERLINE  = 1 << 17;
        const REVERSE    = 1 << 18;
        const BLINK      = 1 << 19;
        /// Half bright.
        const DIM        = 1 << 20;
        const BOLD       = 1 << 21;
        /// Alternate character set (line drawing).
        const ALTCHARSET = 1 << 22;
        const INVISIBLE  = 1 << 23;
        /// Protected from erasure (kept for attribute-word compatibility).
        const PROTECT    = 1 << 24;
        const ITALIC     = 1 << 25;
    }
}

impl Attr {
    /// No attributes, default pair.
    pub const NORMAL: Self = Self::empty();

    /// The attribute value selecting color pair `id`.
    ///
    /// OR it with other flags; the renderer looks the pair up in the
    /// color registry.
    #[inline]
    #[must_use]
    pub const fn color_pair(id: u8) -> Self {
        Self::from_bits_retain((id as u32) << 8)
    }

    /// The color pair number embedded in this attribute word.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Masked to 8 bits.
    pub const fn pair(self) -> u8 {
        ((self.bits() & Self::COLOR.bits()) >> 8) as u8
    }

    /// This attribute word with the color pair field cleared.
    #[inline]
    #[must_use]
    pub const fn without_pair(self) -> Self {
        Self::from_bits_retain(self.bits() & !Self::COLOR.bits())
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A single terminal cell.
///
/// ```
/// use k_term::cell::{Attr, Cell};
///
/// let cell = Cell::styled('x', Attr::BOLD | Attr::color_pair(1));
/// assert_eq!(cell.character(), Some('x'));
/// assert_eq!(cell.pair, 1);
/// assert_eq!(cell.attrs, Attr::BOLD);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    /// Unicode codepoint to display. `b' '` for blank cells.
    pub ch: u32,

    /// Display attributes. Never carries pair bits; see [`pair`](Self::pair).
    pub attrs: Attr,

    /// Color pair number; 0 is the terminal default pair.
    pub pair: u8,
}

/// Default character for blank cells.
const SPACE: u32 = b' ' as u32;

impl Cell {
    /// A blank cell: space, no attributes, default pair.
    pub const BLANK: Self = Self {
        ch: SPACE,
        attrs: Attr::empty(),
        pair: 0,
    };

    /// A cell with a character and default styling.
    #[inline]
    #[must_use]
    pub const fn new(ch: char) -> Self {
        Self {
            ch: ch as u32,
            attrs: Attr::empty(),
            pair: 0,
        }
    }

    /// A cell from a character and an attribute word.
    ///
    /// The pair field of `attrs` is split out into [`pair`](Self::pair).
    #[inline]
    #[must_use]
    pub const fn styled(ch: char, attrs: Attr) -> Self {
        Self {
            ch: ch as u32,
            attrs: attrs.without_pair(),
            pair: attrs.pair(),
        }
    }

    // ─── Queries ──────────────────────────────────────────────────────────

    /// The codepoint as a `char`, if valid.
    #[inline]
    #[must_use]
    pub const fn character(self) -> Option<char> {
        char::from_u32(self.ch)
    }

    /// Whether this cell is a plain blank (space, no attrs, pair 0).
    #[inline]
    #[must_use]
    pub fn is_blank(self) -> bool {
        self == Self::BLANK
    }

    /// The full attribute word: display flags with the pair folded back in.
    #[inline]
    #[must_use]
    pub const fn attr_word(self) -> Attr {
        Attr::from_bits_retain(self.attrs.bits() | Attr::color_pair(self.pair).bits())
    }

    /// Whether two cells render with the same attributes and pair.
    #[inline]
    #[must_use]
    pub fn same_style(self, other: &Self) -> bool {
        self.attrs == other.attrs && self.pair == other.pair
    }

    // ─── Builders ─────────────────────────────────────────────────────────

    /// Replace the character, keeping the styling.
    #[inline]
    #[must_use]
    pub const fn with_char(self, ch: char) -> Self {
        Self {
            ch: ch as u32,
            ..self
        }
    }

    /// Replace the display attributes (pair bits in `attrs` are ignored).
    #[inline]
    #[must_use]
    pub const fn with_attrs(self, attrs: Attr) -> Self {
        Self {
            attrs: attrs.without_pair(),
            ..self
        }
    }

    /// Replace the color pair.
    #[inline]
    #[must_use]
    pub const fn with_pair(self, pair: u8) -> Self {
        Self { pair, ..self }
    }
}

impl Default for Cell {
    #[inline]
    fn default() -> Self {
        Self::BLANK
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ch = char::from_u32(self.ch).unwrap_or('?');
        write!(f, "Cell({ch:?}")?;
        if !self.attrs.is_empty() {
            write!(f, ", {:?}", self.attrs)?;
        }
        if self.pair != 0 {
            write!(f, ", pair={}", self.pair)?;
        }
        write!(f, ")")
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
