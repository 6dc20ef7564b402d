// SPDX-License-Identifier: MIT
//
// Colors and the color pair registry.
//
// Cells never store colors directly. They store a pair number; the
// registry maps pair numbers to a foreground/background combination of
// the eight standard terminal colors (or the terminal's own default).
// Pair 0 is fixed to the terminal defaults and always resolves.
//
// Color mode is opt-in: the registry starts disabled and every pair
// resolves to the defaults until `enable` succeeds. Enabling checks the
// terminal's capabilities before touching any state, so a failed attempt
// leaves the registry exactly as it was.

use crate::backend::Capabilities;
use crate::cell::{Attr, Cell};
use crate::error::{Error, Result};

// ─── Color ──────────────────────────────────────────────────────────────────────

/// One of the eight standard terminal colors, or the terminal default.
///
/// Discriminants match the ANSI/curses color indices, so `Color::Red as u8`
/// is the `1` in `SGR 31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    Black = 0,
    Red = 1,
    Green = 2,
    Yellow = 3,
    Blue = 4,
    Magenta = 5,
    Cyan = 6,
    White = 7,
    /// Whatever the terminal draws when no color is set.
    #[default]
    Default = 9,
}

impl Color {
    /// All eight concrete colors, in index order.
    pub const ALL: [Self; 8] = [
        Self::Black,
        Self::Red,
        Self::Green,
        Self::Yellow,
        Self::Blue,
        Self::Magenta,
        Self::Cyan,
        Self::White,
    ];

    /// The ANSI color index (0..=7), or `None` for [`Color::Default`].
    #[inline]
    #[must_use]
    pub const fn index(self) -> Option<u8> {
        match self {
            Self::Default => None,
            other => Some(other as u8),
        }
    }

    /// The color with ANSI index `n`, if `n` is 0..=7.
    #[must_use]
    pub const fn from_index(n: u8) -> Option<Self> {
        if n < 8 {
            Some(Self::ALL[n as usize])
        } else {
            None
        }
    }
}

// ─── ColorPair ──────────────────────────────────────────────────────────────────

/// A foreground/background combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColorPair {
    pub fg: Color,
    pub bg: Color,
}

impl ColorPair {
    /// The terminal's own colors. What pair 0 always resolves to.
    pub const DEFAULT: Self = Self {
        fg: Color::Default,
        bg: Color::Default,
    };

    #[inline]
    #[must_use]
    pub const fn new(fg: Color, bg: Color) -> Self {
        Self { fg, bg }
    }
}

// ─── Registry ───────────────────────────────────────────────────────────────────

/// Color pair table for one session.
///
/// ```
/// use k_term::backend::Capabilities;
/// use k_term::color::{Color, ColorPair, ColorRegistry};
///
/// let mut colors = ColorRegistry::new();
/// colors.enable(&Capabilities::ANSI).unwrap();
/// colors.register(1, Color::White, Color::Black).unwrap();
/// assert_eq!(colors.resolve(1), ColorPair::new(Color::White, Color::Black));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColorRegistry {
    enabled: bool,
    limit: u16,
    pairs: Vec<Option<ColorPair>>,
    generation: u64,
}

impl ColorRegistry {
    /// A disabled registry with no pairs.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enabled: false,
            limit: 0,
            pairs: Vec::new(),
            generation: 0,
        }
    }

    /// Turn color mode on for a terminal with the given capabilities.
    ///
    /// Fails with [`Error::Capability`] when the terminal has no colors;
    /// the registry is left untouched in that case. Enabling twice keeps
    /// the pairs already registered.
    pub fn enable(&mut self, caps: &Capabilities) -> Result<()> {
        if !caps.has_colors() {
            return Err(Error::Capability("color"));
        }
        if self.enabled {
            return Ok(());
        }
        // Pair numbers live in an 8-bit attribute field.
        self.limit = caps.color_pairs.min(256);
        self.pairs = vec![None; usize::from(self.limit)];
        self.enabled = true;
        self.generation += 1;
        tracing::debug!(pairs = self.limit, "color mode enabled");
        Ok(())
    }

    /// Whether color mode is on.
    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of pair slots, pair 0 included. Zero while disabled.
    #[inline]
    #[must_use]
    pub const fn limit(&self) -> u16 {
        self.limit
    }

    /// Bumped whenever a registered combination changes, so renderers
    /// know cells drawn earlier may now have different colors.
    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Define (or redefine) pair `id`.
    ///
    /// - [`Error::State`] if color mode is off.
    /// - [`Error::Range`] if `id` is 0 or not below [`limit`](Self::limit).
    pub fn register(&mut self, id: u8, fg: Color, bg: Color) -> Result<()> {
        if !self.enabled {
            return Err(Error::State("color mode is not enabled".into()));
        }
        if id == 0 || u16::from(id) >= self.limit {
            return Err(Error::Range {
                what: "color pair",
                value: u32::from(id),
                limit: u32::from(self.limit),
            });
        }
        let pair = ColorPair::new(fg, bg);
        let slot = &mut self.pairs[usize::from(id)];
        if *slot != Some(pair) {
            *slot = Some(pair);
            self.generation += 1;
        }
        Ok(())
    }

    /// The registered combination for `id`, if any. Pair 0 is always
    /// [`ColorPair::DEFAULT`].
    #[must_use]
    pub fn get(&self, id: u8) -> Option<ColorPair> {
        if id == 0 {
            return Some(ColorPair::DEFAULT);
        }
        self.pairs.get(usize::from(id)).copied().flatten()
    }

    /// Whether a cell may reference pair `id`.
    #[inline]
    #[must_use]
    pub fn is_registered(&self, id: u8) -> bool {
        self.get(id).is_some()
    }

    /// Check that `id` may be used in a write.
    pub fn validate(&self, id: u8) -> Result<()> {
        if self.is_registered(id) {
            Ok(())
        } else {
            Err(Error::Range {
                what: "color pair",
                value: u32::from(id),
                limit: u32::from(self.limit),
            })
        }
    }

    /// The colors to draw pair `id` with. Falls back to the defaults when
    /// color mode is off or the pair was never registered.
    #[must_use]
    pub fn resolve(&self, id: u8) -> ColorPair {
        if !self.enabled {
            return ColorPair::DEFAULT;
        }
        self.get(id).unwrap_or(ColorPair::DEFAULT)
    }

    /// The colors a cell is drawn with.
    #[inline]
    #[must_use]
    pub fn resolve_cell(&self, cell: &Cell) -> ColorPair {
        self.resolve(cell.pair)
    }

    /// The attribute value selecting pair `id`. Same as
    /// [`Attr::color_pair`]; provided so callers can stay on the registry.
    #[inline]
    #[must_use]
    pub const fn attribute(id: u8) -> Attr {
        Attr::color_pair(id)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────────
