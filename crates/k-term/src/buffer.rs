// SPDX-License-Identifier: MIT
//
// FrameBuffer: a 2D grid of cells.
//
// Window storage, the virtual screen, and the renderer's memory of the
// physical terminal are all FrameBuffers. Windows paint into their
// storage; staging copies a window's region onto the virtual screen with
// `blit`; the diff renderer compares the virtual screen against the last
// frame it flushed.
//
// Layout is a flat `Vec<Cell>` indexed `y * width + x`, so a row is a
// contiguous slice and the renderer's left-to-right scan is linear.
//
// All region operations clip silently. Callers that must reject
// out-of-range input (window writes, subwindow creation) check bounds
// themselves and report `Error::Bounds`.

use crate::cell::Cell;

// ─── Rect ───────────────────────────────────────────────────────────────────────

/// An axis-aligned rectangle of cells.
///
/// `x`/`y` is the top-left corner; `right()`/`bottom()` are exclusive.
///
/// ```
/// use k_term::buffer::Rect;
///
/// let r = Rect::new(10, 5, 20, 4);
/// assert!(r.contains(10, 5));
/// assert!(r.contains(29, 8));
/// assert!(!r.contains(30, 5));
/// assert!(!r.contains(10, 9));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rect {
    /// Left column.
    pub x: u16,
    /// Top row.
    pub y: u16,
    /// Width in columns.
    pub width: u16,
    /// Height in rows.
    pub height: u16,
}

impl Rect {
    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (exclusive), widened so it never overflows.
    #[inline]
    #[must_use]
    pub const fn right(self) -> u32 {
        self.x as u32 + self.width as u32
    }

    /// Bottom edge (exclusive), widened so it never overflows.
    #[inline]
    #[must_use]
    pub const fn bottom(self) -> u32 {
        self.y as u32 + self.height as u32
    }

    /// Whether this rectangle covers no cells.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the point `(px, py)` lies inside.
    #[inline]
    #[must_use]
    pub const fn contains(self, px: u16, py: u16) -> bool {
        px >= self.x && (px as u32) < self.right() && py >= self.y && (py as u32) < self.bottom()
    }

    /// Whether `other` lies entirely inside this rectangle.
    ///
    /// An empty `other` is contained if its origin is within bounds.
    #[inline]
    #[must_use]
    pub const fn contains_rect(self, other: Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// The overlap of two rectangles, or `None` if they don't overlap.
    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 > u32::from(x1) && y2 > u32::from(y1) {
            // Both differences are bounded by an input width/height (u16).
            #[allow(clippy::cast_possible_truncation)]
            Some(Self {
                x: x1,
                y: y1,
                width: (x2 - u32::from(x1)) as u16,
                height: (y2 - u32::from(y1)) as u16,
            })
        } else {
            None
        }
    }
}

// ─── FrameBuffer ────────────────────────────────────────────────────────────────

/// A 2D buffer of terminal cells.
///
/// ```
/// use k_term::buffer::FrameBuffer;
/// use k_term::cell::Cell;
///
/// let mut buf = FrameBuffer::new(80, 24);
/// assert_eq!(buf.width(), 80);
/// assert_eq!(buf.height(), 24);
///
/// buf.set(5, 3, Cell::new('X'));
/// assert_eq!(buf.get(5, 3).and_then(|c| c.character()), Some('X'));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    // ─── Construction ────────────────────────────────────────────────────

    /// A buffer filled with blank cells.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self::with_fill(width, height, Cell::BLANK)
    }

    /// A buffer with every cell set to `fill`.
    #[must_use]
    pub fn with_fill(width: u16, height: u16, fill: Cell) -> Self {
        let size = usize::from(width) * usize::from(height);
        Self {
            width,
            height,
            cells: vec![fill; size],
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// The whole buffer as a [`Rect`] at the origin.
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub const fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    const fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// The cell at `(x, y)`, or `None` if out of bounds.
    #[inline]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            self.cells.get(self.index(x, y))
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        if self.in_bounds(x, y) {
            let idx = self.index(x, y);
            self.cells.get_mut(idx)
        } else {
            None
        }
    }

    /// Write one cell. Returns `false` (and writes nothing) when out of bounds.
    #[inline]
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) -> bool {
        match self.get_mut(x, y) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    /// One row as a slice, or `None` if `y` is out of bounds.
    #[inline]
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        if y < self.height {
            let start = self.index(0, y);
            self.cells.get(start..start + usize::from(self.width))
        } else {
            None
        }
    }

    #[inline]
    pub fn row_mut(&mut self, y: u16) -> Option<&mut [Cell]> {
        if y < self.height {
            let start = self.index(0, y);
            let w = usize::from(self.width);
            self.cells.get_mut(start..start + w)
        } else {
            None
        }
    }

    /// Iterate cells with their `(x, y)` coordinates, row by row.
    #[allow(clippy::cast_possible_truncation)]
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16, &Cell)> {
        let w = usize::from(self.width).max(1);
        self.cells.iter().enumerate().map(move |(i, cell)| {
            // x < width and y < height, both u16.
            ((i % w) as u16, (i / w) as u16, cell)
        })
    }

    /// The characters of row `y`, ignoring attributes. Empty if out of bounds.
    #[must_use]
    pub fn row_text(&self, y: u16) -> String {
        self.row(y)
            .map(|row| row.iter().map(|c| c.character().unwrap_or('?')).collect())
            .unwrap_or_default()
    }

    // ─── Fill ────────────────────────────────────────────────────────────

    /// Set every cell to `cell`.
    pub fn fill(&mut self, cell: Cell) {
        self.cells.fill(cell);
    }

    /// Set every cell inside `rect` to `cell`, clipped to the buffer.
    pub fn fill_rect(&mut self, rect: Rect, cell: Cell) {
        let Some(area) = rect.intersect(self.bounds()) else {
            return;
        };
        let x0 = usize::from(area.x);
        let x1 = x0 + usize::from(area.width);
        for y in area.y..area.y + area.height {
            if let Some(row) = self.row_mut(y) {
                row[x0..x1].fill(cell);
            }
        }
    }

    // ─── Resize ──────────────────────────────────────────────────────────

    /// Change dimensions, keeping the cells in the overlapping top-left
    /// region and filling new cells with `fill`.
    pub fn resize_preserving(&mut self, width: u16, height: u16, fill: Cell) {
        if width == self.width && height == self.height {
            return;
        }
        let mut next = Self::with_fill(width, height, fill);
        next.blit(self, self.bounds(), 0, 0);
        *self = next;
    }

    // ─── Copy ────────────────────────────────────────────────────────────

    /// Copy the `src_rect` region of `src` so its top-left lands at
    /// `(dst_x, dst_y)` here. Both sides clip.
    pub fn blit(&mut self, src: &Self, src_rect: Rect, dst_x: u16, dst_y: u16) {
        let Some(from) = src_rect.intersect(src.bounds()) else {
            return;
        };
        // Shift the destination by however much the source was clipped.
        let dst_x = u32::from(dst_x) + u32::from(from.x - src_rect.x);
        let dst_y = u32::from(dst_y) + u32::from(from.y - src_rect.y);
        if dst_x >= u32::from(self.width) || dst_y >= u32::from(self.height) {
            return;
        }
        #[allow(clippy::cast_possible_truncation)] // Both < u16::MAX after the check above.
        let (dst_x, dst_y) = (dst_x as u16, dst_y as u16);

        let cols = from.width.min(self.width - dst_x);
        let rows = from.height.min(self.height - dst_y);
        let (sx, dx, n) = (usize::from(from.x), usize::from(dst_x), usize::from(cols));

        for r in 0..rows {
            let (Some(src_row), Some(dst_row)) = (src.row(from.y + r), self.row_mut(dst_y + r))
            else {
                continue;
            };
            dst_row[dx..dx + n].copy_from_slice(&src_row[sx..sx + n]);
        }
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FrameBuffer({}x{})", self.width, self.height)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────────
