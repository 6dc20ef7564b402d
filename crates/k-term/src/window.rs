// SPDX-License-Identifier: MIT
//
// Windows: rectangular views onto cell storage.
//
// A top-level window owns a FrameBuffer the size of its region. A
// subwindow owns nothing: it holds another reference to its parent's
// storage plus an offset, so writes through either one land in the same
// cells. Storage is released when the last window sharing it goes away.
//
// Regions are kept in absolute screen coordinates. A subwindow's region
// always lies inside its parent's; the session enforces that on creation
// and resize.
//
// Windows are created, looked up, and deleted through the `Session`,
// which hands out `WindowMut` for drawing. `WindowMut` pairs the window
// with the color registry so every write can check that the color pair it
// uses has been registered.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::buffer::{FrameBuffer, Rect};
use crate::cell::{Attr, Cell};
use crate::color::ColorRegistry;
use crate::error::{Error, Result};

// ─── WindowId ───────────────────────────────────────────────────────────────

/// Handle to a window in a session. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(pub(crate) usize);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window #{}", self.0)
    }
}

// ─── InputTimeout ───────────────────────────────────────────────────────────

/// How long `read_key` waits on a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputTimeout {
    /// Wait until a key arrives.
    #[default]
    Blocking,
    /// Return at once if nothing is pending.
    Poll,
    /// Wait at most this long.
    Bounded(Duration),
}

impl InputTimeout {
    /// Curses convention: negative blocks, zero polls, positive bounds the
    /// wait to that many milliseconds.
    #[must_use]
    pub fn from_millis(ms: i32) -> Self {
        match ms {
            0 => Self::Poll,
            ms if ms < 0 => Self::Blocking,
            ms => Self::Bounded(Duration::from_millis(u64::from(ms.unsigned_abs()))),
        }
    }

    /// The wait as a backend read timeout (`None` blocks).
    #[must_use]
    pub const fn duration(self) -> Option<Duration> {
        match self {
            Self::Blocking => None,
            Self::Poll => Some(Duration::ZERO),
            Self::Bounded(d) => Some(d),
        }
    }
}

// ─── Window ─────────────────────────────────────────────────────────────────

/// Default border pieces for [`WindowMut::draw_box`].
pub const BOX_VERTICAL: char = '│';
pub const BOX_HORIZONTAL: char = '─';
const BOX_CORNERS: [char; 4] = ['┌', '┐', '└', '┘'];

/// A window's state. Read it through [`Session::window`], draw on it
/// through [`Session::window_mut`].
///
/// [`Session::window`]: crate::session::Session::window
/// [`Session::window_mut`]: crate::session::Session::window_mut
#[derive(Debug)]
pub struct Window {
    id: WindowId,
    region: Rect,
    storage: Rc<RefCell<FrameBuffer>>,
    offset: (u16, u16),
    parent: Option<WindowId>,
    children: Vec<WindowId>,
    cursor: (u16, u16),
    attrs: Attr,
    background: Cell,
    keypad: bool,
    timeout: InputTimeout,
    clear_pending: bool,
}

impl Window {
    /// A top-level window with fresh blank storage.
    pub(crate) fn new(id: WindowId, region: Rect, keypad: bool) -> Self {
        Self {
            id,
            region,
            storage: Rc::new(RefCell::new(FrameBuffer::new(region.width, region.height))),
            offset: (0, 0),
            parent: None,
            children: Vec::new(),
            cursor: (0, 0),
            attrs: Attr::NORMAL,
            background: Cell::BLANK,
            keypad,
            timeout: InputTimeout::Blocking,
            clear_pending: false,
        }
    }

    /// A view onto `parent`'s storage covering `region` (absolute,
    /// already checked to lie inside the parent).
    pub(crate) fn sub(id: WindowId, parent: &Self, region: Rect) -> Self {
        let offset = (
            parent.offset.0 + (region.x - parent.region.x),
            parent.offset.1 + (region.y - parent.region.y),
        );
        Self {
            id,
            region,
            storage: Rc::clone(&parent.storage),
            offset,
            parent: Some(parent.id),
            children: Vec::new(),
            cursor: (0, 0),
            attrs: parent.attrs,
            background: parent.background,
            keypad: parent.keypad,
            timeout: parent.timeout,
            clear_pending: false,
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn id(&self) -> WindowId {
        self.id
    }

    /// The window's area in absolute screen coordinates.
    #[inline]
    #[must_use]
    pub const fn region(&self) -> Rect {
        self.region
    }

    #[inline]
    #[must_use]
    pub const fn rows(&self) -> u16 {
        self.region.height
    }

    #[inline]
    #[must_use]
    pub const fn cols(&self) -> u16 {
        self.region.width
    }

    #[inline]
    #[must_use]
    pub const fn parent(&self) -> Option<WindowId> {
        self.parent
    }

    /// Live subwindows, in creation order.
    #[must_use]
    pub fn children(&self) -> &[WindowId] {
        &self.children
    }

    /// Cursor position `(x, y)` relative to the window.
    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> (u16, u16) {
        self.cursor
    }

    /// The active attribute state, pair field included.
    #[inline]
    #[must_use]
    pub const fn attrs(&self) -> Attr {
        self.attrs
    }

    #[inline]
    #[must_use]
    pub const fn background(&self) -> Cell {
        self.background
    }

    #[inline]
    #[must_use]
    pub const fn keypad(&self) -> bool {
        self.keypad
    }

    #[inline]
    #[must_use]
    pub const fn timeout(&self) -> InputTimeout {
        self.timeout
    }

    /// Whether this window and `other` draw into the same cells.
    #[must_use]
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.storage, &other.storage)
    }

    /// The cell at window-relative `(x, y)`.
    #[must_use]
    pub fn cell(&self, x: u16, y: u16) -> Option<Cell> {
        if x >= self.cols() || y >= self.rows() {
            return None;
        }
        self.storage
            .borrow()
            .get(self.offset.0 + x, self.offset.1 + y)
            .copied()
    }

    /// Row `y` as text.
    #[must_use]
    pub fn row_text(&self, y: u16) -> String {
        (0..self.cols())
            .filter_map(|x| self.cell(x, y))
            .map(|c| c.character().unwrap_or('?'))
            .collect()
    }

    // ── Session plumbing ────────────────────────────────────────────────

    /// The window's cells, located in its storage.
    pub(crate) fn storage_rect(&self) -> Rect {
        Rect::new(self.offset.0, self.offset.1, self.region.width, self.region.height)
    }

    pub(crate) fn storage(&self) -> std::cell::Ref<'_, FrameBuffer> {
        self.storage.borrow()
    }

    pub(crate) fn add_child(&mut self, id: WindowId) {
        self.children.push(id);
    }

    pub(crate) fn remove_child(&mut self, id: WindowId) {
        self.children.retain(|&c| c != id);
    }

    pub(crate) const fn set_keypad(&mut self, on: bool) {
        self.keypad = on;
    }

    pub(crate) const fn set_timeout(&mut self, timeout: InputTimeout) {
        self.timeout = timeout;
    }

    /// Take the pending-clear flag set by [`WindowMut::clear`].
    pub(crate) const fn take_clear_pending(&mut self) -> bool {
        let pending = self.clear_pending;
        self.clear_pending = false;
        pending
    }

    /// Change the window's extent, keeping its origin.
    ///
    /// Top-level windows reallocate their storage, keeping the overlap;
    /// subwindows only change their view of the parent's cells.
    pub(crate) fn resize(&mut self, rows: u16, cols: u16) {
        self.region.width = cols;
        self.region.height = rows;
        if self.parent.is_none() {
            self.storage
                .borrow_mut()
                .resize_preserving(cols, rows, self.background);
        }
        self.cursor.0 = self.cursor.0.min(cols.saturating_sub(1));
        self.cursor.1 = self.cursor.1.min(rows.saturating_sub(1));
    }

    fn fill(&self, rect: Rect, cell: Cell) {
        let Some(local) = rect.intersect(Rect::new(0, 0, self.cols(), self.rows())) else {
            return;
        };
        let target = Rect::new(
            self.offset.0 + local.x,
            self.offset.1 + local.y,
            local.width,
            local.height,
        );
        self.storage.borrow_mut().fill_rect(target, cell);
    }
}

// ─── WindowMut ──────────────────────────────────────────────────────────────

/// Drawing access to one window.
///
/// Coordinates are `(x, y)` relative to the window's top-left corner.
pub struct WindowMut<'a> {
    win: &'a mut Window,
    colors: &'a ColorRegistry,
}

impl<'a> WindowMut<'a> {
    pub(crate) const fn new(win: &'a mut Window, colors: &'a ColorRegistry) -> Self {
        Self { win, colors }
    }

    /// Read access to the window.
    #[must_use]
    pub fn window(&self) -> &Window {
        self.win
    }

    // ── Cursor ──────────────────────────────────────────────────────────

    /// Move the cursor to `(x, y)`.
    ///
    /// # Errors
    ///
    /// [`Error::Bounds`] if the position is outside the window.
    pub fn move_cursor(&mut self, x: u16, y: u16) -> Result<()> {
        self.check_point(x, y)?;
        self.win.cursor = (x, y);
        Ok(())
    }

    // ── Writing ─────────────────────────────────────────────────────────

    /// Put one character at `(x, y)`. The cursor does not move.
    ///
    /// `attrs` is combined with the window's active attributes; a color
    /// pair in `attrs` overrides the active pair.
    ///
    /// # Errors
    ///
    /// [`Error::Bounds`] outside the window; [`Error::Range`] if the color
    /// pair is not registered.
    pub fn write_char(&mut self, x: u16, y: u16, ch: char, attrs: Attr) -> Result<()> {
        self.check_point(x, y)?;
        let cell = self.compose(ch, attrs)?;
        self.put(x, y, cell);
        Ok(())
    }

    /// Write `text` starting at `(x, y)`, left to right.
    ///
    /// Output is clipped at the right edge; nothing wraps. Control
    /// characters are skipped. The cursor ends just after the last cell
    /// written, or on the last column if the text reached the edge.
    ///
    /// # Errors
    ///
    /// [`Error::Bounds`] if `(x, y)` is outside the window; [`Error::Range`]
    /// if the color pair is not registered. Nothing is written on error.
    pub fn write_str(&mut self, x: u16, y: u16, text: &str, attrs: Attr) -> Result<()> {
        self.check_point(x, y)?;
        let template = self.compose(' ', attrs)?;

        let cols = self.win.cols();
        let mut col = x;
        for ch in text.chars().filter(|c| !c.is_control()) {
            if col >= cols {
                break;
            }
            self.put(col, y, template.with_char(ch));
            col += 1;
        }
        self.win.cursor = (col.min(cols - 1), y);
        Ok(())
    }

    /// Formatted [`write_str`](Self::write_str).
    ///
    /// ```ignore
    /// win.write_fmt(0, 2, Attr::BOLD, format_args!("{count} items"))?;
    /// ```
    pub fn write_fmt(&mut self, x: u16, y: u16, attrs: Attr, args: fmt::Arguments<'_>) -> Result<()> {
        match args.as_str() {
            Some(s) => self.write_str(x, y, s, attrs),
            None => self.write_str(x, y, &args.to_string(), attrs),
        }
    }

    // ── Erasing ─────────────────────────────────────────────────────────

    /// Fill the window with its background cell.
    pub fn erase(&mut self) {
        self.win.fill(Rect::new(0, 0, self.win.cols(), self.win.rows()), self.win.background);
    }

    /// [`erase`](Self::erase), and repaint the whole terminal on the next
    /// refresh of this window.
    pub fn clear(&mut self) {
        self.erase();
        self.win.clear_pending = true;
    }

    /// Erase from the cursor to the end of its line.
    pub fn clear_to_eol(&mut self) {
        let (x, y) = self.win.cursor;
        self.win.fill(Rect::new(x, y, self.win.cols() - x, 1), self.win.background);
    }

    /// Erase from the cursor to the end of the window.
    pub fn clear_to_bottom(&mut self) {
        self.clear_to_eol();
        let below = self.win.cursor.1 + 1;
        self.win.fill(
            Rect::new(0, below, self.win.cols(), self.win.rows().saturating_sub(below)),
            self.win.background,
        );
    }

    /// Fill a window-relative rectangle with the background, clipped.
    pub fn erase_region(&mut self, x: u16, y: u16, width: u16, height: u16) {
        self.win.fill(Rect::new(x, y, width, height), self.win.background);
    }

    // ── Decoration ──────────────────────────────────────────────────────

    /// Draw a border along the window edges with the given side pieces
    /// and box-drawing corners. A window too thin for a full box gets
    /// whatever edges fit.
    ///
    /// # Errors
    ///
    /// [`Error::Range`] if the active color pair is not registered.
    pub fn draw_box(&mut self, vertical: char, horizontal: char) -> Result<()> {
        let base = self.compose(' ', Attr::NORMAL)?;
        let (w, h) = (self.win.cols(), self.win.rows());
        let (right, bottom) = (w - 1, h - 1);

        for x in 1..right {
            self.put(x, 0, base.with_char(horizontal));
            self.put(x, bottom, base.with_char(horizontal));
        }
        for y in 1..bottom {
            self.put(0, y, base.with_char(vertical));
            self.put(right, y, base.with_char(vertical));
        }
        let [tl, tr, bl, br] = BOX_CORNERS;
        self.put(0, 0, base.with_char(tl));
        self.put(right, 0, base.with_char(tr));
        self.put(0, bottom, base.with_char(bl));
        self.put(right, bottom, base.with_char(br));
        Ok(())
    }

    /// Set the background cell used by erasing, and restyle every cell
    /// currently showing the old background.
    ///
    /// # Errors
    ///
    /// [`Error::Range`] if the cell's pair is not registered.
    pub fn set_background(&mut self, cell: Cell) -> Result<()> {
        self.colors.validate(cell.pair)?;
        let old = self.win.background;
        let area = self.win.storage_rect();
        {
            let mut storage = self.win.storage.borrow_mut();
            for y in area.y..area.y + area.height {
                for x in area.x..area.x + area.width {
                    if let Some(slot) = storage.get_mut(x, y) {
                        if *slot == old {
                            *slot = cell;
                        }
                    }
                }
            }
        }
        self.win.background = cell;
        Ok(())
    }

    // ── Attribute state ─────────────────────────────────────────────────

    /// Turn attributes on. A color pair in `flags` replaces the active pair.
    ///
    /// # Errors
    ///
    /// [`Error::Range`] if the pair is not registered.
    pub fn attr_on(&mut self, flags: Attr) -> Result<()> {
        self.colors.validate(flags.pair())?;
        let pair = if flags.pair() == 0 {
            self.win.attrs.pair()
        } else {
            flags.pair()
        };
        self.win.attrs = self.win.attrs.without_pair() | flags.without_pair() | Attr::color_pair(pair);
        Ok(())
    }

    /// Turn attributes off. Any pair bits in `flags` reset the active pair
    /// to the default.
    pub fn attr_off(&mut self, flags: Attr) {
        let pair = if flags.pair() == 0 { self.win.attrs.pair() } else { 0 };
        self.win.attrs = (self.win.attrs.without_pair() - flags.without_pair()) | Attr::color_pair(pair);
    }

    /// Replace the active attribute state.
    ///
    /// # Errors
    ///
    /// [`Error::Range`] if the pair is not registered.
    pub fn attr_set(&mut self, flags: Attr) -> Result<()> {
        self.colors.validate(flags.pair())?;
        self.win.attrs = flags;
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn check_point(&self, x: u16, y: u16) -> Result<()> {
        if x < self.win.cols() && y < self.win.rows() {
            Ok(())
        } else {
            Err(Error::Bounds(format!(
                "({x}, {y}) outside {} of {}x{}",
                self.win.id,
                self.win.cols(),
                self.win.rows()
            )))
        }
    }

    /// The cell a write of `ch` with `attrs` produces: background style,
    /// then active attributes, then the call's own.
    fn compose(&self, ch: char, attrs: Attr) -> Result<Cell> {
        let active = self.win.attrs;
        let bg = self.win.background;
        let pair = [attrs.pair(), active.pair(), bg.pair]
            .into_iter()
            .find(|&p| p != 0)
            .unwrap_or(0);
        self.colors.validate(pair)?;
        let display = bg.attrs | active.without_pair() | attrs.without_pair();
        Ok(Cell::new(ch).with_attrs(display).with_pair(pair))
    }

    fn put(&self, x: u16, y: u16, cell: Cell) {
        self.win
            .storage
            .borrow_mut()
            .set(self.win.offset.0 + x, self.win.offset.1 + y, cell);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
