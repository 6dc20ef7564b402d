// SPDX-License-Identifier: MIT
//
// Session: the one object that owns a managed terminal.
//
// Holds the backend, the virtual screen, the color registry, every window,
// and the terminal modes. `initialize` puts the terminal into managed mode
// and creates the root window covering the screen; `end` (or dropping the
// session) puts it back.
//
// Windows live in an arena keyed by `WindowId`. Ids are never reused, and a
// deleted window leaves a tombstone so a stale id reports a state error
// instead of reaching some newer window. Deleting a window also orphans
// its descendants: their ids stay known but every operation on them fails.
//
// Single-threaded by construction: window storage is `Rc`-shared, which
// makes `Session` `!Send`. Callers on several threads must serialize
// access themselves.

use std::collections::BTreeMap;

use crate::backend::{Backend, CursorVisibility, Size};
use crate::buffer::Rect;
use crate::cell::Attr;
use crate::color::{Color, ColorRegistry};
use crate::config::SessionConfig;
use crate::diff::RenderStats;
use crate::error::{Error, Result};
use crate::input::{Key, Parser};
use crate::screen::Screen;
use crate::window::{InputTimeout, Window, WindowId, WindowMut};

/// Bytes taken from the backend per read.
const READ_CHUNK: usize = 64;

#[derive(Debug)]
enum Slot {
    Live(Window),
    /// An ancestor was deleted; the window's storage is gone.
    Orphaned,
    Deleted,
}

/// A managed terminal.
pub struct Session<B: Backend> {
    backend: B,
    config: SessionConfig,
    size: Size,
    screen: Screen,
    colors: ColorRegistry,
    windows: BTreeMap<WindowId, Slot>,
    next_id: usize,
    root: WindowId,
    echo: bool,
    cbreak: bool,
    cursor: CursorVisibility,
    /// Bytes read but not yet delivered, shared by all windows.
    input: Parser,
    active: bool,
}

impl<B: Backend> Session<B> {
    // ─── Lifecycle ──────────────────────────────────────────────────────

    /// Take over `backend` with the default configuration.
    ///
    /// Returns the session and its root window, which covers the screen.
    ///
    /// # Errors
    ///
    /// [`Error::Driver`] if the backend fails or reports a zero size.
    pub fn initialize(backend: B) -> Result<(Self, WindowId)> {
        Self::initialize_with(backend, SessionConfig::default())
    }

    /// Take over `backend` with `config`.
    ///
    /// # Errors
    ///
    /// [`Error::Driver`] if the backend fails or reports a zero size. A
    /// failure after entering managed mode restores the terminal first.
    pub fn initialize_with(mut backend: B, config: SessionConfig) -> Result<(Self, WindowId)> {
        let size = backend
            .size()
            .map_err(|e| Error::io("query terminal size", e))?;
        if size.is_empty() {
            return Err(Error::driver(format!(
                "terminal reports a {}x{} screen",
                size.cols, size.rows
            )));
        }

        backend
            .enter(config.alternate_screen)
            .map_err(|e| Error::io("enter managed mode", e))?;
        if let Err(err) = Self::apply_startup_modes(&mut backend, &config) {
            // Best effort: the setup error is the one worth reporting.
            let _ = backend.leave();
            return Err(err);
        }

        let root = WindowId(0);
        let mut windows = BTreeMap::new();
        windows.insert(
            root,
            Slot::Live(Window::new(root, Rect::new(0, 0, size.cols, size.rows), config.keypad)),
        );

        tracing::debug!(cols = size.cols, rows = size.rows, "session initialized");

        let session = Self {
            screen: Screen::new(size.cols, size.rows),
            colors: ColorRegistry::new(),
            windows,
            next_id: 1,
            root,
            echo: config.echo,
            cbreak: config.cbreak,
            cursor: config.cursor,
            input: Parser::new(),
            active: true,
            size,
            config,
            backend,
        };
        Ok((session, root))
    }

    fn apply_startup_modes(backend: &mut B, config: &SessionConfig) -> Result<()> {
        backend
            .set_cbreak(config.cbreak)
            .map_err(|e| Error::io("set cbreak mode", e))?;
        if config.cursor != CursorVisibility::Normal {
            backend
                .set_cursor_visibility(config.cursor)
                .map_err(|e| Error::io("set cursor visibility", e))?;
        }
        if config.keypad {
            backend
                .set_keypad(true)
                .map_err(|e| Error::io("enable keypad", e))?;
        }
        Ok(())
    }

    /// Restore the terminal. The session is unusable afterwards.
    ///
    /// # Errors
    ///
    /// [`Error::State`] if already ended; [`Error::Driver`] if the backend
    /// could not restore the terminal (the session is ended regardless).
    pub fn end(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.active = false;
        tracing::debug!("session ended");
        self.backend
            .leave()
            .map_err(|e| Error::io("restore terminal", e))
    }

    /// Whether `end` has not been called yet.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    // ─── Accessors ──────────────────────────────────────────────────────

    /// The full-screen window created by `initialize`.
    #[must_use]
    pub const fn root(&self) -> WindowId {
        self.root
    }

    /// Screen size at initialization.
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub const fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[must_use]
    pub const fn colors(&self) -> &ColorRegistry {
        &self.colors
    }

    #[must_use]
    pub const fn screen(&self) -> &Screen {
        &self.screen
    }

    // ─── Windows ────────────────────────────────────────────────────────

    /// Read a window.
    ///
    /// # Errors
    ///
    /// [`Error::State`] if the session ended or the window was deleted or
    /// orphaned.
    pub fn window(&self, id: WindowId) -> Result<&Window> {
        self.ensure_active()?;
        live(&self.windows, id)
    }

    /// Draw on a window.
    ///
    /// # Errors
    ///
    /// As [`window`](Self::window).
    pub fn window_mut(&mut self, id: WindowId) -> Result<WindowMut<'_>> {
        self.ensure_active()?;
        let win = live_mut(&mut self.windows, id)?;
        Ok(WindowMut::new(win, &self.colors))
    }

    /// A new top-level window with blank storage, at absolute `(y, x)`.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`] if `rows` or `cols` is zero or the window
    /// does not fit on the screen.
    pub fn new_window(&mut self, rows: u16, cols: u16, y: u16, x: u16) -> Result<WindowId> {
        self.ensure_active()?;
        let region = Rect::new(x, y, cols, rows);
        self.check_top_level(region)?;
        let id = self.allocate_id();
        self.windows
            .insert(id, Slot::Live(Window::new(id, region, self.config.keypad)));
        tracing::debug!(%id, rows, cols, y, x, "window created");
        Ok(id)
    }

    /// A subwindow of `parent` at absolute screen `(y, x)`, sharing the
    /// parent's cells.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`] for a zero extent; [`Error::Bounds`] if the
    /// region is not inside the parent; [`Error::State`] for a dead parent.
    pub fn sub_window(
        &mut self,
        parent: WindowId,
        rows: u16,
        cols: u16,
        y: u16,
        x: u16,
    ) -> Result<WindowId> {
        self.ensure_active()?;
        if rows == 0 || cols == 0 {
            return Err(Error::Allocation(format!("{rows}x{cols} subwindow")));
        }
        let region = Rect::new(x, y, cols, rows);
        if !live(&self.windows, parent)?.region().contains_rect(region) {
            return Err(Error::Bounds(format!(
                "{rows}x{cols} at ({x}, {y}) does not fit in {parent}"
            )));
        }

        let id = self.allocate_id();
        let child = Window::sub(id, live(&self.windows, parent)?, region);
        live_mut(&mut self.windows, parent)?.add_child(id);
        self.windows.insert(id, Slot::Live(child));
        tracing::debug!(%id, %parent, rows, cols, y, x, "subwindow created");
        Ok(id)
    }

    /// A subwindow positioned relative to the parent's origin.
    ///
    /// # Errors
    ///
    /// As [`sub_window`](Self::sub_window).
    pub fn derived_window(
        &mut self,
        parent: WindowId,
        rows: u16,
        cols: u16,
        y: u16,
        x: u16,
    ) -> Result<WindowId> {
        self.ensure_active()?;
        let origin = live(&self.windows, parent)?.region();
        let (Some(abs_y), Some(abs_x)) = (origin.y.checked_add(y), origin.x.checked_add(x)) else {
            return Err(Error::Bounds(format!(
                "offset ({x}, {y}) overflows from {parent}"
            )));
        };
        self.sub_window(parent, rows, cols, abs_y, abs_x)
    }

    /// Change a window's extent, keeping its origin and the overlapping
    /// content.
    ///
    /// # Errors
    ///
    /// - [`Error::Allocation`] for a zero extent, or a top-level window
    ///   that would leave the screen.
    /// - [`Error::Bounds`] if a subwindow would leave its parent or the
    ///   window would no longer contain one of its subwindows.
    pub fn resize_window(&mut self, id: WindowId, rows: u16, cols: u16) -> Result<()> {
        self.ensure_active()?;
        let win = live(&self.windows, id)?;
        let old = win.region();
        let region = Rect::new(old.x, old.y, cols, rows);

        match win.parent() {
            None => self.check_top_level(region)?,
            Some(parent) => {
                if rows == 0 || cols == 0 {
                    return Err(Error::Allocation(format!("{rows}x{cols} subwindow")));
                }
                if !live(&self.windows, parent)?.region().contains_rect(region) {
                    return Err(Error::Bounds(format!(
                        "{rows}x{cols} would leave parent {parent}"
                    )));
                }
            }
        }
        for &child in win.children() {
            let child_region = live(&self.windows, child)?.region();
            if !region.contains_rect(child_region) {
                return Err(Error::Bounds(format!("{rows}x{cols} would cut off {child}")));
            }
        }

        live_mut(&mut self.windows, id)?.resize(rows, cols);
        tracing::debug!(%id, rows, cols, "window resized");
        Ok(())
    }

    /// Delete a window. Its subwindows become unusable.
    ///
    /// # Errors
    ///
    /// [`Error::State`] for the root window, an unknown id, or a window
    /// already deleted or orphaned.
    pub fn delete_window(&mut self, id: WindowId) -> Result<()> {
        self.ensure_active()?;
        if id == self.root {
            return Err(Error::State("the root window cannot be deleted".into()));
        }
        let parent = live(&self.windows, id)?.parent();

        let mut doomed = vec![id];
        let mut orphans = Vec::new();
        while let Some(next) = doomed.pop() {
            if let Some(Slot::Live(win)) = self.windows.get(&next) {
                doomed.extend_from_slice(win.children());
                if next != id {
                    orphans.push(next);
                }
            }
        }
        for orphan in orphans {
            self.windows.insert(orphan, Slot::Orphaned);
        }
        self.windows.insert(id, Slot::Deleted);
        if let Some(Slot::Live(p)) = parent.and_then(|p| self.windows.get_mut(&p)) {
            p.remove_child(id);
        }
        tracing::debug!(%id, "window deleted");
        Ok(())
    }

    // ─── Screen ─────────────────────────────────────────────────────────

    /// Copy a window into the virtual screen without touching the
    /// terminal.
    ///
    /// # Errors
    ///
    /// [`Error::State`] for a dead window or ended session.
    pub fn stage(&mut self, id: WindowId) -> Result<()> {
        self.ensure_active()?;
        let win = live_mut(&mut self.windows, id)?;
        self.screen.stage(win);
        Ok(())
    }

    /// Send the virtual screen to the terminal.
    ///
    /// # Errors
    ///
    /// [`Error::Driver`] if the backend fails.
    pub fn update(&mut self) -> Result<RenderStats> {
        self.ensure_active()?;
        self.screen.update(&mut self.backend, &self.colors)
    }

    /// Mark every row of a window as garbled on the terminal, so the next
    /// update resends it.
    ///
    /// # Errors
    ///
    /// [`Error::State`] for a dead window or ended session.
    pub fn redraw_window(&mut self, id: WindowId) -> Result<()> {
        self.ensure_active()?;
        let rows = live(&self.windows, id)?.rows();
        self.redraw_lines(id, 0, rows)
    }

    /// Mark `count` rows of a window, starting at window row `start`, as
    /// garbled on the terminal.
    ///
    /// # Errors
    ///
    /// [`Error::Bounds`] if the rows run past the window; [`Error::State`]
    /// for a dead window or ended session.
    pub fn redraw_lines(&mut self, id: WindowId, start: u16, count: u16) -> Result<()> {
        self.ensure_active()?;
        let region = live(&self.windows, id)?.region();
        let end = start
            .checked_add(count)
            .filter(|&end| end <= region.height)
            .ok_or_else(|| {
                Error::Bounds(format!(
                    "rows {start}..+{count} outside {id} with {} rows",
                    region.height
                ))
            })?;
        self.screen.invalidate_rows(region.y + start..region.y + end);
        tracing::trace!(%id, start, count, "rows marked for redraw");
        Ok(())
    }

    /// [`stage`](Self::stage) then [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// As those two.
    pub fn refresh(&mut self, id: WindowId) -> Result<RenderStats> {
        self.stage(id)?;
        self.update()
    }

    // ─── Colors ─────────────────────────────────────────────────────────

    /// Turn on color mode.
    ///
    /// # Errors
    ///
    /// [`Error::Capability`] on a terminal without colors; the registry is
    /// left as it was.
    pub fn enable_color(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.colors.enable(&self.backend.capabilities())
    }

    /// Define color pair `id`.
    ///
    /// # Errors
    ///
    /// [`Error::State`] before [`enable_color`](Self::enable_color);
    /// [`Error::Range`] for id 0 or an id past the terminal's limit.
    pub fn register_color_pair(&mut self, id: u8, fg: Color, bg: Color) -> Result<()> {
        self.ensure_active()?;
        self.colors.register(id, fg, bg)
    }

    /// The attribute that selects pair `id` when OR-ed into a write.
    #[must_use]
    pub const fn color_pair_attribute(&self, id: u8) -> Attr {
        ColorRegistry::attribute(id)
    }

    // ─── Terminal Modes ─────────────────────────────────────────────────

    /// Echo printable keys read through [`read_key`](Self::read_key).
    ///
    /// # Errors
    ///
    /// [`Error::State`] after [`end`](Self::end).
    pub fn set_echo(&mut self, on: bool) -> Result<()> {
        self.ensure_active()?;
        self.echo = on;
        Ok(())
    }

    #[must_use]
    pub const fn echo(&self) -> bool {
        self.echo
    }

    /// Deliver keys immediately (`true`) or line by line.
    ///
    /// # Errors
    ///
    /// [`Error::Driver`] if the backend refuses.
    pub fn set_cbreak(&mut self, on: bool) -> Result<()> {
        self.ensure_active()?;
        self.backend
            .set_cbreak(on)
            .map_err(|e| Error::io("set cbreak mode", e))?;
        self.cbreak = on;
        Ok(())
    }

    #[must_use]
    pub const fn cbreak(&self) -> bool {
        self.cbreak
    }

    /// Hide, show, or emphasize the hardware cursor.
    ///
    /// # Errors
    ///
    /// [`Error::Driver`] if the terminal cannot change cursor visibility.
    pub fn set_cursor_visibility(&mut self, visibility: CursorVisibility) -> Result<()> {
        self.ensure_active()?;
        self.backend
            .set_cursor_visibility(visibility)
            .map_err(|e| Error::io("set cursor visibility", e))?;
        self.cursor = visibility;
        Ok(())
    }

    #[must_use]
    pub const fn cursor_visibility(&self) -> CursorVisibility {
        self.cursor
    }

    // ─── Input ──────────────────────────────────────────────────────────

    /// How long [`read_key`](Self::read_key) waits on this window: negative
    /// blocks, zero polls, positive is a bound in milliseconds.
    ///
    /// # Errors
    ///
    /// [`Error::State`] for a dead window.
    pub fn set_timeout(&mut self, id: WindowId, ms: i32) -> Result<()> {
        self.ensure_active()?;
        live_mut(&mut self.windows, id)?.set_timeout(InputTimeout::from_millis(ms));
        Ok(())
    }

    /// Decode function and cursor keys on this window.
    ///
    /// # Errors
    ///
    /// [`Error::Driver`] if the terminal has no keypad mode.
    pub fn enable_keypad(&mut self, id: WindowId, on: bool) -> Result<()> {
        self.ensure_active()?;
        live(&self.windows, id)?;
        self.backend
            .set_keypad(on)
            .map_err(|e| Error::io("set keypad mode", e))?;
        live_mut(&mut self.windows, id)?.set_keypad(on);
        Ok(())
    }

    /// Read one key for a window, honoring its timeout and keypad mode.
    ///
    /// `Ok(None)` means the timeout passed with no input. Input left over
    /// from an earlier read is decoded in this window's keypad mode, not
    /// the mode of the window that read it.
    ///
    /// # Errors
    ///
    /// [`Error::Driver`] if the read fails; [`Error::State`] for a dead
    /// window.
    pub fn read_key(&mut self, id: WindowId) -> Result<Option<Key>> {
        self.ensure_active()?;
        let win = live(&self.windows, id)?;
        let (keypad, timeout) = (win.keypad(), win.timeout());

        let key = if keypad {
            self.read_decoded(timeout)?
        } else {
            self.read_raw(timeout)?
        };

        if let Some(key) = key {
            tracing::trace!(?key, %id, "key");
            if self.echo {
                self.echo_key(id, key)?;
            }
        }
        Ok(key)
    }

    fn read_raw(&mut self, timeout: InputTimeout) -> Result<Option<Key>> {
        if let Some(key) = self.input.next_raw_key() {
            return Ok(Some(key));
        }
        let mut buf = [0u8; READ_CHUNK];
        let n = self
            .backend
            .read(&mut buf, timeout.duration())
            .map_err(|e| Error::io("read input", e))?;
        self.input.push(&buf[..n]);
        Ok(self.input.next_raw_key())
    }

    fn read_decoded(&mut self, timeout: InputTimeout) -> Result<Option<Key>> {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            if let Some(key) = self.input.next_key() {
                return Ok(Some(key));
            }
            // An incomplete sequence only waits the escape delay for its
            // remainder.
            let wait = if self.input.has_pending() {
                Some(self.config.escape_delay())
            } else {
                timeout.duration()
            };
            let n = self
                .backend
                .read(&mut buf, wait)
                .map_err(|e| Error::io("read input", e))?;

            if n > 0 {
                self.input.push(&buf[..n]);
            } else if self.input.has_pending() {
                return Ok(self.input.flush_next());
            } else {
                return Ok(None);
            }
        }
    }

    fn echo_key(&mut self, id: WindowId, key: Key) -> Result<()> {
        let Some(ch) = key.printable() else {
            return Ok(());
        };
        let mut win = self.window_mut(id)?;
        let (x, y) = win.window().cursor();
        win.write_str(x, y, ch.encode_utf8(&mut [0; 4]), Attr::NORMAL)
    }

    // ─── Internals ──────────────────────────────────────────────────────

    fn ensure_active(&self) -> Result<()> {
        if self.active {
            Ok(())
        } else {
            Err(Error::State("session has ended".into()))
        }
    }

    fn allocate_id(&mut self) -> WindowId {
        let id = WindowId(self.next_id);
        self.next_id += 1;
        id
    }

    fn check_top_level(&self, region: Rect) -> Result<()> {
        if region.is_empty() {
            return Err(Error::Allocation(format!(
                "{}x{} window",
                region.height, region.width
            )));
        }
        let screen = Rect::new(0, 0, self.size.cols, self.size.rows);
        if !screen.contains_rect(region) {
            return Err(Error::Allocation(format!(
                "{}x{} at ({}, {}) does not fit a {}x{} screen",
                region.height, region.width, region.x, region.y, self.size.rows, self.size.cols
            )));
        }
        Ok(())
    }
}

impl<B: Backend> Drop for Session<B> {
    fn drop(&mut self) {
        if self.active {
            self.active = false;
            if let Err(err) = self.backend.leave() {
                tracing::warn!(%err, "terminal restore on drop failed");
            }
        }
    }
}

impl<B: Backend> std::fmt::Debug for Session<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("size", &self.size)
            .field("windows", &self.windows.len())
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

fn live(windows: &BTreeMap<WindowId, Slot>, id: WindowId) -> Result<&Window> {
    match windows.get(&id) {
        Some(Slot::Live(win)) => Ok(win),
        Some(Slot::Orphaned) => Err(Error::State(format!("{id} belongs to a deleted window"))),
        Some(Slot::Deleted) => Err(Error::State(format!("{id} was deleted"))),
        None => Err(Error::State(format!("{id} does not exist"))),
    }
}

fn live_mut(windows: &mut BTreeMap<WindowId, Slot>, id: WindowId) -> Result<&mut Window> {
    match windows.get_mut(&id) {
        Some(Slot::Live(win)) => Ok(win),
        Some(Slot::Orphaned) => Err(Error::State(format!("{id} belongs to a deleted window"))),
        Some(Slot::Deleted) => Err(Error::State(format!("{id} was deleted"))),
        None => Err(Error::State(format!("{id} does not exist"))),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Capabilities, TestBackend};
    use crate::cell::Cell;
    use crate::color::ColorPair;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn session(cols: u16, rows: u16) -> (Session<TestBackend>, WindowId) {
        Session::initialize(TestBackend::new(cols, rows)).unwrap()
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    #[test]
    fn initialize_enters_and_creates_root() {
        let (s, root) = session(20, 5);
        assert!(s.backend().entered());
        assert!(s.backend().alternate_screen());
        assert!(s.backend().cbreak());
        let win = s.window(root).unwrap();
        assert_eq!(win.region(), Rect::new(0, 0, 20, 5));
    }

    #[test]
    fn zero_size_terminal_is_driver_error() {
        let err = Session::initialize(TestBackend::new(0, 10)).unwrap_err();
        assert!(matches!(err, Error::Driver { .. }));
    }

    #[test]
    fn failed_startup_mode_restores_terminal() {
        let caps = Capabilities {
            cursor_visibility: false,
            ..Capabilities::ANSI
        };
        let config = SessionConfig {
            cursor: CursorVisibility::Hidden,
            ..SessionConfig::default()
        };
        let backend = TestBackend::new(4, 4).with_capabilities(caps);
        let err = Session::initialize_with(backend, config).unwrap_err();
        assert!(matches!(err, Error::Driver { .. }));
    }

    #[test]
    fn end_restores_and_blocks_further_calls() {
        let (mut s, root) = session(10, 3);
        s.end().unwrap();
        assert!(!s.backend().entered());
        assert!(matches!(s.end(), Err(Error::State(_))));
        assert!(matches!(s.window(root), Err(Error::State(_))));
        assert!(matches!(s.refresh(root), Err(Error::State(_))));
        assert!(matches!(s.set_echo(true), Err(Error::State(_))));
        assert!(matches!(s.enable_color(), Err(Error::State(_))));
    }

    #[test]
    fn drop_leaves_managed_mode() {
        let mut term = TestBackend::new(4, 4);
        {
            let (s, _) = Session::initialize(&mut term).unwrap();
            assert!(s.is_active());
        }
        assert!(!term.entered());
    }

    // ── Windows ─────────────────────────────────────────────────────────

    #[test]
    fn new_window_validates_extent() {
        let (mut s, _) = session(20, 10);
        assert!(matches!(s.new_window(0, 5, 0, 0), Err(Error::Allocation(_))));
        assert!(matches!(s.new_window(5, 0, 0, 0), Err(Error::Allocation(_))));
        assert!(matches!(s.new_window(5, 5, 8, 0), Err(Error::Allocation(_))));
        let id = s.new_window(5, 5, 5, 15).unwrap();
        assert_eq!(s.window(id).unwrap().region(), Rect::new(15, 5, 5, 5));
    }

    #[test]
    fn ids_are_never_reused() {
        let (mut s, _) = session(20, 10);
        let a = s.new_window(2, 2, 0, 0).unwrap();
        s.delete_window(a).unwrap();
        let b = s.new_window(2, 2, 0, 0).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn sub_window_must_lie_in_parent() {
        let (mut s, _) = session(40, 20);
        let parent = s.new_window(10, 20, 5, 5).unwrap();
        let child = s.sub_window(parent, 4, 10, 6, 6).unwrap();
        assert!(s
            .window(parent)
            .unwrap()
            .region()
            .contains_rect(s.window(child).unwrap().region()));
        assert_eq!(s.window(parent).unwrap().children(), &[child]);
        assert_eq!(s.window(child).unwrap().parent(), Some(parent));

        assert!(matches!(s.sub_window(parent, 4, 10, 0, 0), Err(Error::Bounds(_))));
        assert!(matches!(s.sub_window(parent, 11, 1, 5, 5), Err(Error::Bounds(_))));
    }

    #[test]
    fn derived_window_is_relative() {
        let (mut s, _) = session(40, 20);
        let parent = s.new_window(10, 20, 5, 5).unwrap();
        let child = s.derived_window(parent, 2, 3, 1, 2).unwrap();
        assert_eq!(s.window(child).unwrap().region(), Rect::new(7, 6, 3, 2));
        assert!(matches!(s.derived_window(parent, 2, 3, 9, 0), Err(Error::Bounds(_))));
    }

    #[test]
    fn sub_window_shares_cells() {
        let (mut s, root) = session(10, 4);
        let child = s.derived_window(root, 1, 5, 2, 3).unwrap();
        s.window_mut(child)
            .unwrap()
            .write_str(0, 0, "hello", Attr::NORMAL)
            .unwrap();
        assert_eq!(s.window(root).unwrap().row_text(2), "   hello  ");
    }

    #[test]
    fn resize_changes_extent_and_keeps_overlap() {
        let (mut s, _) = session(30, 10);
        let id = s.new_window(3, 6, 1, 1).unwrap();
        s.window_mut(id)
            .unwrap()
            .write_str(0, 0, "abcdef", Attr::NORMAL)
            .unwrap();

        s.resize_window(id, 5, 4).unwrap();

        let win = s.window(id).unwrap();
        assert_eq!((win.rows(), win.cols()), (5, 4));
        assert_eq!(win.row_text(0), "abcd");
        assert_eq!(win.row_text(4), "    ");
    }

    #[test]
    fn resize_respects_parent_and_children() {
        let (mut s, _) = session(30, 10);
        let parent = s.new_window(6, 10, 0, 0).unwrap();
        let child = s.sub_window(parent, 3, 8, 1, 1).unwrap();

        assert!(matches!(s.resize_window(child, 3, 10), Err(Error::Bounds(_))));
        assert!(matches!(s.resize_window(parent, 6, 5), Err(Error::Bounds(_))));
        assert!(matches!(s.resize_window(parent, 0, 5), Err(Error::Allocation(_))));
        s.resize_window(child, 4, 9).unwrap();
        s.resize_window(parent, 8, 12).unwrap();
    }

    #[test]
    fn double_delete_is_state_error() {
        let (mut s, _) = session(20, 10);
        let id = s.new_window(2, 2, 0, 0).unwrap();
        s.delete_window(id).unwrap();
        assert!(matches!(s.delete_window(id), Err(Error::State(_))));
        assert!(matches!(s.window_mut(id), Err(Error::State(_))));
    }

    #[test]
    fn root_cannot_be_deleted() {
        let (mut s, root) = session(20, 10);
        assert!(matches!(s.delete_window(root), Err(Error::State(_))));
        assert!(s.window(root).is_ok());
    }

    #[test]
    fn deleting_parent_orphans_descendants() {
        let (mut s, _) = session(20, 10);
        let parent = s.new_window(8, 8, 0, 0).unwrap();
        let child = s.sub_window(parent, 4, 4, 1, 1).unwrap();
        let grandchild = s.sub_window(child, 2, 2, 2, 2).unwrap();

        s.delete_window(parent).unwrap();

        assert!(matches!(s.window(child), Err(Error::State(_))));
        assert!(matches!(s.window(grandchild), Err(Error::State(_))));
        assert!(matches!(s.delete_window(child), Err(Error::State(_))));
    }

    #[test]
    fn deleting_child_unlinks_it() {
        let (mut s, root) = session(20, 10);
        let child = s.sub_window(root, 2, 2, 0, 0).unwrap();
        s.delete_window(child).unwrap();
        assert!(s.window(root).unwrap().children().is_empty());
    }

    // ── Refresh ─────────────────────────────────────────────────────────

    #[test]
    fn refresh_draws_window() {
        let (mut s, root) = session(8, 2);
        let id = s.new_window(1, 4, 1, 2).unwrap();
        s.window_mut(id)
            .unwrap()
            .write_str(0, 0, "ok", Attr::NORMAL)
            .unwrap();
        s.refresh(root).unwrap();
        s.refresh(id).unwrap();

        assert_eq!(s.backend().row_text(1), "  ok    ");
        assert_eq!(s.backend().cursor(), (4, 1));
    }

    #[test]
    fn redraw_lines_resends_only_those_rows() {
        let (mut s, root) = session(6, 4);
        let id = s.new_window(2, 6, 1, 0).unwrap();
        s.window_mut(id).unwrap().write_str(0, 1, "line", Attr::NORMAL).unwrap();
        s.refresh(root).unwrap();
        s.refresh(id).unwrap();

        s.backend_mut().reset_counters();
        s.refresh(id).unwrap();
        assert_eq!(s.backend().puts(), 0);

        s.redraw_lines(id, 1, 1).unwrap();
        let stats = s.refresh(id).unwrap();
        assert!(!stats.full_redraw);
        assert_eq!(s.backend().puts(), 6);
        assert_eq!(s.backend().row_text(2), "line  ");
    }

    #[test]
    fn redraw_window_resends_every_window_row() {
        let (mut s, root) = session(6, 4);
        let id = s.new_window(2, 3, 1, 0).unwrap();
        s.refresh(root).unwrap();
        s.refresh(id).unwrap();

        s.backend_mut().reset_counters();
        s.redraw_window(id).unwrap();
        s.refresh(id).unwrap();
        // whole screen rows, not just the window's columns
        assert_eq!(s.backend().puts(), 12);
    }

    #[test]
    fn redraw_lines_past_window_is_bounds_error() {
        let (mut s, _) = session(6, 4);
        let id = s.new_window(2, 3, 1, 0).unwrap();
        assert!(matches!(s.redraw_lines(id, 1, 2), Err(Error::Bounds(_))));
        assert!(matches!(s.redraw_lines(id, u16::MAX, 2), Err(Error::Bounds(_))));
        s.redraw_lines(id, 2, 0).unwrap();
    }

    #[test]
    fn staged_windows_appear_in_one_update() {
        let (mut s, _) = session(6, 2);
        let a = s.new_window(1, 3, 0, 0).unwrap();
        let b = s.new_window(1, 3, 1, 3).unwrap();
        s.window_mut(a).unwrap().write_str(0, 0, "aaa", Attr::NORMAL).unwrap();
        s.window_mut(b).unwrap().write_str(0, 0, "bbb", Attr::NORMAL).unwrap();

        s.stage(a).unwrap();
        s.stage(b).unwrap();
        assert_eq!(s.backend().flushes(), 0);
        s.update().unwrap();

        assert_eq!(s.backend().screen_text(), vec!["aaa   ".to_string(), "   bbb".to_string()]);
        assert_eq!(s.backend().flushes(), 1);
    }

    #[test]
    fn clear_and_refresh_leaves_background() {
        let (mut s, root) = session(5, 3);
        s.enable_color().unwrap();
        s.register_color_pair(1, Color::Yellow, Color::Blue).unwrap();
        let bg = Cell::new(' ').with_pair(1);
        {
            let mut w = s.window_mut(root).unwrap();
            w.write_str(0, 1, "junk", Attr::BOLD).unwrap();
            w.set_background(bg).unwrap();
            w.clear();
        }
        s.refresh(root).unwrap();

        for y in 0..3 {
            for x in 0..5 {
                assert_eq!(s.backend().cell(x, y), Some(bg));
                assert_eq!(
                    s.backend().colors_at(x, y),
                    Some(ColorPair::new(Color::Yellow, Color::Blue))
                );
            }
        }
    }

    // ── Colors ──────────────────────────────────────────────────────────

    #[test]
    fn color_pair_attribute_resolves_registered_colors() {
        let (mut s, root) = session(4, 1);
        s.enable_color().unwrap();
        s.register_color_pair(1, Color::White, Color::Black).unwrap();
        let attr = s.color_pair_attribute(1);
        s.window_mut(root)
            .unwrap()
            .write_char(0, 0, 'c', attr)
            .unwrap();
        s.refresh(root).unwrap();

        let cell = s.window(root).unwrap().cell(0, 0).unwrap();
        assert_eq!(
            s.colors().resolve_cell(&cell),
            ColorPair::new(Color::White, Color::Black)
        );
        assert_eq!(
            s.backend().colors_at(0, 0),
            Some(ColorPair::new(Color::White, Color::Black))
        );
    }

    #[test]
    fn enable_color_without_capability_leaves_registry() {
        let backend = TestBackend::new(4, 1).with_capabilities(Capabilities::MONOCHROME);
        let (mut s, _) = Session::initialize(backend).unwrap();
        let before = s.colors().clone();
        assert!(matches!(s.enable_color(), Err(Error::Capability(_))));
        assert_eq!(s.colors(), &before);
        assert!(!s.colors().is_enabled());
    }

    #[test]
    fn register_before_enable_is_state_error() {
        let (mut s, _) = session(4, 1);
        assert!(matches!(
            s.register_color_pair(1, Color::Red, Color::Black),
            Err(Error::State(_))
        ));
        s.enable_color().unwrap();
        assert!(matches!(
            s.register_color_pair(0, Color::Red, Color::Black),
            Err(Error::Range { .. })
        ));
        assert!(matches!(
            s.register_color_pair(64, Color::Red, Color::Black),
            Err(Error::Range { .. })
        ));
    }

    // ── Modes ───────────────────────────────────────────────────────────

    #[test]
    fn cursor_visibility_reaches_backend() {
        let (mut s, _) = session(4, 1);
        s.set_cursor_visibility(CursorVisibility::Hidden).unwrap();
        assert_eq!(s.backend().cursor_visibility(), CursorVisibility::Hidden);
        assert_eq!(s.cursor_visibility(), CursorVisibility::Hidden);
    }

    #[test]
    fn unsupported_cursor_visibility_is_driver_error() {
        let caps = Capabilities {
            cursor_visibility: false,
            ..Capabilities::ANSI
        };
        let backend = TestBackend::new(4, 1).with_capabilities(caps);
        let (mut s, _) = Session::initialize(backend).unwrap();
        let err = s.set_cursor_visibility(CursorVisibility::HighVisibility).unwrap_err();
        assert!(matches!(err, Error::Driver { .. }));
        assert_eq!(s.cursor_visibility(), CursorVisibility::Normal);
    }

    #[test]
    fn echo_and_cbreak_are_independent() {
        let (mut s, _) = session(4, 1);
        s.set_echo(true).unwrap();
        s.set_cbreak(false).unwrap();
        assert!(s.echo());
        assert!(!s.cbreak());
        assert!(!s.backend().cbreak());
        s.set_echo(false).unwrap();
        assert!(!s.echo());
        assert!(!s.cbreak());
    }

    // ── Input ───────────────────────────────────────────────────────────

    #[test]
    fn raw_mode_delivers_bytes() {
        let (mut s, root) = session(4, 1);
        s.backend_mut().push_input(b"a\x1b[A".to_vec());
        let keys: Vec<_> = (0..4).map(|_| s.read_key(root).unwrap()).collect();
        assert_eq!(
            keys,
            vec![
                Some(Key::Char('a')),
                Some(Key::Byte(0x1b)),
                Some(Key::Char('[')),
                Some(Key::Char('A')),
            ]
        );
    }

    #[test]
    fn keypad_mode_decodes_sequences() {
        let (mut s, root) = session(4, 1);
        s.enable_keypad(root, true).unwrap();
        assert!(s.backend().keypad());
        s.backend_mut().push_input(b"\x1b[B".to_vec());
        s.backend_mut().push_input(b"\x1bO".to_vec());
        s.backend_mut().push_input(b"P".to_vec());
        assert_eq!(s.read_key(root).unwrap(), Some(Key::Down));
        assert_eq!(s.read_key(root).unwrap(), Some(Key::F(1)));
    }

    #[test]
    fn leftover_input_decodes_in_reading_window_mode() {
        let (mut s, root) = session(8, 4);
        let plain = s.new_window(1, 4, 2, 0).unwrap();
        s.enable_keypad(root, true).unwrap();
        s.backend_mut().push_input(b"x\x1b[Ay\x1b[B".to_vec());

        assert_eq!(s.read_key(root).unwrap(), Some(Key::Char('x')));
        let raw: Vec<_> = (0..3).map(|_| s.read_key(plain).unwrap()).collect();
        assert_eq!(
            raw,
            vec![Some(Key::Byte(0x1b)), Some(Key::Char('[')), Some(Key::Char('A'))]
        );
        assert_eq!(s.read_key(root).unwrap(), Some(Key::Char('y')));
        assert_eq!(s.read_key(root).unwrap(), Some(Key::Down));
    }

    #[test]
    fn lone_escape_resolves_after_delay() {
        let (mut s, root) = session(4, 1);
        s.enable_keypad(root, true).unwrap();
        s.set_timeout(root, 0).unwrap();
        s.backend_mut().push_input(b"\x1b".to_vec());
        assert_eq!(s.read_key(root).unwrap(), Some(Key::Escape));
    }

    #[test]
    fn unsupported_keypad_is_driver_error() {
        let caps = Capabilities {
            keypad: false,
            ..Capabilities::ANSI
        };
        let backend = TestBackend::new(4, 1).with_capabilities(caps);
        let (mut s, root) = Session::initialize(backend).unwrap();
        assert!(matches!(s.enable_keypad(root, true), Err(Error::Driver { .. })));
        assert!(!s.window(root).unwrap().keypad());
    }

    #[test]
    fn timeout_with_no_input_is_none() {
        let (mut s, root) = session(4, 1);
        s.set_timeout(root, 0).unwrap();
        assert_eq!(s.read_key(root).unwrap(), None);
        s.set_timeout(root, 10).unwrap();
        assert_eq!(
            s.window(root).unwrap().timeout(),
            InputTimeout::Bounded(Duration::from_millis(10))
        );
        assert_eq!(s.read_key(root).unwrap(), None);
    }

    #[test]
    fn blocking_read_on_exhausted_input_is_driver_error() {
        let (mut s, root) = session(4, 1);
        assert!(matches!(s.read_key(root), Err(Error::Driver { .. })));
    }

    #[test]
    fn echo_writes_printable_keys_at_cursor() {
        let (mut s, root) = session(6, 1);
        s.set_echo(true).unwrap();
        s.window_mut(root).unwrap().move_cursor(1, 0).unwrap();
        s.backend_mut().push_input(b"hi\x01".to_vec());
        for _ in 0..3 {
            s.read_key(root).unwrap();
        }
        let win = s.window(root).unwrap();
        assert_eq!(win.row_text(0), " hi   ");
        assert_eq!(win.cursor(), (3, 0));
    }

    #[test]
    fn new_windows_take_configured_keypad() {
        let config = SessionConfig {
            keypad: true,
            ..SessionConfig::default()
        };
        let (mut s, root) = Session::initialize_with(TestBackend::new(10, 5), config).unwrap();
        let id = s.new_window(2, 2, 0, 0).unwrap();
        assert!(s.window(root).unwrap().keypad());
        assert!(s.window(id).unwrap().keypad());
        assert!(s.backend().keypad());
    }
}
