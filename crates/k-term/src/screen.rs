// SPDX-License-Identifier: MIT
//
// Screen driver.
//
// Two-step refresh, as in curses:
//
//   stage   copy a window's cells into the virtual screen
//   update  diff the virtual screen against what the terminal shows,
//           send the difference, park the cursor, flush
//
// Staging several windows and then updating once draws them as a single
// frame with no intermediate flicker. Later stages overwrite earlier ones
// where windows overlap.

use std::ops::Range;

use crate::backend::Backend;
use crate::buffer::FrameBuffer;
use crate::color::ColorRegistry;
use crate::diff::{DiffRenderer, RenderStats};
use crate::error::{Error, Result};
use crate::window::Window;

/// The virtual screen plus the renderer that tracks the physical one.
#[derive(Debug)]
pub struct Screen {
    virtual_screen: FrameBuffer,
    renderer: DiffRenderer,
    cursor: (u16, u16),
}

impl Screen {
    /// A blank `cols` x `rows` screen. The first update redraws fully.
    #[must_use]
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            virtual_screen: FrameBuffer::new(cols, rows),
            renderer: DiffRenderer::new(),
            cursor: (0, 0),
        }
    }

    /// The composite frame the next update will display.
    #[must_use]
    pub const fn virtual_screen(&self) -> &FrameBuffer {
        &self.virtual_screen
    }

    /// Where the hardware cursor goes on the next update.
    #[must_use]
    pub const fn cursor(&self) -> (u16, u16) {
        self.cursor
    }

    /// Copy `window` into the virtual screen and take its cursor.
    ///
    /// A pending `clear()` on the window turns the next update into a full
    /// repaint.
    pub fn stage(&mut self, window: &mut Window) {
        let region = window.region();
        {
            let storage = window.storage();
            self.virtual_screen
                .blit(&storage, window.storage_rect(), region.x, region.y);
        }
        if window.take_clear_pending() {
            self.renderer.force_redraw();
        }
        let (cx, cy) = window.cursor();
        self.cursor = (
            (region.x + cx).min(self.virtual_screen.width().saturating_sub(1)),
            (region.y + cy).min(self.virtual_screen.height().saturating_sub(1)),
        );
    }

    /// Push the virtual screen to the terminal.
    ///
    /// # Errors
    ///
    /// [`Error::Driver`] wrapping the backend failure.
    pub fn update<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        colors: &ColorRegistry,
    ) -> Result<RenderStats> {
        let stats = self
            .renderer
            .render(&self.virtual_screen, colors, backend)
            .map_err(|e| Error::io("screen update", e))?;
        let (x, y) = self.cursor;
        backend
            .move_cursor(x, y)
            .and_then(|()| backend.flush())
            .map_err(|e| Error::io("screen flush", e))?;
        if stats.full_redraw {
            tracing::debug!(cells = stats.cells_rendered, "screen repainted");
        }
        Ok(stats)
    }

    /// Repaint everything on the next update.
    pub fn force_redraw(&mut self) {
        self.renderer.force_redraw();
    }

    /// Resend screen rows `rows` on the next update even where unchanged.
    pub fn invalidate_rows(&mut self, rows: Range<u16>) {
        let end = rows.end.min(self.virtual_screen.height());
        self.renderer.invalidate_rows(rows.start..end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TestBackend;
    use crate::buffer::Rect;
    use crate::cell::{Attr, Cell};
    use crate::window::{WindowId, WindowMut};
    use pretty_assertions::assert_eq;

    fn window_at(x: u16, y: u16, cols: u16, rows: u16) -> Window {
        Window::new(WindowId(7), Rect::new(x, y, cols, rows), false)
    }

    #[test]
    fn stage_places_window_at_its_origin() {
        let mut screen = Screen::new(8, 3);
        let colors = ColorRegistry::new();
        let mut win = window_at(2, 1, 3, 1);
        WindowMut::new(&mut win, &colors)
            .write_str(0, 0, "abc", Attr::NORMAL)
            .unwrap();

        screen.stage(&mut win);

        assert_eq!(screen.virtual_screen().row_text(1), "  abc   ");
        assert_eq!(screen.cursor(), (4, 1));
    }

    #[test]
    fn update_sends_staged_frame_and_parks_cursor() {
        let mut screen = Screen::new(6, 2);
        let colors = ColorRegistry::new();
        let mut term = TestBackend::new(6, 2);
        let mut win = window_at(0, 0, 6, 2);
        {
            let mut w = WindowMut::new(&mut win, &colors);
            w.write_str(0, 1, "hi", Attr::NORMAL).unwrap();
        }

        screen.stage(&mut win);
        screen.update(&mut term, &colors).unwrap();

        assert_eq!(term.screen_text(), vec!["      ".to_string(), "hi    ".to_string()]);
        assert_eq!(term.cursor(), (2, 1));
        assert_eq!(term.flushes(), 1);
    }

    #[test]
    fn unstaged_changes_are_not_shown() {
        let mut screen = Screen::new(4, 1);
        let colors = ColorRegistry::new();
        let mut term = TestBackend::new(4, 1);
        let mut win = window_at(0, 0, 4, 1);
        screen.stage(&mut win);
        screen.update(&mut term, &colors).unwrap();

        WindowMut::new(&mut win, &colors)
            .write_char(0, 0, 'x', Attr::NORMAL)
            .unwrap();
        screen.update(&mut term, &colors).unwrap();

        assert_eq!(term.row_text(0), "    ");
    }

    #[test]
    fn pending_clear_forces_full_repaint() {
        let mut screen = Screen::new(4, 1);
        let colors = ColorRegistry::new();
        let mut term = TestBackend::new(4, 1);
        let mut win = window_at(0, 0, 4, 1);
        screen.stage(&mut win);
        screen.update(&mut term, &colors).unwrap();

        WindowMut::new(&mut win, &colors).clear();
        screen.stage(&mut win);
        let stats = screen.update(&mut term, &colors).unwrap();

        assert!(stats.full_redraw);
        assert_eq!(term.clears(), 2);
    }

    #[test]
    fn clear_then_refresh_shows_background_everywhere() {
        let mut screen = Screen::new(3, 2);
        let colors = ColorRegistry::new();
        let mut term = TestBackend::new(3, 2);
        let mut win = window_at(0, 0, 3, 2);
        let bg = Cell::new('~');
        {
            let mut w = WindowMut::new(&mut win, &colors);
            w.write_str(0, 0, "abc", Attr::BOLD).unwrap();
            w.set_background(bg).unwrap();
            w.clear();
        }
        screen.stage(&mut win);
        screen.update(&mut term, &colors).unwrap();

        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(term.cell(x, y), Some(bg));
            }
        }
    }

    #[test]
    fn backend_failure_is_driver_error() {
        let mut screen = Screen::new(4, 1);
        let colors = ColorRegistry::new();
        let mut term = TestBackend::new(1, 1);
        let mut win = window_at(0, 0, 4, 1);
        WindowMut::new(&mut win, &colors)
            .write_str(0, 0, "wxyz", Attr::NORMAL)
            .unwrap();
        screen.stage(&mut win);

        let err = screen.update(&mut term, &colors).unwrap_err();
        assert!(matches!(err, Error::Driver { source: Some(_), .. }));
    }
}
