// SPDX-License-Identifier: MIT
//
// Differential renderer.
//
// Keeps a copy of the last frame it pushed to the backend and, on each
// render, sends only the cells that changed. Unchanged rows are detected
// with one slice comparison and skipped outright.
//
// A full redraw (backend clear, then every non-blank cell) happens when:
//
//   - nothing has been drawn yet,
//   - the frame size changed,
//   - the color registry changed since the last frame (a re-registered pair
//     changes how identical cells look),
//   - the caller asked for one with `force_redraw` (a window `clear()`).
//
// Rows marked with `invalidate_rows` are resent cell by cell on the next
// render even where they match the last frame. The terminal's copy of them
// is assumed to be garbage.
//
// Colors are resolved through the registry at render time, so cells keep
// only their pair number.

use std::collections::BTreeSet;
use std::io;
use std::ops::Range;

use crate::backend::Backend;
use crate::buffer::FrameBuffer;
use crate::color::ColorRegistry;

// ─── RenderStats ─────────────────────────────────────────────────────────────

/// What a render pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Cells sent to the backend.
    pub cells_rendered: usize,
    /// Cells left alone because the terminal already shows them.
    pub cells_skipped: usize,
    /// Whether the pass cleared the terminal first.
    pub full_redraw: bool,
}

impl RenderStats {
    #[inline]
    #[must_use]
    pub const fn total_cells(&self) -> usize {
        self.cells_rendered + self.cells_skipped
    }
}

// ─── DiffRenderer ────────────────────────────────────────────────────────────

/// Sends frame changes to a [`Backend`].
///
/// ```
/// use k_term::backend::TestBackend;
/// use k_term::buffer::FrameBuffer;
/// use k_term::cell::Cell;
/// use k_term::color::ColorRegistry;
/// use k_term::diff::DiffRenderer;
///
/// let mut term = TestBackend::new(4, 1);
/// let colors = ColorRegistry::new();
/// let mut renderer = DiffRenderer::new();
/// let mut frame = FrameBuffer::new(4, 1);
///
/// frame.set(0, 0, Cell::new('h'));
/// renderer.render(&frame, &colors, &mut term).unwrap();
/// frame.set(1, 0, Cell::new('i'));
/// let stats = renderer.render(&frame, &colors, &mut term).unwrap();
///
/// assert_eq!(stats.cells_rendered, 1);
/// assert_eq!(term.row_text(0), "hi  ");
/// ```
#[derive(Debug, Default)]
pub struct DiffRenderer {
    previous: Option<FrameBuffer>,
    color_generation: u64,
    stale_rows: BTreeSet<u16>,
}

impl DiffRenderer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            previous: None,
            color_generation: 0,
            stale_rows: BTreeSet::new(),
        }
    }

    /// Diff `current` against the last frame and send changed cells.
    ///
    /// Does not flush; the caller decides when the frame is complete.
    ///
    /// # Errors
    ///
    /// The backend's error. The stored frame is left as it was, so the next
    /// render retries the whole difference.
    pub fn render<B: Backend + ?Sized>(
        &mut self,
        current: &FrameBuffer,
        colors: &ColorRegistry,
        backend: &mut B,
    ) -> io::Result<RenderStats> {
        let width = current.width();
        let height = current.height();
        let mut stats = RenderStats::default();

        let previous = self
            .previous
            .as_ref()
            .filter(|prev| prev.width() == width && prev.height() == height)
            .filter(|_| self.color_generation == colors.generation());

        match previous {
            Some(prev) => {
                for y in 0..height {
                    let (Some(curr_row), Some(prev_row)) = (current.row(y), prev.row(y)) else {
                        continue;
                    };
                    let stale = self.stale_rows.contains(&y);
                    if !stale && curr_row == prev_row {
                        stats.cells_skipped += usize::from(width);
                        continue;
                    }
                    for (x, (cell, old)) in (0..width).zip(curr_row.iter().zip(prev_row)) {
                        if !stale && cell == old {
                            stats.cells_skipped += 1;
                        } else {
                            backend.put_cell(x, y, cell, colors.resolve_cell(cell))?;
                            stats.cells_rendered += 1;
                        }
                    }
                }
            }
            None => {
                tracing::trace!(width, height, "full redraw");
                stats.full_redraw = true;
                backend.clear()?;
                for (x, y, cell) in current.iter() {
                    // The clear already left blanks in the terminal's colors.
                    if cell.is_blank() {
                        stats.cells_skipped += 1;
                    } else {
                        backend.put_cell(x, y, cell, colors.resolve_cell(cell))?;
                        stats.cells_rendered += 1;
                    }
                }
            }
        }

        self.store_frame(current);
        self.color_generation = colors.generation();
        self.stale_rows.clear();
        Ok(stats)
    }

    /// Forget the last frame so the next render redraws everything.
    pub fn force_redraw(&mut self) {
        self.previous = None;
    }

    /// Resend `rows` in full on the next render.
    pub fn invalidate_rows(&mut self, rows: Range<u16>) {
        self.stale_rows.extend(rows);
    }

    /// Rows waiting to be resent.
    #[must_use]
    pub const fn stale_rows(&self) -> &BTreeSet<u16> {
        &self.stale_rows
    }

    /// The frame the terminal is believed to show.
    #[must_use]
    pub const fn previous(&self) -> Option<&FrameBuffer> {
        self.previous.as_ref()
    }

    fn store_frame(&mut self, current: &FrameBuffer) {
        match &mut self.previous {
            Some(prev) if prev.width() == current.width() && prev.height() == current.height() => {
                prev.blit(current, current.bounds(), 0, 0);
            }
            _ => self.previous = Some(current.clone()),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Capabilities, TestBackend};
    use crate::cell::{Attr, Cell};
    use crate::color::{Color, ColorPair};

    fn setup(w: u16, h: u16) -> (DiffRenderer, ColorRegistry, TestBackend) {
        (DiffRenderer::new(), ColorRegistry::new(), TestBackend::new(w, h))
    }

    // ── First Render ────────────────────────────────────────────────────

    #[test]
    fn first_render_clears_and_skips_blanks() {
        let (mut r, colors, mut term) = setup(10, 5);
        let mut frame = FrameBuffer::new(10, 5);
        frame.set(2, 2, Cell::new('x'));

        let stats = r.render(&frame, &colors, &mut term).unwrap();

        assert!(stats.full_redraw);
        assert_eq!(stats.cells_rendered, 1);
        assert_eq!(stats.total_cells(), 50);
        assert_eq!(term.clears(), 1);
        assert_eq!(term.row_text(2), "  x       ");
    }

    // ── Incremental ─────────────────────────────────────────────────────

    #[test]
    fn identical_frames_send_nothing() {
        let (mut r, colors, mut term) = setup(10, 5);
        let frame = FrameBuffer::with_fill(10, 5, Cell::new('.'));
        r.render(&frame, &colors, &mut term).unwrap();
        term.reset_counters();

        let stats = r.render(&frame, &colors, &mut term).unwrap();

        assert!(!stats.full_redraw);
        assert_eq!(stats.cells_rendered, 0);
        assert_eq!(stats.cells_skipped, 50);
        assert_eq!(term.puts(), 0);
        assert_eq!(term.clears(), 0);
    }

    #[test]
    fn only_changed_cells_are_sent() {
        let (mut r, colors, mut term) = setup(6, 3);
        let mut frame = FrameBuffer::new(6, 3);
        r.render(&frame, &colors, &mut term).unwrap();

        frame.set(1, 1, Cell::new('a'));
        frame.set(4, 2, Cell::styled('b', Attr::BOLD));
        term.reset_counters();
        let stats = r.render(&frame, &colors, &mut term).unwrap();

        assert_eq!(stats.cells_rendered, 2);
        assert_eq!(term.puts(), 2);
        assert_eq!(term.cell(4, 2), Some(Cell::styled('b', Attr::BOLD)));
    }

    #[test]
    fn erased_cell_is_sent_as_blank() {
        let (mut r, colors, mut term) = setup(3, 1);
        let mut frame = FrameBuffer::new(3, 1);
        frame.set(0, 0, Cell::new('z'));
        r.render(&frame, &colors, &mut term).unwrap();

        frame.set(0, 0, Cell::BLANK);
        r.render(&frame, &colors, &mut term).unwrap();

        assert_eq!(term.row_text(0), "   ");
    }

    #[test]
    fn invalidated_rows_are_resent_once() {
        let (mut r, colors, mut term) = setup(4, 3);
        let frame = FrameBuffer::with_fill(4, 3, Cell::new('.'));
        r.render(&frame, &colors, &mut term).unwrap();

        r.invalidate_rows(1..3);
        term.reset_counters();
        let stats = r.render(&frame, &colors, &mut term).unwrap();
        assert!(!stats.full_redraw);
        assert_eq!(stats.cells_rendered, 8);
        assert_eq!(stats.cells_skipped, 4);
        assert_eq!(term.puts(), 8);
        assert!(r.stale_rows().is_empty());

        term.reset_counters();
        r.render(&frame, &colors, &mut term).unwrap();
        assert_eq!(term.puts(), 0);
    }

    #[test]
    fn failed_render_keeps_stale_rows() {
        let (mut r, colors, mut term) = setup(2, 2);
        let frame = FrameBuffer::with_fill(2, 2, Cell::new('x'));
        r.render(&frame, &colors, &mut term).unwrap();
        r.invalidate_rows(0..2);

        let mut small = TestBackend::new(1, 1);
        assert!(r.render(&frame, &colors, &mut small).is_err());
        assert_eq!(r.stale_rows().len(), 2);
    }

    // ── Full Redraw Triggers ────────────────────────────────────────────

    #[test]
    fn size_change_forces_full_redraw() {
        let (mut r, colors, mut term) = setup(10, 5);
        r.render(&FrameBuffer::new(10, 5), &colors, &mut term).unwrap();
        let stats = r.render(&FrameBuffer::new(8, 5), &colors, &mut term).unwrap();
        assert!(stats.full_redraw);
    }

    #[test]
    fn force_redraw_discards_previous() {
        let (mut r, colors, mut term) = setup(4, 1);
        let frame = FrameBuffer::new(4, 1);
        r.render(&frame, &colors, &mut term).unwrap();
        r.force_redraw();
        assert!(r.previous().is_none());
        assert!(r.render(&frame, &colors, &mut term).unwrap().full_redraw);
    }

    #[test]
    fn color_reregistration_forces_full_redraw() {
        let (mut r, mut colors, mut term) = setup(4, 1);
        colors.enable(&Capabilities::ANSI).unwrap();
        colors.register(1, Color::White, Color::Black).unwrap();
        let mut frame = FrameBuffer::new(4, 1);
        frame.set(0, 0, Cell::new('c').with_pair(1));
        r.render(&frame, &colors, &mut term).unwrap();

        colors.register(1, Color::Red, Color::Black).unwrap();
        let stats = r.render(&frame, &colors, &mut term).unwrap();

        assert!(stats.full_redraw);
        assert_eq!(
            term.colors_at(0, 0),
            Some(ColorPair::new(Color::Red, Color::Black))
        );
    }

    #[test]
    fn backend_error_keeps_previous_frame() {
        let (mut r, colors, _) = setup(2, 1);
        let mut small = TestBackend::new(1, 1);
        let frame = FrameBuffer::with_fill(2, 1, Cell::new('x'));
        assert!(r.render(&frame, &colors, &mut small).is_err());
        assert!(r.previous().is_none());
    }
}
